/// ArcFace identity embedder using ONNX Runtime.
///
/// Produces L2-normalized embeddings, so Euclidean distances between them
/// fall in `[0, 2]`.
use std::path::Path;
use std::sync::Mutex;

use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{crop_to_nchw, load_session, run_single};

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }
}

impl FaceEmbedder for ArcFaceEmbedder {
    fn embed(&self, crop: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
        let values = run_single(&self.session, preprocess(crop))?;
        if values.is_empty() {
            return Err("ArcFace model produced an empty embedding".into());
        }
        Ok(Embedding::normalized(values))
    }
}

/// Resize crop to 112x112, normalize to `[-1, 1]`, NCHW layout.
fn preprocess(crop: &Frame) -> ndarray::Array4<f32> {
    crop_to_nchw(crop, INPUT_SIZE, |v| (v as f32 - NORM_MEAN) / NORM_STD)
}
