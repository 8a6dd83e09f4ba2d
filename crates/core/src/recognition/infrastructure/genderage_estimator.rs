/// Gender and age estimator using the InsightFace `genderage` ONNX model.
///
/// The model takes a 96x96 RGB crop with raw 0-255 values and outputs
/// `[female, male, age / 100]`.
use std::path::Path;
use std::sync::Mutex;

use crate::recognition::domain::attribute_estimator::AttributeEstimator;
use crate::recognition::domain::detected_face::{FaceAttributes, Gender};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{crop_to_nchw, load_session, run_single};

const INPUT_SIZE: usize = 96;
const AGE_SCALE: f64 = 100.0;

pub struct GenderAgeEstimator {
    session: Mutex<ort::session::Session>,
}

impl GenderAgeEstimator {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }
}

impl AttributeEstimator for GenderAgeEstimator {
    fn estimate(&self, crop: &Frame) -> Result<FaceAttributes, Box<dyn std::error::Error>> {
        let input = crop_to_nchw(crop, INPUT_SIZE, |v| v as f32);
        let output = run_single(&self.session, input)?;
        decode_output(&output)
    }
}

fn decode_output(output: &[f32]) -> Result<FaceAttributes, Box<dyn std::error::Error>> {
    let [female, male, age, ..] = output else {
        return Err(format!("genderage output too short: {} values", output.len()).into());
    };
    let gender = if male > female {
        Gender::Male
    } else {
        Gender::Female
    };
    Ok(FaceAttributes::new(*age as f64 * AGE_SCALE, gender))
}
