use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

/// Computes an identity embedding from a face crop.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, crop: &Frame) -> Result<Embedding, Box<dyn std::error::Error>>;
}
