use crate::recognition::domain::detected_face::FaceAttributes;
use crate::shared::frame::Frame;

/// Estimates age and gender from a face crop.
pub trait AttributeEstimator: Send + Sync {
    fn estimate(&self, crop: &Frame) -> Result<FaceAttributes, Box<dyn std::error::Error>>;
}
