use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// A face box with its detector confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedFace {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
}

/// Domain interface for locating faces in a full frame.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &Frame) -> Result<Vec<LocatedFace>, Box<dyn std::error::Error>>;
}
