use crate::recognition::domain::detected_face::{FaceObservation, SingleFace};
use crate::shared::frame::Frame;

/// Domain interface for the external face-analysis capability.
///
/// Shared between the detection loop and registration, hence `&self` and
/// `Sync`; implementations guard their model sessions internally.
pub trait FaceAnalyzer: Send + Sync {
    /// All faces in the frame, with whatever embeddings and attributes the
    /// implementation is configured to compute.
    fn detect_all(&self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;

    /// The single most confident face with its embedding, or `None`.
    fn detect_single(&self, frame: &Frame) -> Result<Option<SingleFace>, Box<dyn std::error::Error>>;
}
