use crate::recognition::domain::detected_face::DetectedFace;

/// Presentation/state layer fed by the detection loop.
///
/// Each call replaces whatever was published before; there is no
/// incremental update.
pub trait DetectionSink: Send {
    fn publish(&mut self, faces: Vec<DetectedFace>) -> Result<(), Box<dyn std::error::Error>>;
}
