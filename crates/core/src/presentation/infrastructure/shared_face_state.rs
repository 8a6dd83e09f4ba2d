use std::sync::{Arc, Mutex, PoisonError};

use crate::presentation::domain::detection_sink::DetectionSink;
use crate::recognition::domain::detected_face::DetectedFace;

/// In-memory holder of the latest published face set.
///
/// Clones share the same state: hand one to the detection loop as its sink
/// and read from another (e.g. an overlay renderer).
#[derive(Clone, Default)]
pub struct SharedFaceState {
    faces: Arc<Mutex<Vec<DetectedFace>>>,
}

impl SharedFaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<DetectedFace> {
        self.faces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DetectionSink for SharedFaceState {
    fn publish(&mut self, faces: Vec<DetectedFace>) -> Result<(), Box<dyn std::error::Error>> {
        *self.faces.lock().unwrap_or_else(PoisonError::into_inner) = faces;
        Ok(())
    }
}
