use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::presentation::domain::detection_sink::DetectionSink;
use crate::recognition::domain::detected_face::DetectedFace;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_matcher::MatchError;
use crate::recognition::domain::recognition_state::RecognitionState;

#[derive(Error, Debug)]
pub enum TickError {
    #[error("failed to read frame: {0}")]
    Capture(String),
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("failed to publish faces: {0}")]
    Publish(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No decoded frame yet; nothing was detected or published.
    SourceNotReady,
    /// Published this many faces.
    Published(usize),
}

/// One detection tick: read the current frame, analyze it, match every
/// face, and publish the complete set.
///
/// With no recognition state the faces carry no identity (detection-only).
pub struct DetectFacesUseCase {
    source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn FaceAnalyzer>,
    sink: Box<dyn DetectionSink>,
    recognition: Option<Arc<RecognitionState>>,
}

impl DetectFacesUseCase {
    pub fn new(
        source: Arc<dyn FrameSource>,
        analyzer: Arc<dyn FaceAnalyzer>,
        sink: Box<dyn DetectionSink>,
        recognition: Option<Arc<RecognitionState>>,
    ) -> Self {
        Self {
            source,
            analyzer,
            sink,
            recognition,
        }
    }

    pub fn execute(&mut self) -> Result<TickOutcome, TickError> {
        if !self.source.is_frame_ready() {
            return Ok(TickOutcome::SourceNotReady);
        }
        let frame = self
            .source
            .current_frame()
            .map_err(|e| TickError::Capture(e.to_string()))?;

        let start = Instant::now();
        let observations = self
            .analyzer
            .detect_all(&frame)
            .map_err(|e| TickError::Detection(e.to_string()))?;

        // One snapshot for the whole tick, so every face in a published set
        // is matched against the same identities.
        let matcher = self.recognition.as_ref().map(|state| state.matcher());
        let faces = observations
            .into_iter()
            .map(|obs| DetectedFace::annotate(obs, matcher.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        let count = faces.len();
        self.sink
            .publish(faces)
            .map_err(|e| TickError::Publish(e.to_string()))?;
        log::debug!(
            "Frame {}: published {count} face(s) in {:.1}ms",
            frame.sequence(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(TickOutcome::Published(count))
    }
}
