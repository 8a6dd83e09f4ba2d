use std::sync::Arc;

use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::recognition::domain::descriptor_store::StoreError;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::recognition_state::RecognitionState;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("a name is required to register a face")]
    Validation,
    #[error("no frame has been captured yet")]
    FrameUnavailable,
    #[error("no face detected in the frame")]
    NoFaceDetected,
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredFace {
    pub name: String,
    pub bounding_box: BoundingBox,
    /// References now held for this name, including the new one.
    pub reference_count: usize,
}

/// Captures one live embedding and files it under a user-supplied name.
///
/// Exactly one detection attempt per call. On success the shared
/// recognition state has already swapped in a rebuilt matcher.
pub struct RegisterFaceUseCase {
    analyzer: Arc<dyn FaceAnalyzer>,
    recognition: Arc<RecognitionState>,
}

impl RegisterFaceUseCase {
    pub fn new(analyzer: Arc<dyn FaceAnalyzer>, recognition: Arc<RecognitionState>) -> Self {
        Self {
            analyzer,
            recognition,
        }
    }

    pub fn execute(&self, name: &str, frame: &Frame) -> Result<RegisteredFace, RegistrationError> {
        let name = validated_name(name)?;
        self.register(name, frame)
    }

    /// Registers from whatever frame `source` currently holds.
    pub fn capture_and_register(
        &self,
        name: &str,
        source: &dyn FrameSource,
    ) -> Result<RegisteredFace, RegistrationError> {
        let name = validated_name(name)?;
        if !source.is_frame_ready() {
            return Err(RegistrationError::FrameUnavailable);
        }
        let frame = source
            .current_frame()
            .map_err(|_| RegistrationError::FrameUnavailable)?;
        self.register(name, &frame)
    }

    fn register(&self, name: &str, frame: &Frame) -> Result<RegisteredFace, RegistrationError> {
        let face = self
            .analyzer
            .detect_single(frame)
            .map_err(|e| RegistrationError::Detection(e.to_string()))?
            .ok_or(RegistrationError::NoFaceDetected)?;

        let reference_count = self.recognition.register(name, face.embedding)?;
        log::info!("Registered face for {name} ({reference_count} reference(s))");

        Ok(RegisteredFace {
            name: name.to_string(),
            bounding_box: face.bounding_box,
            reference_count,
        })
    }
}

fn validated_name(name: &str) -> Result<&str, RegistrationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistrationError::Validation);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::recognition::domain::detected_face::{FaceObservation, SingleFace};
    use crate::shared::embedding::Embedding;

    // --- Stubs ---

    struct StubAnalyzer {
        single: Mutex<Result<Option<SingleFace>, String>>,
        calls: AtomicUsize,
    }

    impl StubAnalyzer {
        fn returning(single: Result<Option<SingleFace>, String>) -> Arc<Self> {
            Arc::new(Self {
                single: Mutex::new(single),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FaceAnalyzer for StubAnalyzer {
        fn detect_all(
            &self,
            _frame: &Frame,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }

        fn detect_single(
            &self,
            _frame: &Frame,
        ) -> Result<Option<SingleFace>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.single.lock().unwrap().clone().map_err(|e| e.into())
        }
    }

    struct StubSource {
        frame: Option<Frame>,
    }

    impl FrameSource for StubSource {
        fn is_frame_ready(&self) -> bool {
            self.frame.is_some()
        }

        fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>> {
            self.frame.clone().ok_or_else(|| "not ready".into())
        }
    }

    // --- Helpers ---

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0)
    }

    fn face(values: &[f32]) -> SingleFace {
        SingleFace {
            bounding_box: BoundingBox::new(1.0, 1.0, 2.0, 2.0),
            embedding: Embedding::new(values.to_vec()),
        }
    }

    fn use_case(analyzer: Arc<StubAnalyzer>) -> (RegisterFaceUseCase, Arc<RecognitionState>) {
        let state = Arc::new(RecognitionState::new(0.6));
        (RegisterFaceUseCase::new(analyzer, state.clone()), state)
    }

    // --- Tests ---

    #[test]
    fn test_registers_trimmed_name_and_rebuilds_matcher() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, state) = use_case(analyzer.clone());

        let registered = uc.execute("  Ada  ", &frame()).unwrap();

        assert_eq!(registered.name, "Ada");
        assert_eq!(registered.reference_count, 1);
        assert_eq!(registered.bounding_box, BoundingBox::new(1.0, 1.0, 2.0, 2.0));
        let result = state
            .matcher()
            .query(&Embedding::new(vec![0.2, 0.4]))
            .unwrap();
        assert_eq!(result.label(), "Ada");
    }

    #[test]
    fn test_second_registration_appends_reference() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, state) = use_case(analyzer);

        uc.execute("Ada", &frame()).unwrap();
        let registered = uc.execute("Ada", &frame()).unwrap();

        assert_eq!(registered.reference_count, 2);
        assert_eq!(state.identities(), vec![("Ada".to_string(), 2)]);
    }

    #[test]
    fn test_blank_name_fails_validation_without_detection() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, state) = use_case(analyzer.clone());

        let result = uc.execute("   ", &frame());

        assert!(matches!(result, Err(RegistrationError::Validation)));
        assert_eq!(analyzer.calls(), 0);
        assert!(state.identities().is_empty());
    }

    #[test]
    fn test_no_face_fails_without_mutating_store() {
        let analyzer = StubAnalyzer::returning(Ok(None));
        let (uc, state) = use_case(analyzer.clone());
        let before = state.matcher();

        let result = uc.execute("Ada", &frame());

        assert!(matches!(result, Err(RegistrationError::NoFaceDetected)));
        assert_eq!(analyzer.calls(), 1);
        assert!(state.identities().is_empty());
        assert!(Arc::ptr_eq(&before, &state.matcher()));
    }

    #[test]
    fn test_detection_error_is_reported() {
        let analyzer = StubAnalyzer::returning(Err("model crashed".to_string()));
        let (uc, state) = use_case(analyzer);

        let result = uc.execute("Ada", &frame());

        match result {
            Err(RegistrationError::Detection(msg)) => assert!(msg.contains("model crashed")),
            other => panic!("expected detection error, got {other:?}"),
        }
        assert!(state.identities().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_surfaces_store_error() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4, 0.6]))));
        let (uc, state) = use_case(analyzer);
        state
            .register("Bob", Embedding::new(vec![0.0, 0.0]))
            .unwrap();

        let result = uc.execute("Ada", &frame());

        assert!(matches!(
            result,
            Err(RegistrationError::Store(StoreError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_capture_and_register_uses_source_frame() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, _state) = use_case(analyzer.clone());
        let source = StubSource {
            frame: Some(frame()),
        };

        let registered = uc.capture_and_register("Ada", &source).unwrap();

        assert_eq!(registered.name, "Ada");
        assert_eq!(analyzer.calls(), 1);
    }

    #[test]
    fn test_capture_and_register_without_frame() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, _state) = use_case(analyzer.clone());
        let source = StubSource { frame: None };

        let result = uc.capture_and_register("Ada", &source);

        assert!(matches!(result, Err(RegistrationError::FrameUnavailable)));
        assert_eq!(analyzer.calls(), 0);
    }

    #[test]
    fn test_capture_and_register_validates_name_first() {
        let analyzer = StubAnalyzer::returning(Ok(Some(face(&[0.2, 0.4]))));
        let (uc, _state) = use_case(analyzer);
        let source = StubSource { frame: None };

        let result = uc.capture_and_register("", &source);

        assert!(matches!(result, Err(RegistrationError::Validation)));
    }
}
