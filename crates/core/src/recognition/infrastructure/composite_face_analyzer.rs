use std::sync::Arc;

use crate::detection::domain::face_locator::{FaceLocator, LocatedFace};
use crate::recognition::domain::attribute_estimator::AttributeEstimator;
use crate::recognition::domain::detected_face::{FaceObservation, SingleFace};
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::shared::frame::Frame;

/// Crop side relative to the detector box for the identity embedder.
const EMBED_CROP_SCALE: f64 = 1.0;

/// Attribute models expect some context around the face.
const ATTRIBUTE_CROP_SCALE: f64 = 1.5;

/// Face analyzer assembled from a locator plus optional per-face models.
///
/// Without an embedder, observations carry no embedding and
/// `detect_single` is unavailable. Without an estimator, no attributes.
pub struct CompositeFaceAnalyzer {
    locator: Arc<dyn FaceLocator>,
    embedder: Option<Arc<dyn FaceEmbedder>>,
    estimator: Option<Arc<dyn AttributeEstimator>>,
}

impl CompositeFaceAnalyzer {
    pub fn new(locator: Arc<dyn FaceLocator>) -> Self {
        Self {
            locator,
            embedder: None,
            estimator: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn FaceEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn AttributeEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    fn observe(
        &self,
        frame: &Frame,
        face: LocatedFace,
    ) -> Result<FaceObservation, Box<dyn std::error::Error>> {
        let embedding = match &self.embedder {
            Some(embedder) => frame
                .square_crop(&face.bounding_box, EMBED_CROP_SCALE)
                .map(|crop| embedder.embed(&crop))
                .transpose()?,
            None => None,
        };
        let attributes = match &self.estimator {
            Some(estimator) => frame
                .square_crop(&face.bounding_box, ATTRIBUTE_CROP_SCALE)
                .map(|crop| estimator.estimate(&crop))
                .transpose()?,
            None => None,
        };
        Ok(FaceObservation {
            bounding_box: face.bounding_box,
            confidence: face.confidence,
            embedding,
            attributes,
        })
    }
}

impl FaceAnalyzer for CompositeFaceAnalyzer {
    fn detect_all(&self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        self.locator
            .locate(frame)?
            .into_iter()
            .map(|face| self.observe(frame, face))
            .collect()
    }

    fn detect_single(&self, frame: &Frame) -> Result<Option<SingleFace>, Box<dyn std::error::Error>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or("face embedding model is not configured")?;

        let best = self.locator.locate(frame)?.into_iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let Some(face) = best else {
            return Ok(None);
        };
        let Some(crop) = frame.square_crop(&face.bounding_box, EMBED_CROP_SCALE) else {
            return Ok(None);
        };
        Ok(Some(SingleFace {
            bounding_box: face.bounding_box,
            embedding: embedder.embed(&crop)?,
        }))
    }
}
