use std::fmt;

use serde::Serialize;

use crate::recognition::domain::face_matcher::{FaceMatcher, MatchError, MatchResult};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::embedding::Embedding;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaceAttributes {
    pub age: u32,
    pub gender: Gender,
}

impl FaceAttributes {
    /// Rounds a model age estimate to whole years.
    pub fn new(age_years: f64, gender: Gender) -> Self {
        Self {
            age: age_years.max(0.0).round() as u32,
            gender,
        }
    }
}

/// One face as reported by the analyzer, before identity matching.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
    pub embedding: Option<Embedding>,
    pub attributes: Option<FaceAttributes>,
}

/// Result of a single-face detection used for registration.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleFace {
    pub bounding_box: BoundingBox,
    pub embedding: Embedding,
}

/// A face as published to the presentation layer.
///
/// Which variant appears depends on which pipeline stages ran for the face.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectedFace {
    DetectionOnly {
        bounding_box: BoundingBox,
    },
    DetectionWithAttributes {
        bounding_box: BoundingBox,
        attributes: FaceAttributes,
    },
    DetectionWithIdentity {
        bounding_box: BoundingBox,
        #[serde(skip_serializing_if = "Option::is_none")]
        attributes: Option<FaceAttributes>,
        identity: MatchResult,
    },
}

impl DetectedFace {
    /// Annotates an observation, matching its embedding when a matcher is
    /// available. Without one (or without an embedding) the face carries no
    /// identity.
    pub fn annotate(
        observation: FaceObservation,
        matcher: Option<&FaceMatcher>,
    ) -> Result<Self, MatchError> {
        let FaceObservation {
            bounding_box,
            embedding,
            attributes,
            ..
        } = observation;

        if let (Some(matcher), Some(embedding)) = (matcher, embedding.as_ref()) {
            return Ok(DetectedFace::DetectionWithIdentity {
                bounding_box,
                attributes,
                identity: matcher.query(embedding)?,
            });
        }
        Ok(match attributes {
            Some(attributes) => DetectedFace::DetectionWithAttributes {
                bounding_box,
                attributes,
            },
            None => DetectedFace::DetectionOnly { bounding_box },
        })
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        match self {
            DetectedFace::DetectionOnly { bounding_box }
            | DetectedFace::DetectionWithAttributes { bounding_box, .. }
            | DetectedFace::DetectionWithIdentity { bounding_box, .. } => bounding_box,
        }
    }

    pub fn attributes(&self) -> Option<&FaceAttributes> {
        match self {
            DetectedFace::DetectionOnly { .. } => None,
            DetectedFace::DetectionWithAttributes { attributes, .. } => Some(attributes),
            DetectedFace::DetectionWithIdentity { attributes, .. } => attributes.as_ref(),
        }
    }

    pub fn identity(&self) -> Option<&MatchResult> {
        match self {
            DetectedFace::DetectionWithIdentity { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

/// Overlay caption, e.g. `"Ada (0.42) | female, 31"`.
impl fmt::Display for DetectedFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(identity) = self.identity() {
            parts.push(identity.to_string());
        }
        if let Some(a) = self.attributes() {
            parts.push(format!("{}, {}", a.gender, a.age));
        }
        if parts.is_empty() {
            parts.push("face".to_string());
        }
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::descriptor_store::DescriptorStore;
    use rstest::rstest;

    fn observation(embedding: Option<&[f32]>, attributes: Option<FaceAttributes>) -> FaceObservation {
        FaceObservation {
            bounding_box: BoundingBox::new(10.0, 20.0, 30.0, 40.0),
            confidence: 0.9,
            embedding: embedding.map(|v| Embedding::new(v.to_vec())),
            attributes,
        }
    }

    fn matcher_with_ada() -> FaceMatcher {
        let mut store = DescriptorStore::new();
        store.register("Ada", Embedding::new(vec![0.0, 0.0])).unwrap();
        FaceMatcher::new(&store, 0.6)
    }

    #[rstest]
    #[case(30.4, 30)]
    #[case(30.5, 31)]
    #[case(-2.0, 0)]
    fn test_attributes_round_age(#[case] raw: f64, #[case] expected: u32) {
        assert_eq!(FaceAttributes::new(raw, Gender::Female).age, expected);
    }

    #[test]
    fn test_annotate_without_matcher_or_attributes_is_detection_only() {
        let face = DetectedFace::annotate(observation(Some(&[0.0, 0.0]), None), None).unwrap();

        assert!(matches!(face, DetectedFace::DetectionOnly { .. }));
        assert!(face.identity().is_none());
    }

    #[test]
    fn test_annotate_with_attributes_only() {
        let attrs = FaceAttributes::new(42.0, Gender::Male);

        let face = DetectedFace::annotate(observation(None, Some(attrs)), None).unwrap();

        assert_eq!(
            face,
            DetectedFace::DetectionWithAttributes {
                bounding_box: BoundingBox::new(10.0, 20.0, 30.0, 40.0),
                attributes: attrs,
            }
        );
    }

    #[test]
    fn test_annotate_with_matcher_adds_identity() {
        let matcher = matcher_with_ada();
        let attrs = FaceAttributes::new(42.0, Gender::Female);

        let face =
            DetectedFace::annotate(observation(Some(&[0.1, 0.0]), Some(attrs)), Some(&matcher))
                .unwrap();

        assert_eq!(face.identity().unwrap().label(), "Ada");
        assert_eq!(face.attributes(), Some(&attrs));
    }

    #[test]
    fn test_annotate_without_embedding_skips_matching() {
        let matcher = matcher_with_ada();

        let face = DetectedFace::annotate(observation(None, None), Some(&matcher)).unwrap();

        assert!(matches!(face, DetectedFace::DetectionOnly { .. }));
    }

    #[test]
    fn test_annotate_propagates_match_error() {
        let matcher = matcher_with_ada();

        let result = DetectedFace::annotate(observation(Some(&[0.0, 0.0, 0.0]), None), Some(&matcher));

        assert!(matches!(result, Err(MatchError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_display_caption() {
        let face = DetectedFace::DetectionWithIdentity {
            bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            attributes: Some(FaceAttributes::new(31.2, Gender::Female)),
            identity: MatchResult::Known {
                label: "Ada".into(),
                distance: 0.42,
            },
        };
        assert_eq!(face.to_string(), "Ada (0.42) | female, 31");

        let bare = DetectedFace::DetectionOnly {
            bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        };
        assert_eq!(bare.to_string(), "face");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let face = DetectedFace::DetectionWithIdentity {
            bounding_box: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            attributes: None,
            identity: MatchResult::Unknown { distance: 0.7 },
        };

        let json = serde_json::to_value(&face).unwrap();

        assert_eq!(json["kind"], "detection_with_identity");
        assert_eq!(json["bounding_box"]["left"], 2.0);
        assert_eq!(json["identity"]["kind"], "unknown");
        assert!(json.get("attributes").is_none());
    }
}
