use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::recognition::domain::descriptor_store::DescriptorStore;
use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::embedding::Embedding;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("query embedding has {actual} dimensions, references have {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("query embedding contains NaN or infinite values")]
    NonFiniteEmbedding,
}

/// Outcome of matching one face against the known identities.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    /// Nearest reference is within the threshold.
    Known { label: String, distance: f64 },
    /// Nearest reference is farther than the threshold.
    Unknown { distance: f64 },
    /// The matcher was built from an empty store.
    NoReferenceData,
}

impl MatchResult {
    pub fn label(&self) -> &str {
        match self {
            MatchResult::Known { label, .. } => label,
            MatchResult::Unknown { .. } | MatchResult::NoReferenceData => UNKNOWN_LABEL,
        }
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            MatchResult::Known { distance, .. } | MatchResult::Unknown { distance } => {
                Some(*distance)
            }
            MatchResult::NoReferenceData => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, MatchResult::Known { .. })
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distance() {
            Some(d) => write!(f, "{} ({d:.2})", self.label()),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Nearest-neighbor classifier over a snapshot of the descriptor store.
///
/// References are flattened in store order; with a handful of identities
/// and one or two references each, a linear scan beats any index.
#[derive(Clone, Debug)]
pub struct FaceMatcher {
    references: Vec<(String, Embedding)>,
    threshold: f64,
}

impl FaceMatcher {
    pub fn new(store: &DescriptorStore, threshold: f64) -> Self {
        let references = store
            .all()
            .iter()
            .flat_map(|identity| {
                identity
                    .embeddings()
                    .iter()
                    .map(move |e| (identity.name().to_string(), e.clone()))
            })
            .collect();
        Self {
            references,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn query(&self, embedding: &Embedding) -> Result<MatchResult, MatchError> {
        let Some((_, first)) = self.references.first() else {
            return Ok(MatchResult::NoReferenceData);
        };
        if first.dimension() != embedding.dimension() {
            return Err(MatchError::DimensionMismatch {
                expected: first.dimension(),
                actual: embedding.dimension(),
            });
        }
        if !embedding.is_finite() {
            return Err(MatchError::NonFiniteEmbedding);
        }

        let mut best: Option<(&str, f64)> = None;
        for (name, reference) in &self.references {
            let distance = reference.distance(embedding);
            if !distance.is_finite() {
                continue;
            }
            // Strict comparison: on ties the earlier reference wins.
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((name.as_str(), distance));
            }
        }

        Ok(match best {
            Some((name, distance)) if distance <= self.threshold => MatchResult::Known {
                label: name.to_string(),
                distance,
            },
            Some((_, distance)) => MatchResult::Unknown { distance },
            None => MatchResult::NoReferenceData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    use crate::shared::constants::DEFAULT_MATCH_THRESHOLD;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    fn store(entries: &[(&str, &[f32])]) -> DescriptorStore {
        let mut store = DescriptorStore::new();
        for (name, values) in entries {
            store.register(name, emb(values)).unwrap();
        }
        store
    }

    #[test]
    fn test_empty_store_returns_no_reference_data() {
        let matcher = FaceMatcher::new(&DescriptorStore::new(), DEFAULT_MATCH_THRESHOLD);

        let result = matcher.query(&emb(&[0.1, 0.2])).unwrap();

        assert_eq!(result, MatchResult::NoReferenceData);
        assert_eq!(result.label(), "unknown");
        assert_eq!(result.distance(), None);
    }

    #[test]
    fn test_same_embedding_matches_with_zero_distance() {
        let probe = [0.12, -0.4, 0.33, 0.8];
        let matcher = FaceMatcher::new(&store(&[("Ada", &probe)]), DEFAULT_MATCH_THRESHOLD);

        let result = matcher.query(&emb(&probe)).unwrap();

        assert_eq!(result.label(), "Ada");
        assert_relative_eq!(result.distance().unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_within_threshold_matches_nearest() {
        let matcher = FaceMatcher::new(
            &store(&[("Bob", &[0.8, 0.0]), ("Ada", &[0.59, 0.0]), ("Eve", &[0.0, 0.8])]),
            0.6,
        );

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert_eq!(result.label(), "Ada");
        assert_relative_eq!(result.distance().unwrap(), 0.59, epsilon = 1e-6);
        assert!(result.is_known());
    }

    #[test]
    fn test_beyond_threshold_is_unknown_with_nearest_distance() {
        let matcher = FaceMatcher::new(&store(&[("Ada", &[0.65, 0.0]), ("Bob", &[0.0, 0.9])]), 0.6);

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert!(matches!(result, MatchResult::Unknown { .. }));
        assert_eq!(result.label(), "unknown");
        assert_relative_eq!(result.distance().unwrap(), 0.65, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_equal_to_threshold_matches() {
        let matcher = FaceMatcher::new(&store(&[("Ada", &[0.5, 0.0])]), 0.5);

        assert_eq!(matcher.query(&emb(&[0.0, 0.0])).unwrap().label(), "Ada");
    }

    #[test]
    fn test_tie_goes_to_first_registered_identity() {
        let matcher = FaceMatcher::new(&store(&[("First", &[0.3, 0.0]), ("Second", &[0.0, 0.3])]), 0.6);

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert_eq!(result.label(), "First");
        assert_relative_eq!(result.distance().unwrap(), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_any_reference_of_an_identity_can_match() {
        let mut s = store(&[("Ada", &[1.0, 0.0]), ("Bob", &[0.0, 0.7])]);
        s.register("Ada", emb(&[0.0, -0.1])).unwrap();
        let matcher = FaceMatcher::new(&s, 0.6);

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert_eq!(result.label(), "Ada");
        assert_eq!(matcher.reference_count(), 3);
    }

    #[test]
    fn test_snapshot_ignores_later_registrations() {
        let mut s = store(&[("Ada", &[1.0, 0.0])]);
        let matcher = FaceMatcher::new(&s, 0.6);
        s.register("Bob", emb(&[0.0, 0.0])).unwrap();

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert!(matches!(result, MatchResult::Unknown { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let matcher = FaceMatcher::new(&store(&[("Ada", &[1.0, 0.0])]), 0.6);

        let result = matcher.query(&emb(&[1.0, 0.0, 0.0]));

        assert_eq!(
            result,
            Err(MatchError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[rstest]
    #[case(&[f32::NAN, 0.0])]
    #[case(&[0.0, f32::INFINITY])]
    fn test_non_finite_query_is_error(#[case] values: &[f32]) {
        let matcher = FaceMatcher::new(&store(&[("Ada", &[0.0, 0.0])]), 0.6);

        assert_eq!(matcher.query(&emb(values)), Err(MatchError::NonFiniteEmbedding));
    }

    #[test]
    fn test_non_finite_reference_is_skipped() {
        let matcher = FaceMatcher {
            references: vec![
                ("Ghost".to_string(), emb(&[f32::NAN, 0.0])),
                ("Ada".to_string(), emb(&[0.0, 0.0])),
            ],
            threshold: 0.6,
        };

        let result = matcher.query(&emb(&[0.0, 0.0])).unwrap();

        assert_eq!(result.label(), "Ada");
        assert_relative_eq!(result.distance().unwrap(), 0.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case(MatchResult::Known { label: "Ada".into(), distance: 0.4213 }, "Ada (0.42)")]
    #[case(MatchResult::Unknown { distance: 0.7 }, "unknown (0.70)")]
    #[case(MatchResult::NoReferenceData, "unknown")]
    fn test_display(#[case] result: MatchResult, #[case] expected: &str) {
        assert_eq!(result.to_string(), expected);
    }
}
