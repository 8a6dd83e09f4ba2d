use std::sync::Arc;

/// Immutable face feature vector.
///
/// Backed by a shared slice so snapshots of the descriptor store can hold
/// the same references without copying.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    /// L2-normalizes `values` before wrapping them.
    pub fn normalized(mut values: Vec<f32>) -> Self {
        l2_normalize(&mut values);
        Self::new(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// False when any component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Euclidean distance, accumulated in f64.
    ///
    /// Callers must ensure both embeddings share a dimension; extra
    /// components of the longer vector are ignored.
    pub fn distance(&self, other: &Embedding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = *a as f64 - *b as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let e = Embedding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(e.distance(&e), 0.0);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert_relative_eq!(a.distance(&b), 5.0, epsilon = 1e-9);
        assert_relative_eq!(b.distance(&a), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalized_vectors_are_at_most_two_apart() {
        let a = Embedding::normalized(vec![1.0, 0.0]);
        let b = Embedding::normalized(vec![-5.0, 0.0]);
        assert_relative_eq!(a.distance(&b), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clone_shares_values() {
        let a = Embedding::new(vec![1.0, 2.0]);
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.dimension(), 2);
    }
}
