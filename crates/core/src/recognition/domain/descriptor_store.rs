use std::collections::HashMap;

use thiserror::Error;

use crate::shared::embedding::Embedding;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("identity name must not be empty")]
    EmptyName,
    #[error("embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding contains NaN or infinite values")]
    NonFiniteEmbedding,
}

/// A named person and the reference embeddings captured for them.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledIdentity {
    name: String,
    embeddings: Vec<Embedding>,
}

impl LabeledIdentity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }
}

/// Registry of named identities.
///
/// Identities enumerate in the order they were first registered, which is
/// what the matcher relies on to break distance ties. The store only grows:
/// there is no removal or in-place update.
#[derive(Clone, Debug, Default)]
pub struct DescriptorStore {
    identities: Vec<LabeledIdentity>,
    index: HashMap<String, usize>,
    dimension: Option<usize>,
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `embedding` to the identity called `name` (trimmed), creating
    /// the identity if needed. On error the store is left untouched.
    pub fn register(&mut self, name: &str, embedding: Embedding) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !embedding.is_finite() {
            return Err(StoreError::NonFiniteEmbedding);
        }
        if let Some(expected) = self.dimension {
            if embedding.dimension() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: embedding.dimension(),
                });
            }
        }

        self.dimension.get_or_insert(embedding.dimension());
        match self.index.get(name) {
            Some(&pos) => self.identities[pos].embeddings.push(embedding),
            None => {
                self.index.insert(name.to_string(), self.identities.len());
                self.identities.push(LabeledIdentity {
                    name: name.to_string(),
                    embeddings: vec![embedding],
                });
            }
        }
        Ok(())
    }

    /// All identities in registration order.
    pub fn all(&self) -> &[LabeledIdentity] {
        &self.identities
    }

    pub fn get(&self, name: &str) -> Option<&LabeledIdentity> {
        self.index.get(name.trim()).map(|&pos| &self.identities[pos])
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Total number of reference embeddings across all identities.
    pub fn reference_count(&self) -> usize {
        self.identities.iter().map(|i| i.embeddings.len()).sum()
    }

    /// Embedding length fixed by the first registration.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
