use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::recognition::domain::descriptor_store::{DescriptorStore, StoreError};
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::shared::embedding::Embedding;

/// Descriptor store paired with the matcher built from it.
///
/// Registration (writer) and the detection loop (reader) share this object.
/// Both halves live behind one lock, so a reader never sees a store that
/// has grown without the matcher having been rebuilt.
pub struct RecognitionState {
    inner: Mutex<Inner>,
    threshold: f64,
}

struct Inner {
    store: DescriptorStore,
    matcher: Arc<FaceMatcher>,
}

impl RecognitionState {
    pub fn new(threshold: f64) -> Self {
        Self::with_store(DescriptorStore::new(), threshold)
    }

    pub fn with_store(store: DescriptorStore, threshold: f64) -> Self {
        let matcher = Arc::new(FaceMatcher::new(&store, threshold));
        Self {
            inner: Mutex::new(Inner { store, matcher }),
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Current matcher snapshot. Holding it does not block registration.
    pub fn matcher(&self) -> Arc<FaceMatcher> {
        self.lock().matcher.clone()
    }

    /// Registers one reference and swaps in a rebuilt matcher.
    ///
    /// Returns the number of references now held for `name`.
    pub fn register(&self, name: &str, embedding: Embedding) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        inner.store.register(name, embedding)?;
        inner.matcher = Arc::new(FaceMatcher::new(&inner.store, self.threshold));
        Ok(inner
            .store
            .get(name)
            .map_or(0, |identity| identity.embeddings().len()))
    }

    /// Registers a batch of references with a single matcher swap.
    ///
    /// All-or-nothing: if any entry is rejected the state is unchanged.
    pub fn register_all<I>(&self, entries: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (String, Embedding)>,
    {
        let mut inner = self.lock();
        let mut staged = inner.store.clone();
        let mut added = 0;
        for (name, embedding) in entries {
            staged.register(&name, embedding)?;
            added += 1;
        }
        inner.matcher = Arc::new(FaceMatcher::new(&staged, self.threshold));
        inner.store = staged;
        Ok(added)
    }

    /// Identity names with their reference counts, in registration order.
    pub fn identities(&self) -> Vec<(String, usize)> {
        self.lock()
            .store
            .all()
            .iter()
            .map(|identity| (identity.name().to_string(), identity.embeddings().len()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds a consistent store/matcher pair.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
