//! Process-wide cache of loaded Whisper models.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::info;

use super::{Transcriber, WhisperError, WhisperModel};

/// Memoizes loaded transcribers by model size.
///
/// Loading a model is expensive (possibly a multi-GB download plus a
/// context init), so each size is loaded at most once per process and
/// never evicted.
#[derive(Default)]
pub struct ModelCache {
    inner: DashMap<WhisperModel, Arc<Transcriber>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached transcriber for `model`, loading it on first use.
    ///
    /// Holds the shard lock while loading, so concurrent requests for the
    /// same size wait for one load instead of racing to load twice.
    pub fn get_or_load(&self, model: WhisperModel) -> Result<Arc<Transcriber>, WhisperError> {
        match self.inner.entry(model) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                info!("Model cache miss for '{}', loading", model);
                let transcriber = Arc::new(Transcriber::new(model)?);
                entry.insert(transcriber.clone());
                Ok(transcriber)
            }
        }
    }

    /// Number of models currently loaded.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_is_empty() {
        let cache = ModelCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }
}
