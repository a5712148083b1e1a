//! Model loader with deterministic LRU eviction (`spec.md §4.11`).
//!
//! Grounded on `neuron-state-memory::MemoryStore`'s `RwLock<HashMap<_>>`
//! pattern, generalized with access-time bookkeeping so the loader can
//! evict the least-recently-used entry when a load would exceed capacity.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conduit_core::ConduitError;
use tokio::sync::RwLock;

/// A loaded model instance together with its access bookkeeping.
pub struct LoadedModel<H> {
    /// The opaque inference-engine handle.
    pub handle: Arc<H>,
    /// When this model was first loaded.
    pub loaded_at: DateTime<Utc>,
    /// When this model was last accessed (load or lookup).
    pub last_accessed_at: DateTime<Utc>,
}

/// Owns a map of `model_id -> LoadedModel<H>` with LRU eviction at a
/// configurable capacity.
///
/// `H` is the opaque inference-engine handle type (a tensor-runtime
/// session, a `llama.cpp`-style context, etc.) — this crate never inspects
/// it, per `spec.md §1`'s "opaque inference engine" boundary.
pub struct ModelLoader<H> {
    max_loaded: usize,
    models: RwLock<HashMap<String, LoadedModel<H>>>,
}

impl<H> ModelLoader<H> {
    /// Creates a loader that holds at most `max_loaded` models at once.
    #[must_use]
    pub fn new(max_loaded: usize) -> Self {
        Self {
            max_loaded: max_loaded.max(1),
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Loads `model_id`, reusing an already-loaded instance and refreshing
    /// its `last_accessed_at` if present.
    ///
    /// If loading a new model would exceed capacity, evicts the
    /// least-recently-used entry first. `load_fn` is only invoked on a
    /// cache miss.
    ///
    /// # Errors
    ///
    /// Propagates whatever error `load_fn` returns.
    pub async fn load<F, Fut>(&self, model_id: &str, load_fn: F) -> Result<Arc<H>, ConduitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, ConduitError>>,
    {
        {
            let mut models = self.models.write().await;
            if let Some(existing) = models.get_mut(model_id) {
                existing.last_accessed_at = Utc::now();
                return Ok(existing.handle.clone());
            }
        }

        let handle = load_fn().await?;

        let mut models = self.models.write().await;
        // Re-check: another task may have loaded this model while we awaited.
        if let Some(existing) = models.get_mut(model_id) {
            existing.last_accessed_at = Utc::now();
            return Ok(existing.handle.clone());
        }

        if models.len() >= self.max_loaded {
            if let Some(victim) = least_recently_used(&models) {
                tracing::debug!(model_id = %victim, "evicting least-recently-used model");
                models.remove(&victim);
            }
        }

        let now = Utc::now();
        let handle = Arc::new(handle);
        models.insert(
            model_id.to_string(),
            LoadedModel {
                handle: handle.clone(),
                loaded_at: now,
                last_accessed_at: now,
            },
        );
        Ok(handle)
    }

    /// Deterministically releases a loaded model, if present.
    pub async fn unload(&self, model_id: &str) {
        self.models.write().await.remove(model_id);
    }

    /// Whether `model_id` is currently loaded.
    pub async fn is_loaded(&self, model_id: &str) -> bool {
        self.models.read().await.contains_key(model_id)
    }

    /// The number of currently loaded models.
    pub async fn loaded_count(&self) -> usize {
        self.models.read().await.len()
    }
}

fn least_recently_used<H>(models: &HashMap<String, LoadedModel<H>>) -> Option<String> {
    models
        .iter()
        .min_by_key(|(_, m)| m.last_accessed_at)
        .map(|(id, _)| id.clone())
}
