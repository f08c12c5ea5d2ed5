use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::ArrayView4;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::emotion::ProbabilityVector;
use crate::errors::{EmotionError, Result};
use crate::traits::EmotionModel;

type Loader<M> = Box<dyn Fn() -> Result<M> + Send + Sync>;

/// Owns the shared model handle.
///
/// The handle starts empty and is filled by the first successful [`load`](Self::load).
/// Loads are serialized, so concurrent first callers run the loader once. A failed
/// load leaves the handle empty; calls within the retry backoff fail fast with
/// [`EmotionError::ModelUnavailable`] and a later call tries again.
pub struct ModelRuntime<M: EmotionModel> {
    loader: Option<Loader<M>>,
    handle: RwLock<Option<Arc<M>>>,
    load_lock: Mutex<()>,
    failed_at: RwLock<Option<Instant>>,
    retry_backoff: Duration,
}

impl<M: EmotionModel> fmt::Debug for ModelRuntime<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("loaded", &self.is_loaded())
            .field("has_loader", &self.loader.is_some())
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

impl<M: EmotionModel> ModelRuntime<M> {
    /// A runtime that loads lazily through `loader`.
    pub fn new(loader: impl Fn() -> Result<M> + Send + Sync + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            handle: RwLock::new(None),
            load_lock: Mutex::new(()),
            failed_at: RwLock::new(None),
            retry_backoff: Duration::ZERO,
        }
    }

    /// A runtime around an already constructed model. `reset` on it is permanent.
    pub fn with_model(model: M) -> Self {
        Self {
            loader: None,
            handle: RwLock::new(Some(Arc::new(model))),
            load_lock: Mutex::new(()),
            failed_at: RwLock::new(None),
            retry_backoff: Duration::ZERO,
        }
    }

    /// A runtime with no model and no way to get one. Every prediction fails.
    pub fn unavailable() -> Self {
        Self {
            loader: None,
            handle: RwLock::new(None),
            load_lock: Mutex::new(()),
            failed_at: RwLock::new(None),
            retry_backoff: Duration::ZERO,
        }
    }

    /// Skip reloading for `backoff` after a failed load.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.read().is_some()
    }

    /// Load the model if the handle is empty. Idempotent.
    pub fn load(&self) -> Result<Arc<M>> {
        if let Some(model) = self.current() {
            return Ok(model);
        }
        self.check_backoff()?;

        let _guard = self.load_lock.lock();
        // another caller may have finished while we waited
        if let Some(model) = self.current() {
            return Ok(model);
        }
        self.check_backoff()?;

        let loader = self.loader.as_ref().ok_or(EmotionError::ModelUnavailable)?;
        match loader() {
            Ok(model) => {
                let model = Arc::new(model);
                info!(model = model.name(), "model handle initialized");
                *self.handle.write() = Some(Arc::clone(&model));
                *self.failed_at.write() = None;
                Ok(model)
            }
            Err(e) => {
                warn!(error = %e, backoff = ?self.retry_backoff, "model load failed; handle left empty");
                *self.failed_at.write() = Some(Instant::now());
                Err(e)
            }
        }
    }

    /// Forward pass on the shared handle, loading it first if needed.
    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<ProbabilityVector> {
        let model = self.load()?;
        model.predict(tensor)
    }

    /// Drop the handle and any remembered failure so the next use reloads.
    pub fn reset(&self) {
        let _guard = self.load_lock.lock();
        *self.handle.write() = None;
        *self.failed_at.write() = None;
    }

    fn check_backoff(&self) -> Result<()> {
        if let Some(failed_at) = *self.failed_at.read() {
            if failed_at.elapsed() < self.retry_backoff {
                debug!("model load failed recently; not retrying yet");
                return Err(EmotionError::ModelUnavailable);
            }
        }
        Ok(())
    }

    fn current(&self) -> Option<Arc<M>> {
        self.handle.read().clone()
    }
}
