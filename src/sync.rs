//! Shared Context
//!
//! Coarse locking for callers that need one [`Context`] across threads,
//! behind the `sync` feature. The registries themselves are single-threaded
//! by design; this wrapper serializes whole operations rather than trying to
//! make the interior concurrent.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::EngineConfig;
use crate::context::Context;
use crate::gfx::GraphicsBackend;

/// A cloneable, mutex-guarded [`Context`].
///
/// Every accessor takes the lock for the duration of one call; use
/// [`lock`](Self::lock) to batch several operations under one acquisition,
/// e.g. a load-then-create pair that must not interleave with another
/// thread's destroy.
#[derive(Clone)]
pub struct SharedContext {
    inner: Arc<Mutex<Context>>,
}

impl SharedContext {
    #[must_use]
    pub fn new(config: &EngineConfig, backend: Box<dyn GraphicsBackend + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Context::new(config, backend))),
        }
    }

    /// Wraps an already constructed context.
    #[must_use]
    pub fn from_context(context: Context) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// Locks the context for a batch of operations.
    pub fn lock(&self) -> MutexGuard<'_, Context> {
        self.inner.lock()
    }

    /// Runs a closure under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
