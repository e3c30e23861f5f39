//! Interfaces the collector consumes: the block store, the link service
//! and the pinner.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::cancel::CancelToken;
use crate::cid::Cid;
use crate::error::LinkError;

/// Guard holding the store's exclusive GC lock.
///
/// Dropping the guard releases the lock, so it is released on every exit
/// path, panics included.
pub struct GcGuard {
    _held: Box<dyn Any + Send>,
}

impl GcGuard {
    /// Wrap whatever lock guard the store hands out.
    pub fn new(held: impl Any + Send) -> Self {
        Self {
            _held: Box::new(held),
        }
    }

    /// Release the lock now instead of at end of scope.
    pub fn unlock(self) {}
}

/// A block store that supports online garbage collection.
#[async_trait]
pub trait GcBlockstore: Send + Sync {
    /// Acquire the exclusive GC lock, waiting out in-flight writers.
    async fn gc_lock(&self) -> GcGuard;

    /// Stream every key currently stored. Order is unspecified; the
    /// stream reflects a snapshot no older than the moment it was opened.
    async fn all_keys(&self, cancel: &CancelToken) -> anyhow::Result<mpsc::Receiver<Cid>>;

    /// Remove a block. A missing key is a failure, not a no-op.
    async fn delete_block(&self, cid: &Cid) -> anyhow::Result<()>;
}

/// Resolves a block's outgoing links.
#[async_trait]
pub trait LinkService: Send + Sync {
    /// A view of this service that resolves links from locally-held
    /// blocks only and never touches the network.
    fn offline_view(self: Arc<Self>) -> Arc<dyn LinkService>;

    /// The outgoing links of `cid`. A locally-missing block reports
    /// [`LinkError::NotFound`].
    async fn get_links(&self, cancel: &CancelToken, cid: &Cid) -> Result<Vec<Cid>, LinkError>;
}

/// Enumerates the pinned roots.
#[async_trait]
pub trait Pinner: Send + Sync {
    /// Make pending pin mutations observable to the enumeration calls.
    async fn flush(&self) -> anyhow::Result<()>;

    /// Roots pinned recursively: the pin and all descendants are live.
    async fn recursive_keys(&self) -> anyhow::Result<Vec<Cid>>;

    /// Roots pinned directly: exactly the pinned block is live.
    async fn direct_keys(&self) -> anyhow::Result<Vec<Cid>>;

    /// The pinner's own bookkeeping pins.
    async fn internal_pins(&self) -> anyhow::Result<Vec<Cid>>;
}
