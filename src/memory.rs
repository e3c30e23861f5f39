//! In-memory implementations of the consumed interfaces, used by the
//! test suites and examples.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, RwLock as AsyncRwLock};

use crate::cancel::CancelToken;
use crate::cid::Cid;
use crate::error::LinkError;
use crate::store::{GcBlockstore, GcGuard, LinkService, Pinner};

/// Block store backed by a hash map.
///
/// A block's payload is its link list, which the companion
/// [`MemLinkService`] resolves from. Per-key delete failures can be
/// injected for tests.
pub struct MemBlockstore {
    blocks: RwLock<HashMap<Cid, Vec<Cid>>>,
    failing: RwLock<HashSet<Cid>>,
    gc_lock: Arc<AsyncRwLock<()>>,
}

impl MemBlockstore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            blocks: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            gc_lock: Arc::new(AsyncRwLock::new(())),
        })
    }

    /// Store a block with the given outgoing links.
    pub fn put(&self, cid: Cid, links: Vec<Cid>) {
        self.blocks.write().insert(cid, links);
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().contains_key(cid)
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn keys(&self) -> Vec<Cid> {
        self.blocks.read().keys().cloned().collect()
    }

    /// Make every future delete of `cid` fail.
    pub fn fail_delete(&self, cid: Cid) {
        self.failing.write().insert(cid);
    }

    fn links_of(&self, cid: &Cid) -> Option<Vec<Cid>> {
        self.blocks.read().get(cid).cloned()
    }
}

#[async_trait]
impl GcBlockstore for MemBlockstore {
    async fn gc_lock(&self) -> GcGuard {
        GcGuard::new(self.gc_lock.clone().write_owned().await)
    }

    async fn all_keys(&self, _cancel: &CancelToken) -> anyhow::Result<mpsc::Receiver<Cid>> {
        // Snapshot at open; later writes are not reflected.
        let keys = self.keys();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for key in keys {
                if tx.send(key).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn delete_block(&self, cid: &Cid) -> anyhow::Result<()> {
        if self.failing.read().contains(cid) {
            bail!("injected delete failure for {cid}");
        }
        if self.blocks.write().remove(cid).is_none() {
            bail!("block not found: {cid}");
        }
        Ok(())
    }
}

/// Link service resolving from a [`MemBlockstore`]'s link table.
///
/// Already offline; `offline_view` returns itself. Per-key resolution
/// failures (other than not-found) can be injected for tests.
pub struct MemLinkService {
    store: Arc<MemBlockstore>,
    failing: RwLock<HashSet<Cid>>,
}

impl MemLinkService {
    pub fn new(store: Arc<MemBlockstore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            failing: RwLock::new(HashSet::new()),
        })
    }

    /// Make every future link lookup of `cid` fail with a non-not-found
    /// error.
    pub fn fail_links(&self, cid: Cid) {
        self.failing.write().insert(cid);
    }
}

#[async_trait]
impl LinkService for MemLinkService {
    fn offline_view(self: Arc<Self>) -> Arc<dyn LinkService> {
        self
    }

    async fn get_links(&self, _cancel: &CancelToken, cid: &Cid) -> Result<Vec<Cid>, LinkError> {
        if self.failing.read().contains(cid) {
            return Err(LinkError::Other(anyhow::anyhow!(
                "injected link failure for {cid}"
            )));
        }
        match self.store.links_of(cid) {
            Some(links) => Ok(links),
            None => Err(LinkError::NotFound(cid.clone())),
        }
    }
}

/// Pinner over in-memory pin lists.
#[derive(Default)]
pub struct MemPinner {
    recursive: RwLock<Vec<Cid>>,
    direct: RwLock<Vec<Cid>>,
    internal: RwLock<Vec<Cid>>,
    flushes: AtomicUsize,
}

impl MemPinner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pin_recursive(&self, cid: Cid) {
        self.recursive.write().push(cid);
    }

    pub fn pin_direct(&self, cid: Cid) {
        self.direct.write().push(cid);
    }

    pub fn pin_internal(&self, cid: Cid) {
        self.internal.write().push(cid);
    }

    /// How many times the collector has flushed this pinner.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pinner for MemPinner {
    async fn flush(&self) -> anyhow::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recursive_keys(&self) -> anyhow::Result<Vec<Cid>> {
        Ok(self.recursive.read().clone())
    }

    async fn direct_keys(&self) -> anyhow::Result<Vec<Cid>> {
        Ok(self.direct.read().clone())
    }

    async fn internal_pins(&self) -> anyhow::Result<Vec<Cid>> {
        Ok(self.internal.read().clone())
    }
}
