//! The collection coordinator: locking, two-phase marking, enumeration
//! and sweep.
//!
//! The expensive graph walk runs without the store lock so writers are
//! not stalled. Anything pinned while the lock was down is caught by
//! re-seeding and re-marking under the second lock, and blocks written
//! after enumeration are immune because the sweep only deletes keys it
//! has observed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::cid::Cid;
use crate::error::Result;
use crate::mark::mark_to_fixed_point;
use crate::roots::{collect_roots, seed, SeedPhase};
use crate::store::{GcBlockstore, GcGuard, LinkService, Pinner};
use crate::sweep::{delete_white, enumerate_all};
use crate::triset::Triset;

/// Tunables for a collection run.
#[derive(Clone, Debug)]
pub struct GcConfig {
    /// Bound on the result stream buffer.
    pub result_buffer: usize,
    /// Initial capacity of the gray work stack.
    pub gray_stack_capacity: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            result_buffer: 128,
            gray_stack_capacity: 1 << 10,
        }
    }
}

/// Run a mark-and-sweep collection over `store` with default tunables.
///
/// Returns immediately; the run executes on a spawned task and streams a
/// result per removed block. A terminal error, if any, is the last item
/// before the stream closes. The stream is closed exactly once.
pub fn run_gc(
    cancel: CancelToken,
    store: Arc<dyn GcBlockstore>,
    links: Arc<dyn LinkService>,
    pinner: Arc<dyn Pinner>,
    best_effort_roots: Vec<Cid>,
) -> mpsc::Receiver<Result<Cid>> {
    run_gc_with_config(
        GcConfig::default(),
        cancel,
        store,
        links,
        pinner,
        best_effort_roots,
    )
}

/// [`run_gc`] with explicit tunables.
pub fn run_gc_with_config(
    config: GcConfig,
    cancel: CancelToken,
    store: Arc<dyn GcBlockstore>,
    links: Arc<dyn LinkService>,
    pinner: Arc<dyn Pinner>,
    best_effort_roots: Vec<Cid>,
) -> mpsc::Receiver<Result<Cid>> {
    let (tx, rx) = mpsc::channel(config.result_buffer.max(1));
    tokio::spawn(async move {
        if let Err(err) = collect(config, cancel, store, links, pinner, best_effort_roots, &tx).await
        {
            let _ = tx.send(Err(err)).await;
        }
        // tx drops here, closing the stream.
    });
    rx
}

#[allow(clippy::too_many_arguments)]
async fn collect(
    config: GcConfig,
    cancel: CancelToken,
    store: Arc<dyn GcBlockstore>,
    links: Arc<dyn LinkService>,
    pinner: Arc<dyn Pinner>,
    best_effort_roots: Vec<Cid>,
    out: &mpsc::Sender<Result<Cid>>,
) -> Result<()> {
    let links = links.offline_view();
    let mut set = Triset::with_capacity(config.gray_stack_capacity);

    // Seed under the lock, then release it for the long walk.
    let guard = lock_store(store.as_ref()).await;
    let roots = collect_roots(pinner.as_ref(), &best_effort_roots, SeedPhase::Initial).await?;
    seed(&mut set, &roots);
    guard.unlock();

    debug!("marking without the store lock");
    mark_to_fixed_point(&mut set, links.as_ref(), &cancel).await?;

    // Track every key that exists before re-locking. Writes that land
    // later never enter the set and cannot be swept.
    enumerate_all(&mut set, store.as_ref(), &cancel).await?;

    // Re-seed under the second lock to catch pins added during the walk.
    // Direct pins are blackened ahead of internal pins so internal
    // traversal halts at them.
    let _guard = lock_store(store.as_ref()).await;
    let roots = collect_roots(pinner.as_ref(), &best_effort_roots, SeedPhase::Full).await?;
    seed(&mut set, &roots);

    debug!("re-marking under the store lock");
    mark_to_fixed_point(&mut set, links.as_ref(), &cancel).await?;

    delete_white(&set, store.as_ref(), out, &cancel).await?;
    Ok(())
}

async fn lock_store(store: &dyn GcBlockstore) -> GcGuard {
    debug!("waiting for the gc lock");
    let guard = store.gc_lock().await;
    debug!("gc lock held");
    guard
}
