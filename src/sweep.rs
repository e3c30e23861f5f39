//! The sweep engine: store enumeration and white-block deletion.

use tokio::sync::mpsc;
use tracing::info;

use crate::cancel::CancelToken;
use crate::cid::Cid;
use crate::error::{GcError, Result};
use crate::store::GcBlockstore;
use crate::triset::{Role, Triset};

/// Tallies reported after a sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Keys found white, i.e. deletion candidates.
    pub white: u64,
    /// Keys found in any other role.
    pub non_white: u64,
    /// Candidates actually removed from the store.
    pub removed: u64,
    /// Candidates whose removal failed.
    pub failed: u64,
}

/// Pull every key the store currently holds into the set as fresh.
pub async fn enumerate_all(
    set: &mut Triset,
    store: &dyn GcBlockstore,
    cancel: &CancelToken,
) -> Result<()> {
    let mut keys = store.all_keys(cancel).await.map_err(GcError::store)?;
    loop {
        tokio::select! {
            _ = cancel.canceled() => return Err(GcError::Canceled),
            key = keys.recv() => match key {
                Some(cid) => set.insert_fresh(&cid),
                None => break,
            },
        }
    }
    Ok(())
}

/// Delete every known-white key, streaming each removal on `out`.
///
/// Per-block delete failures are reported inline and do not stop the
/// sweep; one aggregate error follows at the end if any occurred. Keys
/// that are absent from the set are never touched, so blocks written
/// after enumeration are immune.
pub async fn delete_white(
    set: &Triset,
    store: &dyn GcBlockstore,
    out: &mpsc::Sender<Result<Cid>>,
    cancel: &CancelToken,
) -> Result<SweepStats> {
    let mut stats = SweepStats::default();
    let mut canceled = false;

    for (key, role) in set.iter() {
        if role != Role::White {
            stats.non_white += 1;
            continue;
        }
        stats.white += 1;

        // Keys in the set were produced by Cid::to_bytes; a parse failure
        // here is a corrupted set, not an input problem.
        let cid = Cid::from_bytes(key).expect("triset keys round-trip to cids");

        let event = match store.delete_block(&cid).await {
            Ok(()) => {
                stats.removed += 1;
                Ok(cid)
            }
            Err(err) => {
                stats.failed += 1;
                Err(GcError::delete_block(cid, err))
            }
        };
        if !send_or_cancel(out, event, cancel).await {
            canceled = true;
            break;
        }
    }

    info!(
        white = stats.white,
        non_white = stats.non_white,
        removed = stats.removed,
        failed = stats.failed,
        "sweep finished"
    );

    if canceled {
        return Err(GcError::Canceled);
    }
    if stats.failed > 0 {
        let _ = out.send(Err(GcError::CannotDeleteSomeBlocks)).await;
    }
    Ok(stats)
}

/// Send a result, giving up if the run is canceled or the receiver is
/// gone. Returns false when the sweep should stop.
async fn send_or_cancel(
    out: &mpsc::Sender<Result<Cid>>,
    event: Result<Cid>,
    cancel: &CancelToken,
) -> bool {
    tokio::select! {
        sent = out.send(event) => sent.is_ok(),
        _ = cancel.canceled() => false,
    }
}
