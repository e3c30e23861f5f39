//! Error taxonomy for a collection run.

use thiserror::Error;

use crate::cid::Cid;

/// Errors a collection run can surface on its result stream.
#[derive(Debug, Error)]
pub enum GcError {
    /// Link resolution failed for a strictly-traversed node. Terminal for
    /// the run.
    #[error("could not retrieve links for {cid}: {source}")]
    CannotFetchLinks {
        cid: Cid,
        #[source]
        source: anyhow::Error,
    },

    /// A single block could not be removed during the sweep. Reported
    /// inline; the sweep keeps going.
    #[error("could not remove {cid}: {source}")]
    CannotDeleteBlock {
        cid: Cid,
        #[source]
        source: anyhow::Error,
    },

    /// Emitted once at the end of the sweep when at least one per-block
    /// delete failed.
    #[error("garbage collection incomplete: could not delete some blocks")]
    CannotDeleteSomeBlocks,

    /// Aggregate for the non-streaming walk. Reserved; the streaming path
    /// never emits it.
    #[error("garbage collection aborted: could not retrieve some links")]
    CannotFetchAllLinks,

    /// The ambient cancellation token fired.
    #[error("garbage collection canceled")]
    Canceled,

    /// The pinner failed to flush or enumerate its roots.
    #[error("pinner failure: {source}")]
    Pinner {
        #[source]
        source: anyhow::Error,
    },

    /// The block store failed outside of a per-block delete (for example
    /// while opening the key stream).
    #[error("block store failure: {source}")]
    Store {
        #[source]
        source: anyhow::Error,
    },
}

impl GcError {
    pub fn fetch_links(cid: Cid, cause: impl Into<anyhow::Error>) -> Self {
        GcError::CannotFetchLinks {
            cid,
            source: cause.into(),
        }
    }

    pub fn delete_block(cid: Cid, cause: impl Into<anyhow::Error>) -> Self {
        GcError::CannotDeleteBlock {
            cid,
            source: cause.into(),
        }
    }

    pub fn pinner(cause: impl Into<anyhow::Error>) -> Self {
        GcError::Pinner {
            source: cause.into(),
        }
    }

    pub fn store(cause: impl Into<anyhow::Error>) -> Self {
        GcError::Store {
            source: cause.into(),
        }
    }
}

/// Errors the link service can return from a lookup.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The block is not locally held. Tolerated under best-effort roots.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// Any other resolution failure. Always fatal.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GcError>;
