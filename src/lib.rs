//! Online mark-and-sweep garbage collection for content-addressed block
//! stores.
//!
//! Blocks form an immutable DAG: each block is named by the [`Cid`] of
//! its contents and references other blocks by embedding their CIDs.
//! Pins keep roots alive; everything unreachable from a pinned root is
//! garbage. The collector runs online: the expensive graph walk happens
//! without the store lock so writers keep moving, and a second, locked
//! mark catches anything pinned mid-walk.
//!
//! ## Pieces
//!
//! - [`triset`]: color-annotated key set with a gray work stack and
//!   rotating role labels, so resetting the white population is free.
//! - [`roots`]: assembles the seed set from the pinner, classifying each
//!   root as strict or best-effort, traversed or terminal.
//! - [`mark`]: drives the set to its fixed point through the link
//!   service.
//! - [`sweep`]: enumerates the store, then deletes what stayed white,
//!   streaming each removal.
//! - [`run_gc`]: sequences the lock dance and owns the result stream.
//!
//! ## Example
//!
//! ```
//! use blockgc::memory::{MemBlockstore, MemLinkService, MemPinner};
//! use blockgc::{run_gc, CancelToken, Cid};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemBlockstore::new();
//! let links = MemLinkService::new(store.clone());
//! let pinner = MemPinner::new();
//!
//! let root = Cid::new(*b"root");
//! let leaf = Cid::new(*b"leaf");
//! let orphan = Cid::new(*b"orphan");
//! store.put(root.clone(), vec![leaf.clone()]);
//! store.put(leaf.clone(), vec![]);
//! store.put(orphan.clone(), vec![]);
//! pinner.pin_recursive(root.clone());
//!
//! let mut results = run_gc(CancelToken::new(), store.clone(), links, pinner, Vec::new());
//! while let Some(event) = results.recv().await {
//!     let removed = event.expect("collection failed");
//!     assert_eq!(removed, orphan);
//! }
//! assert!(store.contains(&root) && store.contains(&leaf));
//! assert!(!store.contains(&orphan));
//! # });
//! ```

pub mod cancel;
pub mod cid;
pub mod error;
pub mod mark;
pub mod memory;
pub mod roots;
pub mod run;
pub mod store;
pub mod sweep;
pub mod triset;

pub use cancel::CancelToken;
pub use cid::Cid;
pub use error::{GcError, LinkError, Result};
pub use run::{run_gc, run_gc_with_config, GcConfig};
pub use store::{GcBlockstore, GcGuard, LinkService, Pinner};
