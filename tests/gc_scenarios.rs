//! End-to-end collection runs over the in-memory store.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use blockgc::memory::{MemBlockstore, MemLinkService, MemPinner};
use blockgc::{run_gc, CancelToken, Cid, GcBlockstore, GcError, GcGuard};

fn cid(s: &str) -> Cid {
    Cid::new(s.as_bytes())
}

fn fixture() -> (Arc<MemBlockstore>, Arc<MemLinkService>, Arc<MemPinner>) {
    let store = MemBlockstore::new();
    let links = MemLinkService::new(store.clone());
    let pinner = MemPinner::new();
    (store, links, pinner)
}

async fn drain(
    mut rx: mpsc::Receiver<Result<Cid, GcError>>,
) -> (Vec<Cid>, Vec<GcError>) {
    let mut removed = Vec::new();
    let mut errors = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            Ok(key) => removed.push(key),
            Err(err) => errors.push(err),
        }
    }
    (removed, errors)
}

#[tokio::test]
async fn empty_store_no_pins_is_a_clean_noop() {
    let (store, links, pinner) = fixture();

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(removed.is_empty());
    assert!(errors.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn recursively_pinned_chain_survives_untouched() {
    let (store, links, pinner) = fixture();
    store.put(cid("a"), vec![cid("b")]);
    store.put(cid("b"), vec![cid("c")]);
    store.put(cid("c"), vec![]);
    pinner.pin_recursive(cid("a"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(removed.is_empty());
    assert!(errors.is_empty());
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn unpinned_ancestors_and_orphans_are_removed() {
    let (store, links, pinner) = fixture();
    store.put(cid("a"), vec![cid("b")]);
    store.put(cid("b"), vec![cid("c")]);
    store.put(cid("c"), vec![]);
    store.put(cid("d"), vec![]);
    pinner.pin_recursive(cid("b"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (mut removed, errors) = drain(rx).await;
    removed.sort();

    assert!(errors.is_empty());
    assert_eq!(removed, vec![cid("a"), cid("d")]);
    assert!(store.contains(&cid("b")) && store.contains(&cid("c")));
}

#[tokio::test]
async fn best_effort_root_tolerates_a_missing_subtree() {
    let (store, links, pinner) = fixture();
    // "top" references a block that was never stored.
    store.put(cid("top"), vec![cid("gone"), cid("kept")]);
    store.put(cid("kept"), vec![]);
    store.put(cid("orphan"), vec![]);

    let rx = run_gc(
        CancelToken::new(),
        store.clone(),
        links,
        pinner,
        vec![cid("top")],
    );
    let (removed, errors) = drain(rx).await;

    assert!(errors.is_empty(), "missing best-effort subtree is not an error");
    assert_eq!(removed, vec![cid("orphan")]);
    assert!(store.contains(&cid("top")) && store.contains(&cid("kept")));
}

#[tokio::test]
async fn strict_root_with_missing_subtree_aborts_without_deleting() {
    let (store, links, pinner) = fixture();
    store.put(cid("top"), vec![cid("gone")]);
    store.put(cid("orphan"), vec![]);
    pinner.pin_recursive(cid("top"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(removed.is_empty(), "an aborted run deletes nothing");
    assert_eq!(store.len(), 2);
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        GcError::CannotFetchLinks { cid: key, .. } => assert_eq!(*key, cid("gone")),
        other => panic!("unexpected error: {other}"),
    }
}

/// Delegating store whose key enumeration fires a one-shot hook, placed
/// exactly in the window after the first mark released the lock and
/// before the second lock is taken.
struct HookedStore {
    inner: Arc<MemBlockstore>,
    on_all_keys: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

#[async_trait]
impl GcBlockstore for HookedStore {
    async fn gc_lock(&self) -> GcGuard {
        self.inner.gc_lock().await
    }

    async fn all_keys(&self, cancel: &CancelToken) -> anyhow::Result<mpsc::Receiver<Cid>> {
        if let Some(hook) = self.on_all_keys.lock().unwrap().take() {
            hook();
        }
        self.inner.all_keys(cancel).await
    }

    async fn delete_block(&self, cid: &Cid) -> anyhow::Result<()> {
        self.inner.delete_block(cid).await
    }
}

#[tokio::test]
async fn pin_added_during_the_unlocked_walk_is_spared() {
    let (store, links, pinner) = fixture();
    store.put(cid("x"), vec![]);
    store.put(cid("y"), vec![]);

    let hook_pinner = pinner.clone();
    let hooked = Arc::new(HookedStore {
        inner: store.clone(),
        on_all_keys: Mutex::new(Some(Box::new(move || {
            hook_pinner.pin_recursive(cid("x"));
        }))),
    });

    let rx = run_gc(CancelToken::new(), hooked, links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(errors.is_empty());
    assert_eq!(removed, vec![cid("y")]);
    assert!(store.contains(&cid("x")), "the late pin must be caught by the re-seed");
}

#[tokio::test]
async fn direct_pin_keeps_the_block_but_not_its_descendants() {
    let (store, links, pinner) = fixture();
    store.put(cid("a"), vec![cid("b")]);
    store.put(cid("b"), vec![]);
    pinner.pin_direct(cid("a"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(errors.is_empty());
    assert_eq!(removed, vec![cid("b")]);
    assert!(store.contains(&cid("a")));
}

#[tokio::test]
async fn internal_pin_traversal_halts_at_direct_pins() {
    let (store, links, pinner) = fixture();
    store.put(cid("meta"), vec![cid("pinned")]);
    store.put(cid("pinned"), vec![cid("below")]);
    store.put(cid("below"), vec![]);
    pinner.pin_internal(cid("meta"));
    pinner.pin_direct(cid("pinned"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(errors.is_empty());
    assert_eq!(removed, vec![cid("below")]);
    assert!(store.contains(&cid("meta")) && store.contains(&cid("pinned")));
}

#[tokio::test]
async fn pinner_is_flushed_before_each_seed() {
    let (store, links, pinner) = fixture();

    let rx = run_gc(
        CancelToken::new(),
        store,
        links,
        pinner.clone(),
        vec![],
    );
    drain(rx).await;

    assert_eq!(pinner.flush_count(), 2);
}

#[tokio::test]
async fn per_block_delete_failure_does_not_stop_the_run() {
    let (store, links, pinner) = fixture();
    store.put(cid("stuck"), vec![]);
    store.put(cid("loose"), vec![]);
    store.fail_delete(cid("stuck"));

    let rx = run_gc(CancelToken::new(), store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert_eq!(removed, vec![cid("loose")]);
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], GcError::CannotDeleteBlock { .. }));
    assert!(matches!(errors[1], GcError::CannotDeleteSomeBlocks));
    assert!(store.contains(&cid("stuck")));
}

#[tokio::test]
async fn canceled_run_ends_with_a_terminal_error() {
    let (store, links, pinner) = fixture();
    store.put(cid("a"), vec![]);
    pinner.pin_recursive(cid("a"));

    let cancel = CancelToken::new();
    cancel.cancel();

    let rx = run_gc(cancel, store.clone(), links, pinner, vec![]);
    let (removed, errors) = drain(rx).await;

    assert!(removed.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], GcError::Canceled));
    assert!(store.contains(&cid("a")));
}
