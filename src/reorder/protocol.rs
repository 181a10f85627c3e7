//! The reorder protocol: classify a drag gesture, apply the new order to the
//! snapshot optimistically, persist the changed ranks, and fall back to the
//! store's authoritative state when any write fails.
//!
//! The snapshot mutation is synchronous and happens before the first await,
//! so a caller rendering from the snapshot shows the new order immediately.
//! The writes of one reorder are issued concurrently and awaited as one
//! unit; a partial failure is indistinguishable from a total one and both
//! trigger the same refetch. There is no retry and no cancellation of
//! in-flight writes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::db::models::{Link, Tag};

use super::drag::{classify, DragId, ReorderScope};
use super::model::{contiguous_ranks, move_item, Snapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
}

/// The persistence surface the protocol reconciles against. Mirrors the
/// REST interface: collection fetches plus per-entity and batch rank
/// writes.
#[async_trait]
pub trait RankStore: Send + Sync {
    async fn fetch_links(&self) -> Result<Vec<Link>, StoreError>;
    async fn fetch_tags(&self) -> Result<Vec<Tag>, StoreError>;
    /// Persists a link's current fields, rank included.
    async fn update_link(&self, link: &Link) -> Result<(), StoreError>;
    /// Persists a tag's section rank.
    async fn update_tag_rank(&self, tag_id: i32, order_index: i32) -> Result<(), StoreError>;
    /// Rewrites the per-tag ranks of a tag's member links in one call.
    async fn reorder_tag_links(&self, tag_id: i32, link_ids: &[i32]) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: RankStore + ?Sized> RankStore for Arc<S> {
    async fn fetch_links(&self) -> Result<Vec<Link>, StoreError> {
        (**self).fetch_links().await
    }
    async fn fetch_tags(&self) -> Result<Vec<Tag>, StoreError> {
        (**self).fetch_tags().await
    }
    async fn update_link(&self, link: &Link) -> Result<(), StoreError> {
        (**self).update_link(link).await
    }
    async fn update_tag_rank(&self, tag_id: i32, order_index: i32) -> Result<(), StoreError> {
        (**self).update_tag_rank(tag_id, order_index).await
    }
    async fn reorder_tag_links(&self, tag_id: i32, link_ids: &[i32]) -> Result<(), StoreError> {
        (**self).reorder_tag_links(tag_id, link_ids).await
    }
}

/// What a finished drag gesture amounted to.
#[derive(Debug)]
pub enum ReorderOutcome {
    /// Invalid gesture: no target, same element, cross-scope drop, or an
    /// unresolvable index. Nothing was mutated, nothing was sent.
    Noop,
    /// All rank writes succeeded; the optimistic state is now confirmed.
    Confirmed { scope: ReorderScope },
    /// A write failed; the snapshot was replaced with the store's
    /// authoritative state. The error is carried for the caller's
    /// user-facing notification.
    RolledBack { scope: ReorderScope, error: StoreError },
}

/// Drag-gesture driver holding the single-writer snapshot.
pub struct Reorderer<S> {
    snapshot: Snapshot,
    store: S,
    active: Option<DragId>,
}

impl<S: RankStore> Reorderer<S> {
    pub fn new(store: S) -> Self {
        Reorderer {
            snapshot: Snapshot::default(),
            store,
            active: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Replaces the snapshot with the store's current state. With no reorder
    /// in flight this is idempotent as long as the store has not changed.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let links = self.store.fetch_links().await?;
        let tags = self.store.fetch_tags().await?;
        self.snapshot.replace_links(links);
        self.snapshot.replace_tags(tags);
        Ok(())
    }

    pub fn drag_start(&mut self, id: DragId) {
        self.active = Some(id);
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Finishes the gesture. `over` is the drop target, or `None` when the
    /// element was dropped outside any valid target.
    pub async fn drag_end(&mut self, over: Option<DragId>) -> ReorderOutcome {
        let Some(active) = self.active.take() else {
            return ReorderOutcome::Noop;
        };
        let Some(over) = over else {
            return ReorderOutcome::Noop;
        };
        if active == over {
            return ReorderOutcome::Noop;
        }
        let Some(scope) = classify(&active, &over) else {
            debug!(active = %active, over = %over, "cross-scope drop discarded");
            return ReorderOutcome::Noop;
        };

        match scope {
            ReorderScope::Global => {
                let order = self.snapshot.global_order();
                self.reorder_link_scope(scope, order, &active, &over).await
            }
            ReorderScope::Uncategorized => {
                let order = self.snapshot.uncategorized_order();
                self.reorder_link_scope(scope, order, &active, &over).await
            }
            ReorderScope::Tag(tag_id) => self.reorder_tag_scope(tag_id, &active, &over).await,
            ReorderScope::TagList => self.reorder_tag_list(&active, &over).await,
        }
    }

    /// Global and uncategorized scopes: one rank write per link in the
    /// scope, issued concurrently.
    async fn reorder_link_scope(
        &mut self,
        scope: ReorderScope,
        order: Vec<i32>,
        active: &DragId,
        over: &DragId,
    ) -> ReorderOutcome {
        let Some(moved) = resolve_move(&order, active.link_id(), over.link_id()) else {
            return ReorderOutcome::Noop;
        };

        self.snapshot.apply_global_ranks(&moved);

        let payloads: Vec<Link> = moved
            .iter()
            .filter_map(|&id| self.snapshot.link(id).cloned())
            .collect();
        let result = try_join_all(payloads.iter().map(|l| self.store.update_link(l))).await;
        match result {
            Ok(_) => {
                info!(?scope, moved = moved.len(), "reorder confirmed");
                ReorderOutcome::Confirmed { scope }
            }
            Err(error) => {
                warn!(?scope, %error, "rank writes failed, reloading links");
                self.reload_links().await;
                ReorderOutcome::RolledBack { scope, error }
            }
        }
    }

    /// Tag scope: a single batch call carrying the ordered link ids.
    async fn reorder_tag_scope(
        &mut self,
        tag_id: i32,
        active: &DragId,
        over: &DragId,
    ) -> ReorderOutcome {
        let scope = ReorderScope::Tag(tag_id);
        let order = self.snapshot.tag_sublist_order(tag_id);
        let Some(moved) = resolve_move(&order, active.link_id(), over.link_id()) else {
            return ReorderOutcome::Noop;
        };

        self.snapshot.apply_tag_ranks(tag_id, &moved);

        match self.store.reorder_tag_links(tag_id, &moved).await {
            Ok(()) => {
                info!(tag_id, moved = moved.len(), "tag sublist reorder confirmed");
                ReorderOutcome::Confirmed { scope }
            }
            Err(error) => {
                warn!(tag_id, %error, "batch rank write failed, reloading links");
                self.reload_links().await;
                ReorderOutcome::RolledBack { scope, error }
            }
        }
    }

    /// Tag-list scope: one rank write per tag, issued concurrently.
    async fn reorder_tag_list(&mut self, active: &DragId, over: &DragId) -> ReorderOutcome {
        let scope = ReorderScope::TagList;
        let (DragId::TagSection { tag_id: active_id }, DragId::TagSection { tag_id: over_id }) =
            (active, over)
        else {
            return ReorderOutcome::Noop;
        };

        let order = self.snapshot.tag_list_order();
        let Some(moved) = resolve_move(&order, Some(*active_id), Some(*over_id)) else {
            return ReorderOutcome::Noop;
        };

        self.snapshot.apply_tag_list_ranks(&moved);

        let ranks = contiguous_ranks(&moved);
        let result = try_join_all(
            ranks
                .iter()
                .map(|&(tag_id, rank)| self.store.update_tag_rank(tag_id, rank)),
        )
        .await;
        match result {
            Ok(_) => {
                info!(moved = moved.len(), "tag list reorder confirmed");
                ReorderOutcome::Confirmed { scope }
            }
            Err(error) => {
                warn!(%error, "tag rank writes failed, reloading tags");
                self.reload_tags().await;
                ReorderOutcome::RolledBack { scope, error }
            }
        }
    }

    async fn reload_links(&mut self) {
        match self.store.fetch_links().await {
            Ok(links) => self.snapshot.replace_links(links),
            // The snapshot stays as-is; the next successful refresh fixes it.
            Err(e) => error!(%e, "failed to reload links after rollback"),
        }
    }

    async fn reload_tags(&mut self) {
        match self.store.fetch_tags().await {
            Ok(tags) => self.snapshot.replace_tags(tags),
            Err(e) => error!(%e, "failed to reload tags after rollback"),
        }
    }
}

/// Turns the (source, target) entity ids into the reordered id sequence, or
/// `None` when either cannot be found in the scope.
fn resolve_move(order: &[i32], active: Option<i32>, over: Option<i32>) -> Option<Vec<i32>> {
    let from = order.iter().position(|&id| Some(id) == active)?;
    let to = order.iter().position(|&id| Some(id) == over)?;
    move_item(order, from, to)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::super::model::test_fixtures::*;
    use super::*;

    /// In-memory store: applies writes to its own copies so a post-failure
    /// fetch returns exactly what "the server" holds, successful partial
    /// writes included.
    #[derive(Default)]
    struct MemoryStore {
        links: Mutex<Vec<Link>>,
        tags: Mutex<Vec<Tag>>,
        link_writes: Mutex<Vec<(i32, i32)>>,
        tag_rank_writes: Mutex<Vec<(i32, i32)>>,
        batch_writes: Mutex<Vec<(i32, Vec<i32>)>>,
        fetches: AtomicUsize,
        fail_link_ids: Mutex<Vec<i32>>,
    }

    impl MemoryStore {
        fn with_data(links: Vec<Link>, tags: Vec<Tag>) -> Arc<Self> {
            let store = MemoryStore::default();
            *store.links.lock().unwrap() = links;
            *store.tags.lock().unwrap() = tags;
            Arc::new(store)
        }

        fn fail_on_link(&self, link_id: i32) {
            self.fail_link_ids.lock().unwrap().push(link_id);
        }

        fn link_write_count(&self) -> usize {
            self.link_writes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RankStore for MemoryStore {
        async fn fetch_links(&self) -> Result<Vec<Link>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.links.lock().unwrap().clone())
        }

        async fn fetch_tags(&self) -> Result<Vec<Tag>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.tags.lock().unwrap().clone())
        }

        async fn update_link(&self, link: &Link) -> Result<(), StoreError> {
            if self.fail_link_ids.lock().unwrap().contains(&link.id) {
                return Err(StoreError::Transport("connection reset".into()));
            }
            self.link_writes
                .lock()
                .unwrap()
                .push((link.id, link.order_index));
            if let Some(stored) = self.links.lock().unwrap().iter_mut().find(|l| l.id == link.id)
            {
                stored.order_index = link.order_index;
            }
            Ok(())
        }

        async fn update_tag_rank(&self, tag_id: i32, order_index: i32) -> Result<(), StoreError> {
            self.tag_rank_writes.lock().unwrap().push((tag_id, order_index));
            if let Some(stored) = self.tags.lock().unwrap().iter_mut().find(|t| t.id == tag_id) {
                stored.order_index = order_index;
            }
            Ok(())
        }

        async fn reorder_tag_links(
            &self,
            tag_id: i32,
            link_ids: &[i32],
        ) -> Result<(), StoreError> {
            self.batch_writes
                .lock()
                .unwrap()
                .push((tag_id, link_ids.to_vec()));
            let mut links = self.links.lock().unwrap();
            for (position, &link_id) in link_ids.iter().enumerate() {
                if let Some(stored) = links.iter_mut().find(|l| l.id == link_id) {
                    if let Some(assoc) = stored.tags.iter_mut().find(|t| t.id == tag_id) {
                        assoc.order_index = position as i32;
                    }
                }
            }
            Ok(())
        }
    }

    async fn reorderer_with(
        links: Vec<Link>,
        tags: Vec<Tag>,
    ) -> (Reorderer<Arc<MemoryStore>>, Arc<MemoryStore>) {
        let store = MemoryStore::with_data(links, tags);
        let mut reorderer = Reorderer::new(store.clone());
        reorderer.refresh().await.unwrap();
        (reorderer, store)
    }

    #[tokio::test]
    async fn global_reorder_writes_every_rank_and_confirms() {
        let (mut r, store) = reorderer_with(
            vec![link(1, 0, vec![]), link(2, 1, vec![]), link(3, 2, vec![])],
            vec![],
        )
        .await;

        // Drag B (id 2) to the front.
        r.drag_start(DragId::Simple { link_id: 2 });
        let outcome = r.drag_end(Some(DragId::Simple { link_id: 1 })).await;

        assert!(matches!(outcome, ReorderOutcome::Confirmed { scope: ReorderScope::Global }));
        assert_eq!(r.snapshot().global_order(), vec![2, 1, 3]);
        assert_eq!(store.link_write_count(), 3);

        let persisted: Vec<(i32, i32)> = store
            .links
            .lock()
            .unwrap()
            .iter()
            .map(|l| (l.id, l.order_index))
            .collect();
        assert!(persisted.contains(&(2, 0)));
        assert!(persisted.contains(&(1, 1)));
        assert!(persisted.contains(&(3, 2)));
    }

    #[tokio::test]
    async fn dropping_an_element_on_itself_changes_nothing() {
        let (mut r, store) =
            reorderer_with(vec![link(1, 0, vec![]), link(2, 1, vec![])], vec![]).await;
        let before = r.snapshot().clone();

        r.drag_start(DragId::Simple { link_id: 2 });
        let outcome = r.drag_end(Some(DragId::Simple { link_id: 2 })).await;

        assert!(matches!(outcome, ReorderOutcome::Noop));
        assert_eq!(r.snapshot().links, before.links);
        assert_eq!(store.link_write_count(), 0);
    }

    #[tokio::test]
    async fn dropping_outside_any_target_changes_nothing() {
        let (mut r, store) =
            reorderer_with(vec![link(1, 0, vec![]), link(2, 1, vec![])], vec![]).await;

        r.drag_start(DragId::Simple { link_id: 1 });
        let outcome = r.drag_end(None).await;

        assert!(matches!(outcome, ReorderOutcome::Noop));
        assert_eq!(store.link_write_count(), 0);
    }

    #[tokio::test]
    async fn cross_scope_drop_is_discarded() {
        let (mut r, store) = reorderer_with(
            vec![link(1, 0, vec![tag_ref(10, 0)]), link(2, 1, vec![tag_ref(10, 1)])],
            vec![tag(10, 0), tag(20, 1)],
        )
        .await;

        // A tag-section handle dropped onto a link card.
        r.drag_start(DragId::TagSection { tag_id: 20 });
        let outcome = r
            .drag_end(Some(DragId::Tagged { tag_id: 10, link_id: 2 }))
            .await;

        assert!(matches!(outcome, ReorderOutcome::Noop));
        assert_eq!(store.link_write_count(), 0);
        assert!(store.tag_rank_writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tag_sublist_reorder_uses_one_batch_call_and_spares_other_scopes() {
        // X (id 1) is in Work (10) and Personal (20, rank 3); Y (id 2) only
        // in Work. Dragging Y to the front of Work must leave X's rank in
        // Personal and its global rank alone.
        let (mut r, store) = reorderer_with(
            vec![
                link(1, 0, vec![tag_ref(10, 0), tag_ref(20, 3)]),
                link(2, 1, vec![tag_ref(10, 1)]),
            ],
            vec![tag(10, 0), tag(20, 1)],
        )
        .await;

        r.drag_start(DragId::Tagged { tag_id: 10, link_id: 2 });
        let outcome = r
            .drag_end(Some(DragId::Tagged { tag_id: 10, link_id: 1 }))
            .await;

        assert!(matches!(outcome, ReorderOutcome::Confirmed { scope: ReorderScope::Tag(10) }));
        assert_eq!(r.snapshot().tag_sublist_order(10), vec![2, 1]);

        let batches = store.batch_writes.lock().unwrap().clone();
        assert_eq!(batches, vec![(10, vec![2, 1])]);
        assert_eq!(store.link_write_count(), 0);

        let x = r.snapshot().link(1).unwrap();
        assert_eq!(x.order_index, 0);
        assert_eq!(x.tag_rank(20), Some(3));
    }

    #[tokio::test]
    async fn uncategorized_reorder_only_writes_untagged_links() {
        let (mut r, store) = reorderer_with(
            vec![
                link(1, 0, vec![]),
                link(2, 1, vec![tag_ref(10, 0)]),
                link(3, 2, vec![]),
            ],
            vec![tag(10, 0)],
        )
        .await;

        r.drag_start(DragId::Uncategorized { link_id: 3 });
        let outcome = r.drag_end(Some(DragId::Uncategorized { link_id: 1 })).await;

        assert!(matches!(
            outcome,
            ReorderOutcome::Confirmed { scope: ReorderScope::Uncategorized }
        ));
        assert_eq!(r.snapshot().uncategorized_order(), vec![3, 1]);

        let written_ids: Vec<i32> = store
            .link_writes
            .lock()
            .unwrap()
            .iter()
            .map(|&(id, _)| id)
            .collect();
        assert_eq!(written_ids.len(), 2);
        assert!(written_ids.contains(&1) && written_ids.contains(&3));
        // The tagged link was outside the scope.
        assert_eq!(r.snapshot().link(2).unwrap().order_index, 1);
    }

    #[tokio::test]
    async fn tag_list_reorder_writes_each_tag_rank() {
        let (mut r, store) =
            reorderer_with(vec![], vec![tag(10, 0), tag(20, 1), tag(30, 2)]).await;

        r.drag_start(DragId::TagSection { tag_id: 30 });
        let outcome = r.drag_end(Some(DragId::TagSection { tag_id: 10 })).await;

        assert!(matches!(outcome, ReorderOutcome::Confirmed { scope: ReorderScope::TagList }));
        assert_eq!(r.snapshot().tag_list_order(), vec![30, 10, 20]);
        assert_eq!(store.tag_rank_writes.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_write_rolls_back_to_the_stores_state() {
        let (mut r, store) = reorderer_with(
            vec![link(1, 0, vec![]), link(2, 1, vec![]), link(3, 2, vec![])],
            vec![],
        )
        .await;
        store.fail_on_link(3);

        r.drag_start(DragId::Simple { link_id: 3 });
        let outcome = r.drag_end(Some(DragId::Simple { link_id: 1 })).await;

        let ReorderOutcome::RolledBack { scope, error } = outcome else {
            panic!("expected rollback");
        };
        assert_eq!(scope, ReorderScope::Global);
        assert!(matches!(error, StoreError::Transport(_)));

        // The snapshot must equal a fresh fetch, not the optimistic order.
        let authoritative = store.links.lock().unwrap().clone();
        assert_eq!(r.snapshot().links, authoritative);
    }

    #[tokio::test]
    async fn refresh_without_remote_changes_is_idempotent() {
        let (mut r, _store) = reorderer_with(
            vec![link(1, 0, vec![tag_ref(10, 0)]), link(2, 1, vec![])],
            vec![tag(10, 0)],
        )
        .await;

        let first = r.snapshot().clone();
        r.refresh().await.unwrap();
        assert_eq!(r.snapshot().links, first.links);
        assert_eq!(r.snapshot().tags, first.tags);
        assert_eq!(r.snapshot().global_order(), first.global_order());
    }

    #[tokio::test]
    async fn drag_end_without_drag_start_is_a_noop() {
        let (mut r, store) = reorderer_with(vec![link(1, 0, vec![])], vec![]).await;
        let outcome = r.drag_end(Some(DragId::Simple { link_id: 1 })).await;
        assert!(matches!(outcome, ReorderOutcome::Noop));
        assert_eq!(store.link_write_count(), 0);
    }
}
