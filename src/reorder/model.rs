//! Ordered-collection model: the client-visible snapshot of links and tags
//! with their rank information, plus the pure transformations a reorder
//! needs. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::db::models::{Link, Tag};

/// The current snapshot of a user's collections. Mutated only by the
/// optimistic appliers below and by wholesale replacement with authoritative
/// data, so a rollback is a single assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub links: Vec<Link>,
    pub tags: Vec<Tag>,
}

/// Moves the element at `from` to position `to`, shifting everything in
/// between by one. Returns `None` when the indices are equal or out of
/// bounds, which callers treat as a no-op.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    if from == to || from >= items.len() || to >= items.len() {
        return None;
    }
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Some(moved)
}

/// Assigns rank = position to a reordered scope, yielding the
/// (entity id, new rank) pairs to persist.
pub fn contiguous_ranks(ordered_ids: &[i32]) -> Vec<(i32, i32)> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(position, &id)| (id, position as i32))
        .collect()
}

impl Snapshot {
    pub fn new(links: Vec<Link>, tags: Vec<Tag>) -> Self {
        Snapshot { links, tags }
    }

    /// Link ids in global order: ascending `order_index`, ties resolved by
    /// the stable sort (fetch order).
    pub fn global_order(&self) -> Vec<i32> {
        let mut links: Vec<&Link> = self.links.iter().collect();
        links.sort_by_key(|l| l.order_index);
        links.iter().map(|l| l.id).collect()
    }

    /// Ids of links with no tag associations, ordered by their global rank.
    pub fn uncategorized_order(&self) -> Vec<i32> {
        let mut links: Vec<&Link> = self.links.iter().filter(|l| l.tags.is_empty()).collect();
        links.sort_by_key(|l| l.order_index);
        links.iter().map(|l| l.id).collect()
    }

    /// Ids of the links belonging to `tag_id`, ordered by their rank within
    /// that tag's sublist.
    pub fn tag_sublist_order(&self, tag_id: i32) -> Vec<i32> {
        let mut links: Vec<&Link> = self.links.iter().filter(|l| l.has_tag(tag_id)).collect();
        links.sort_by_key(|l| l.tag_rank(tag_id).unwrap_or(0));
        links.iter().map(|l| l.id).collect()
    }

    /// Tag ids ordered by their section rank.
    pub fn tag_list_order(&self) -> Vec<i32> {
        let mut tags: Vec<&Tag> = self.tags.iter().collect();
        tags.sort_by_key(|t| t.order_index);
        tags.iter().map(|t| t.id).collect()
    }

    pub fn link(&self, link_id: i32) -> Option<&Link> {
        self.links.iter().find(|l| l.id == link_id)
    }

    pub fn tag(&self, tag_id: i32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag_id)
    }

    /// Optimistically writes global ranks for the links in `ordered_ids`
    /// (position = rank). Links outside the slice keep their rank.
    pub fn apply_global_ranks(&mut self, ordered_ids: &[i32]) {
        for (id, rank) in contiguous_ranks(ordered_ids) {
            if let Some(link) = self.links.iter_mut().find(|l| l.id == id) {
                link.order_index = rank;
            }
        }
    }

    /// Optimistically writes the per-tag ranks of `tag_id`'s sublist. Other
    /// tags' ranks and the global ranks are untouched.
    pub fn apply_tag_ranks(&mut self, tag_id: i32, ordered_ids: &[i32]) {
        for (id, rank) in contiguous_ranks(ordered_ids) {
            if let Some(link) = self.links.iter_mut().find(|l| l.id == id) {
                if let Some(assoc) = link.tags.iter_mut().find(|t| t.id == tag_id) {
                    assoc.order_index = rank;
                }
            }
        }
    }

    /// Optimistically writes the section ranks of the tag list.
    pub fn apply_tag_list_ranks(&mut self, ordered_ids: &[i32]) {
        for (id, rank) in contiguous_ranks(ordered_ids) {
            if let Some(tag) = self.tags.iter_mut().find(|t| t.id == id) {
                tag.order_index = rank;
            }
        }
    }

    /// Replaces the link collection with authoritative data from the store.
    pub fn replace_links(&mut self, links: Vec<Link>) {
        self.links = links;
    }

    /// Replaces the tag collection with authoritative data from the store.
    pub fn replace_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use chrono::{TimeZone, Utc};

    use crate::db::models::{Link, LinkTagRef, Tag};

    pub fn link(id: i32, order_index: i32, tags: Vec<LinkTagRef>) -> Link {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Link {
            id,
            user_id: 1,
            title: format!("link {id}"),
            url: format!("https://example.com/{id}"),
            icon_url: None,
            order_index,
            tags,
            created_at: t,
            updated_at: t,
        }
    }

    pub fn tag_ref(tag_id: i32, order_index: i32) -> LinkTagRef {
        LinkTagRef {
            id: tag_id,
            name: format!("tag {tag_id}"),
            color: "#3b82f6".to_owned(),
            order_index,
        }
    }

    pub fn tag(id: i32, order_index: i32) -> Tag {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Tag {
            id,
            user_id: 1,
            name: format!("tag {id}"),
            color: "#3b82f6".to_owned(),
            order_index,
            tab_id: None,
            created_at: t,
            updated_at: t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn move_item_shifts_the_range_between_source_and_destination() {
        let items = vec!['a', 'b', 'c', 'd'];
        assert_eq!(move_item(&items, 1, 3), Some(vec!['a', 'c', 'd', 'b']));
        assert_eq!(move_item(&items, 3, 0), Some(vec!['d', 'a', 'b', 'c']));
    }

    #[test]
    fn move_item_preserves_relative_order_of_everything_else() {
        let items: Vec<i32> = (0..10).collect();
        let moved = move_item(&items, 2, 7).unwrap();
        let mut without: Vec<i32> = moved.clone();
        without.retain(|&x| x != 2);
        let mut expected: Vec<i32> = items.clone();
        expected.retain(|&x| x != 2);
        assert_eq!(without, expected);
        assert_eq!(moved[7], 2);
    }

    #[test]
    fn move_item_rejects_noop_and_out_of_bounds() {
        let items = vec![1, 2, 3];
        assert_eq!(move_item(&items, 1, 1), None);
        assert_eq!(move_item(&items, 3, 0), None);
        assert_eq!(move_item(&items, 0, 3), None);
        assert_eq!(move_item::<i32>(&[], 0, 0), None);
    }

    #[test]
    fn contiguous_ranks_form_a_permutation_of_positions() {
        let ranks = contiguous_ranks(&[42, 7, 13]);
        assert_eq!(ranks, vec![(42, 0), (7, 1), (13, 2)]);
    }

    #[test]
    fn scoped_orders_sort_by_scope_rank_and_tie_break_stably() {
        // Links 2 and 3 tie on global rank; fetch order wins.
        let snapshot = Snapshot::new(
            vec![link(1, 5, vec![]), link(2, 1, vec![]), link(3, 1, vec![])],
            vec![],
        );
        assert_eq!(snapshot.global_order(), vec![2, 3, 1]);
    }

    #[test]
    fn tag_sublist_uses_the_per_tag_rank_not_the_global_one() {
        let snapshot = Snapshot::new(
            vec![
                link(1, 0, vec![tag_ref(10, 1)]),
                link(2, 1, vec![tag_ref(10, 0), tag_ref(20, 3)]),
                link(3, 2, vec![]),
            ],
            vec![tag(10, 0), tag(20, 1)],
        );
        assert_eq!(snapshot.tag_sublist_order(10), vec![2, 1]);
        assert_eq!(snapshot.tag_sublist_order(20), vec![2]);
        assert_eq!(snapshot.uncategorized_order(), vec![3]);
    }

    #[test]
    fn apply_tag_ranks_leaves_other_scopes_alone() {
        // Link 2 is in tags 10 and 20; reordering tag 10 must not move its
        // rank in tag 20 or its global rank.
        let mut snapshot = Snapshot::new(
            vec![
                link(1, 0, vec![tag_ref(10, 0)]),
                link(2, 1, vec![tag_ref(10, 1), tag_ref(20, 3)]),
            ],
            vec![tag(10, 0), tag(20, 1)],
        );
        snapshot.apply_tag_ranks(10, &[2, 1]);

        assert_eq!(snapshot.tag_sublist_order(10), vec![2, 1]);
        let moved = snapshot.link(2).unwrap();
        assert_eq!(moved.order_index, 1);
        assert_eq!(moved.tag_rank(20), Some(3));
    }

    #[test]
    fn apply_global_ranks_only_touches_listed_links() {
        let mut snapshot = Snapshot::new(
            vec![
                link(1, 0, vec![]),
                link(2, 1, vec![tag_ref(10, 0)]),
                link(3, 2, vec![]),
            ],
            vec![tag(10, 0)],
        );
        // Uncategorized-scope reorder: only untagged links get new ranks.
        snapshot.apply_global_ranks(&[3, 1]);
        assert_eq!(snapshot.link(3).unwrap().order_index, 0);
        assert_eq!(snapshot.link(1).unwrap().order_index, 1);
        assert_eq!(snapshot.link(2).unwrap().order_index, 1);
    }
}
