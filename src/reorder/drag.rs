//! Draggable-element identifiers and scope classification.
//!
//! A drag surface tags every draggable element with a composite string id
//! that encodes both the entity and the ordering scope it was rendered in.
//! Internally the protocol works on the `DragId` union and never re-parses
//! strings; `Display`/`FromStr` exist for the wire boundary, where the
//! format must stay exactly:
//!
//! - `category-{tag_id}` — a tag-section drag handle
//! - `tag-{tag_id}-{link_id}` — a link card inside that tag's sublist
//! - `uncat-{link_id}` — a link card in the uncategorized section
//! - `{link_id}` — a link card in the simple (non-categorized) view

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragId {
    /// Bare link id in the simple view; reorders the global list.
    Simple { link_id: i32 },
    /// Link card in the uncategorized section of the categorized view.
    Uncategorized { link_id: i32 },
    /// Link card inside one tag's sublist.
    Tagged { tag_id: i32, link_id: i32 },
    /// A whole tag section's drag handle.
    TagSection { tag_id: i32 },
}

/// The ordering scope a reorder operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderScope {
    Global,
    Uncategorized,
    Tag(i32),
    TagList,
}

impl DragId {
    /// The id of the link being dragged, if this identifies a link card.
    pub fn link_id(&self) -> Option<i32> {
        match *self {
            DragId::Simple { link_id }
            | DragId::Uncategorized { link_id }
            | DragId::Tagged { link_id, .. } => Some(link_id),
            DragId::TagSection { .. } => None,
        }
    }
}

/// Classifies a (source, target) pair into the scope the reorder runs in.
/// Returns `None` for any cross-scope pairing, including two link cards in
/// different tags' sublists; callers treat `None` as a silent no-op.
pub fn classify(active: &DragId, over: &DragId) -> Option<ReorderScope> {
    match (active, over) {
        (DragId::Simple { .. }, DragId::Simple { .. }) => Some(ReorderScope::Global),
        (DragId::Uncategorized { .. }, DragId::Uncategorized { .. }) => {
            Some(ReorderScope::Uncategorized)
        }
        (DragId::Tagged { tag_id: a, .. }, DragId::Tagged { tag_id: b, .. }) if a == b => {
            Some(ReorderScope::Tag(*a))
        }
        (DragId::TagSection { .. }, DragId::TagSection { .. }) => Some(ReorderScope::TagList),
        _ => None,
    }
}

impl fmt::Display for DragId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DragId::Simple { link_id } => write!(f, "{link_id}"),
            DragId::Uncategorized { link_id } => write!(f, "uncat-{link_id}"),
            DragId::Tagged { tag_id, link_id } => write!(f, "tag-{tag_id}-{link_id}"),
            DragId::TagSection { tag_id } => write!(f, "category-{tag_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a valid drag identifier: {0:?}")]
pub struct ParseDragIdError(pub String);

impl FromStr for DragId {
    type Err = ParseDragIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDragIdError(s.to_owned());

        if let Some(rest) = s.strip_prefix("category-") {
            let tag_id = rest.parse().map_err(|_| invalid())?;
            return Ok(DragId::TagSection { tag_id });
        }
        if let Some(rest) = s.strip_prefix("tag-") {
            let (tag_part, link_part) = rest.split_once('-').ok_or_else(invalid)?;
            let tag_id = tag_part.parse().map_err(|_| invalid())?;
            let link_id = link_part.parse().map_err(|_| invalid())?;
            return Ok(DragId::Tagged { tag_id, link_id });
        }
        if let Some(rest) = s.strip_prefix("uncat-") {
            let link_id = rest.parse().map_err(|_| invalid())?;
            return Ok(DragId::Uncategorized { link_id });
        }
        let link_id = s.parse().map_err(|_| invalid())?;
        Ok(DragId::Simple { link_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip_through_the_wire_format() {
        let cases = [
            (DragId::Simple { link_id: 7 }, "7"),
            (DragId::Uncategorized { link_id: 12 }, "uncat-12"),
            (DragId::Tagged { tag_id: 3, link_id: 45 }, "tag-3-45"),
            (DragId::TagSection { tag_id: 9 }, "category-9"),
        ];
        for (id, encoded) in cases {
            assert_eq!(id.to_string(), encoded);
            assert_eq!(encoded.parse::<DragId>().unwrap(), id);
        }
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        for s in ["", "tag-3", "tag--5", "uncat-", "category-x", "link-4", "3.5"] {
            assert!(s.parse::<DragId>().is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn classification_requires_matching_scopes() {
        let simple = DragId::Simple { link_id: 1 };
        let uncat = DragId::Uncategorized { link_id: 1 };
        let tagged_a = DragId::Tagged { tag_id: 1, link_id: 2 };
        let tagged_b = DragId::Tagged { tag_id: 2, link_id: 3 };
        let section = DragId::TagSection { tag_id: 1 };

        assert_eq!(classify(&simple, &simple), Some(ReorderScope::Global));
        assert_eq!(classify(&uncat, &uncat), Some(ReorderScope::Uncategorized));
        assert_eq!(classify(&tagged_a, &tagged_a), Some(ReorderScope::Tag(1)));
        assert_eq!(classify(&section, &section), Some(ReorderScope::TagList));

        // Link cards in two different tags never reorder across tags.
        assert_eq!(classify(&tagged_a, &tagged_b), None);
        // A tag-section handle dropped on a link card is a cross-scope drop.
        assert_eq!(classify(&section, &tagged_a), None);
        assert_eq!(classify(&simple, &uncat), None);
        assert_eq!(classify(&uncat, &tagged_a), None);
    }
}
