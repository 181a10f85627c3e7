use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db::entities::{link, link_tag, tag};
use crate::db::models::{Link, LinkTagRef};

pub struct NewLink<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub icon_url: Option<&'a str>,
    /// Defaults to the end of the user's list when absent.
    pub order_index: Option<i32>,
    pub tag_ids: Vec<i32>,
}

pub struct LinkChanges<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub icon_url: Option<&'a str>,
    pub order_index: i32,
    /// When present, the link's tag set is synced to exactly these ids.
    pub tag_ids: Option<Vec<i32>>,
}

/// Retrieves all links for a user, each with its nested tag associations
/// (carrying the per-tag rank), ordered by global rank.
pub async fn get_links_with_tags(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<Link>, DbErr> {
    let links = link::Entity::find()
        .filter(link::Column::UserId.eq(user_id))
        .order_by_asc(link::Column::OrderIndex)
        .all(db)
        .await?;

    if links.is_empty() {
        return Ok(Vec::new());
    }

    let link_ids: Vec<i32> = links.iter().map(|l| l.id).collect();
    let associations = link_tag::Entity::find()
        .filter(link_tag::Column::LinkId.is_in(link_ids))
        .find_also_related(tag::Entity)
        .all(db)
        .await?;

    let mut tags_by_link: HashMap<i32, Vec<LinkTagRef>> = HashMap::new();
    for (assoc, tag_model) in associations {
        if let Some(tag_model) = tag_model {
            tags_by_link.entry(assoc.link_id).or_default().push(LinkTagRef {
                id: tag_model.id,
                name: tag_model.name,
                color: tag_model.color,
                order_index: assoc.order_index,
            });
        }
    }

    Ok(links
        .into_iter()
        .map(|l| {
            let mut tags = tags_by_link.remove(&l.id).unwrap_or_default();
            tags.sort_by_key(|t| t.order_index);
            Link {
                id: l.id,
                user_id: l.user_id,
                title: l.title,
                url: l.url,
                icon_url: l.icon_url,
                order_index: l.order_index,
                tags,
                created_at: l.created_at,
                updated_at: l.updated_at,
            }
        })
        .collect())
}

/// Retrieves one link with its tag associations, scoped to the owner.
pub async fn get_link_with_tags(
    db: &DatabaseConnection,
    user_id: i32,
    link_id: i32,
) -> Result<Option<Link>, DbErr> {
    let Some(l) = link::Entity::find_by_id(link_id)
        .filter(link::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let mut tags: Vec<LinkTagRef> = link_tag::Entity::find()
        .filter(link_tag::Column::LinkId.eq(link_id))
        .find_also_related(tag::Entity)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(assoc, tag_model)| {
            tag_model.map(|t| LinkTagRef {
                id: t.id,
                name: t.name,
                color: t.color,
                order_index: assoc.order_index,
            })
        })
        .collect();
    tags.sort_by_key(|t| t.order_index);

    Ok(Some(Link {
        id: l.id,
        user_id: l.user_id,
        title: l.title,
        url: l.url,
        icon_url: l.icon_url,
        order_index: l.order_index,
        tags,
        created_at: l.created_at,
        updated_at: l.updated_at,
    }))
}

/// Creates a link and its tag associations. Returns `None` when a supplied
/// tag id does not name a tag owned by `user_id`.
pub async fn create_link(
    db: &DatabaseConnection,
    user_id: i32,
    new_link: NewLink<'_>,
) -> Result<Option<Link>, DbErr> {
    let txn = db.begin().await?;
    if tags_not_owned(&txn, user_id, &new_link.tag_ids).await? {
        return Ok(None);
    }
    let now = Utc::now();

    let order_index = match new_link.order_index {
        Some(i) => i,
        None => {
            link::Entity::find()
                .filter(link::Column::UserId.eq(user_id))
                .count(&txn)
                .await? as i32
        }
    };

    let inserted = link::ActiveModel {
        user_id: Set(user_id),
        title: Set(new_link.title.to_owned()),
        url: Set(new_link.url.to_owned()),
        icon_url: Set(new_link.icon_url.map(|s| s.to_owned())),
        order_index: Set(order_index),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    sync_link_tags(&txn, inserted.id, &new_link.tag_ids).await?;
    txn.commit().await?;

    get_link_with_tags(db, user_id, inserted.id).await
}

/// Updates a link's mutable fields and, when a tag set is given, syncs its
/// associations. Returns `None` when the link does not exist, belongs to
/// another user, or a supplied tag id is not owned by the user.
pub async fn update_link(
    db: &DatabaseConnection,
    user_id: i32,
    link_id: i32,
    changes: LinkChanges<'_>,
) -> Result<Option<Link>, DbErr> {
    let txn = db.begin().await?;

    let Some(existing) = link::Entity::find_by_id(link_id)
        .filter(link::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
    else {
        return Ok(None);
    };

    if let Some(tag_ids) = &changes.tag_ids {
        if tags_not_owned(&txn, user_id, tag_ids).await? {
            return Ok(None);
        }
    }

    let mut active: link::ActiveModel = existing.into();
    active.title = Set(changes.title.to_owned());
    active.url = Set(changes.url.to_owned());
    active.icon_url = Set(changes.icon_url.map(|s| s.to_owned()));
    active.order_index = Set(changes.order_index);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    if let Some(tag_ids) = &changes.tag_ids {
        sync_link_tags(&txn, link_id, tag_ids).await?;
    }
    txn.commit().await?;

    get_link_with_tags(db, user_id, link_id).await
}

/// Deletes a link. The ON DELETE CASCADE on link_tags removes its
/// associations.
pub async fn delete_link(
    db: &DatabaseConnection,
    user_id: i32,
    link_id: i32,
) -> Result<u64, DbErr> {
    let result = link::Entity::delete_many()
        .filter(link::Column::Id.eq(link_id))
        .filter(link::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// True when any id in `tag_ids` is not a tag owned by `user_id`. A link
/// may only ever be associated with its owner's tags.
async fn tags_not_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    tag_ids: &[i32],
) -> Result<bool, DbErr> {
    if tag_ids.is_empty() {
        return Ok(false);
    }
    let owned: HashSet<i32> = tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Id.is_in(tag_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    Ok(tag_ids.iter().any(|id| !owned.contains(id)))
}

/// Makes the link's associations exactly `tag_ids`: removed tags lose the
/// row, newly added tags place the link at the end of their sublist. Ranks
/// inside tags the link stays in are untouched.
async fn sync_link_tags<C: ConnectionTrait>(
    conn: &C,
    link_id: i32,
    tag_ids: &[i32],
) -> Result<(), DbErr> {
    let existing = link_tag::Entity::find()
        .filter(link_tag::Column::LinkId.eq(link_id))
        .all(conn)
        .await?;

    for assoc in &existing {
        if !tag_ids.contains(&assoc.tag_id) {
            link_tag::Entity::delete_many()
                .filter(link_tag::Column::LinkId.eq(link_id))
                .filter(link_tag::Column::TagId.eq(assoc.tag_id))
                .exec(conn)
                .await?;
        }
    }

    for &tag_id in tag_ids {
        if existing.iter().any(|a| a.tag_id == tag_id) {
            continue;
        }
        let next_rank = link_tag::Entity::find()
            .filter(link_tag::Column::TagId.eq(tag_id))
            .count(conn)
            .await? as i32;
        link_tag::ActiveModel {
            link_id: Set(link_id),
            tag_id: Set(tag_id),
            order_index: Set(next_rank),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn link_row(id: i32, user_id: i32) -> link::Model {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        link::Model {
            id,
            user_id,
            title: "docs".to_owned(),
            url: "https://example.com".to_owned(),
            icon_url: None,
            order_index: 0,
            created_at: t,
            updated_at: t,
        }
    }

    #[tokio::test]
    async fn create_link_rejects_a_tag_owned_by_another_user() {
        // The ownership lookup finds none of the requested tag ids.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<tag::Model>::new()])
            .into_connection();

        let created = create_link(
            &db,
            1,
            NewLink {
                title: "docs",
                url: "https://example.com",
                icon_url: None,
                order_index: Some(0),
                tag_ids: vec![99],
            },
        )
        .await
        .unwrap();

        assert!(created.is_none());
    }

    #[tokio::test]
    async fn update_link_rejects_a_tag_owned_by_another_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![link_row(5, 1)]])
            .append_query_results([Vec::<tag::Model>::new()])
            .into_connection();

        let updated = update_link(
            &db,
            1,
            5,
            LinkChanges {
                title: "docs",
                url: "https://example.com",
                icon_url: None,
                order_index: 0,
                tag_ids: Some(vec![99]),
            },
        )
        .await
        .unwrap();

        assert!(updated.is_none());
    }
}
