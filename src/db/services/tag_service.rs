use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db::entities::{link_tag, tab, tag};

const DEFAULT_TAG_COLOR: &str = "#3b82f6";

pub struct TagChanges {
    pub name: Option<String>,
    pub color: Option<String>,
    pub order_index: Option<i32>,
    /// `Some(None)` detaches the tag from its tab.
    pub tab_id: Option<Option<i32>>,
}

/// Retrieves all tags for a user ordered by their section rank.
pub async fn get_tags(db: &DatabaseConnection, user_id: i32) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .order_by_asc(tag::Column::OrderIndex)
        .all(db)
        .await
}

/// Creates a tag at the end of the user's tag list. Returns `None` when the
/// supplied tab id is not a tab owned by `user_id`.
pub async fn create_tag(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    color: Option<&str>,
    tab_id: Option<i32>,
) -> Result<Option<tag::Model>, DbErr> {
    if let Some(tab_id) = tab_id {
        if tab_not_owned(db, user_id, tab_id).await? {
            return Ok(None);
        }
    }

    let now = Utc::now();
    let next_rank = tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .count(db)
        .await? as i32;

    tag::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        color: Set(color.unwrap_or(DEFAULT_TAG_COLOR).to_owned()),
        order_index: Set(next_rank),
        tab_id: Set(tab_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map(Some)
}

/// Applies partial changes to a tag. Returns `None` when the tag does not
/// exist, belongs to another user, or the supplied tab id is not owned by
/// the user.
pub async fn update_tag(
    db: &DatabaseConnection,
    user_id: i32,
    tag_id: i32,
    changes: TagChanges,
) -> Result<Option<tag::Model>, DbErr> {
    let Some(existing) = tag::Entity::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if let Some(Some(tab_id)) = changes.tab_id {
        if tab_not_owned(db, user_id, tab_id).await? {
            return Ok(None);
        }
    }

    let mut active: tag::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(color) = changes.color {
        active.color = Set(color);
    }
    if let Some(order_index) = changes.order_index {
        active.order_index = Set(order_index);
    }
    if let Some(tab_id) = changes.tab_id {
        active.tab_id = Set(tab_id);
    }
    active.updated_at = Set(Utc::now());

    Ok(Some(active.update(db).await?))
}

/// True when `tab_id` does not name a tab owned by `user_id`. Tags may only
/// ever be grouped under their owner's tabs.
async fn tab_not_owned(
    db: &DatabaseConnection,
    user_id: i32,
    tab_id: i32,
) -> Result<bool, DbErr> {
    Ok(tab::Entity::find_by_id(tab_id)
        .filter(tab::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_none())
}

/// Deletes a tag. The ON DELETE CASCADE on link_tags removes its member
/// associations; links themselves are untouched.
pub async fn delete_tag(db: &DatabaseConnection, user_id: i32, tag_id: i32) -> Result<u64, DbErr> {
    let result = tag::Entity::delete_many()
        .filter(tag::Column::Id.eq(tag_id))
        .filter(tag::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Rewrites the per-tag ranks of a tag's member links to the positions in
/// `link_ids`, inside one transaction. Ids not associated with the tag are
/// ignored. Returns `false` when the tag is not owned by the user.
pub async fn reorder_tag_links(
    db: &DatabaseConnection,
    user_id: i32,
    tag_id: i32,
    link_ids: &[i32],
) -> Result<bool, DbErr> {
    let owned = tag::Entity::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some();
    if !owned {
        return Ok(false);
    }

    let txn = db.begin().await?;
    for (position, &link_id) in link_ids.iter().enumerate() {
        link_tag::Entity::update_many()
            .col_expr(
                link_tag::Column::OrderIndex,
                sea_orm::prelude::Expr::value(position as i32),
            )
            .filter(link_tag::Column::TagId.eq(tag_id))
            .filter(link_tag::Column::LinkId.eq(link_id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn tag_row(id: i32, user_id: i32) -> tag::Model {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        tag::Model {
            id,
            user_id,
            name: "work".to_owned(),
            color: DEFAULT_TAG_COLOR.to_owned(),
            order_index: 0,
            tab_id: None,
            created_at: t,
            updated_at: t,
        }
    }

    #[tokio::test]
    async fn create_tag_rejects_a_tab_owned_by_another_user() {
        // The ownership lookup finds no tab with the requested id.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<tab::Model>::new()])
            .into_connection();

        let created = create_tag(&db, 1, "work", None, Some(99)).await.unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn update_tag_rejects_a_tab_owned_by_another_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tag_row(7, 1)]])
            .append_query_results([Vec::<tab::Model>::new()])
            .into_connection();

        let updated = update_tag(
            &db,
            1,
            7,
            TagChanges {
                name: None,
                color: None,
                order_index: None,
                tab_id: Some(Some(99)),
            },
        )
        .await
        .unwrap();

        assert!(updated.is_none());
    }
}
