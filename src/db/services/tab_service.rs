use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::tab;

pub struct TabChanges {
    pub name: Option<String>,
    pub order_index: Option<i32>,
}

pub async fn get_tabs(db: &DatabaseConnection, user_id: i32) -> Result<Vec<tab::Model>, DbErr> {
    tab::Entity::find()
        .filter(tab::Column::UserId.eq(user_id))
        .order_by_asc(tab::Column::OrderIndex)
        .all(db)
        .await
}

pub async fn create_tab(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
) -> Result<tab::Model, DbErr> {
    let now = Utc::now();
    let next_rank = tab::Entity::find()
        .filter(tab::Column::UserId.eq(user_id))
        .count(db)
        .await? as i32;

    tab::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        order_index: Set(next_rank),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_tab(
    db: &DatabaseConnection,
    user_id: i32,
    tab_id: i32,
    changes: TabChanges,
) -> Result<Option<tab::Model>, DbErr> {
    let Some(existing) = tab::Entity::find_by_id(tab_id)
        .filter(tab::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let mut active: tab::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(order_index) = changes.order_index {
        active.order_index = Set(order_index);
    }
    active.updated_at = Set(Utc::now());

    Ok(Some(active.update(db).await?))
}

/// Deletes a tab. Its tags survive with tab_id nulled (ON DELETE SET NULL).
pub async fn delete_tab(db: &DatabaseConnection, user_id: i32, tab_id: i32) -> Result<u64, DbErr> {
    let result = tab::Entity::delete_many()
        .filter(tab::Column::Id.eq(tab_id))
        .filter(tab::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
