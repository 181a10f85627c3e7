use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::db::entities::user;

pub struct ProfileChanges {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub view_mode: Option<String>,
}

pub async fn get_user_by_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i32,
    changes: ProfileChanges,
) -> Result<Option<user::Model>, DbErr> {
    let Some(existing) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(Some(name));
    }
    if let Some(avatar_url) = changes.avatar_url {
        active.avatar_url = Set(Some(avatar_url));
    }
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    if let Some(password_hash) = changes.password_hash {
        active.password_hash = Set(Some(password_hash));
    }
    if let Some(view_mode) = changes.view_mode {
        active.view_mode = Set(view_mode);
    }
    active.updated_at = Set(Utc::now());

    Ok(Some(active.update(db).await?))
}

pub async fn update_theme(
    db: &DatabaseConnection,
    user_id: i32,
    theme: &str,
) -> Result<Option<user::Model>, DbErr> {
    let Some(existing) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let mut active: user::ActiveModel = existing.into();
    active.theme = Set(theme.to_owned());
    active.updated_at = Set(Utc::now());

    Ok(Some(active.update(db).await?))
}
