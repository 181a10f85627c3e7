use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use sea_orm::DbErr;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    models::Tag as DtoTag,
    services::{self, TagChanges},
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct CreateTagRequest {
    name: String,
    color: Option<String>,
    tab_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateTagRequest {
    name: Option<String>,
    color: Option<String>,
    order_index: Option<i32>,
    /// Present-and-null detaches the tag from its tab.
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    tab_id: Option<Option<i32>>,
}

#[derive(Deserialize)]
pub struct ReorderTagLinksRequest {
    #[serde(rename = "linkIds")]
    link_ids: Vec<i32>,
}

fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::<i32>::deserialize(deserializer)?))
}

fn map_tag_db_err(db_err: DbErr) -> AppError {
    match &db_err {
        DbErr::Query(sea_orm::RuntimeErr::SqlxError(sqlx_error_value)) => {
            if let sqlx::Error::Database(database_error) = sqlx_error_value {
                if database_error.is_unique_violation() {
                    return AppError::Conflict("A tag with this name already exists.".to_string());
                }
            }
            AppError::DatabaseError(sqlx_error_value.to_string())
        }
        _ => AppError::DatabaseError(db_err.to_string()),
    }
}

// --- Route Handlers ---

async fn get_user_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<DtoTag>>, AppError> {
    let tags = services::get_tags(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(tags.into_iter().map(DtoTag::from).collect()))
}

async fn create_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<DtoTag>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Tag name must not be empty.".to_string(),
        ));
    }

    let created = services::create_tag(
        &app_state.db_pool,
        authenticated_user.id,
        &payload.name,
        payload.color.as_deref(),
        payload.tab_id,
    )
    .await
    .map_err(map_tag_db_err)?;

    match created {
        Some(tag_model) => Ok((StatusCode::CREATED, Json(DtoTag::from(tag_model)))),
        None => Err(AppError::NotFound(
            "Tab not found or permission denied".to_string(),
        )),
    }
}

async fn update_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<DtoTag>, AppError> {
    let updated = services::update_tag(
        &app_state.db_pool,
        authenticated_user.id,
        tag_id,
        TagChanges {
            name: payload.name,
            color: payload.color,
            order_index: payload.order_index,
            tab_id: payload.tab_id,
        },
    )
    .await
    .map_err(map_tag_db_err)?;

    match updated {
        Some(tag_model) => Ok(Json(DtoTag::from(tag_model))),
        None => Err(AppError::NotFound(
            "Tag or tab not found or permission denied".to_string(),
        )),
    }
}

async fn delete_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        services::delete_tag(&app_state.db_pool, authenticated_user.id, tag_id).await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "Tag not found or permission denied".to_string(),
        ))
    }
}

/// Rewrites the per-tag ranks of the tag's member links in one statement
/// batch. The body carries the full sublist in its new order.
async fn reorder_tag_links_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    Json(payload): Json<ReorderTagLinksRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = services::reorder_tag_links(
        &app_state.db_pool,
        authenticated_user.id,
        tag_id,
        &payload.link_ids,
    )
    .await?;

    if found {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(AppError::NotFound(
            "Tag not found or permission denied".to_string(),
        ))
    }
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_user_tags_handler).post(create_tag_handler))
        .route("/{tag_id}", put(update_tag_handler).delete(delete_tag_handler))
        .route("/{tag_id}/reorder", put(reorder_tag_links_handler))
}
