use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    models::Link,
    services::{self, LinkChanges, NewLink},
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct CreateLinkRequest {
    title: String,
    url: String,
    icon_url: Option<String>,
    order_index: Option<i32>,
    tags: Option<Vec<i32>>,
}

#[derive(Deserialize)]
pub struct UpdateLinkRequest {
    title: String,
    url: String,
    icon_url: Option<String>,
    order_index: i32,
    /// When present, the link's tag set is replaced with exactly these ids.
    tags: Option<Vec<i32>>,
}

// --- Route Handlers ---

async fn get_links_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Link>>, AppError> {
    let links = services::get_links_with_tags(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(links))
}

async fn create_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>), AppError> {
    if payload.title.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Title and URL must not be empty.".to_string(),
        ));
    }

    let created = services::create_link(
        &app_state.db_pool,
        authenticated_user.id,
        NewLink {
            title: &payload.title,
            url: &payload.url,
            icon_url: payload.icon_url.as_deref(),
            order_index: payload.order_index,
            tag_ids: payload.tags.unwrap_or_default(),
        },
    )
    .await?;

    match created {
        Some(link) => Ok((StatusCode::CREATED, Json(link))),
        None => Err(AppError::NotFound(
            "Tag not found or permission denied".to_string(),
        )),
    }
}

async fn update_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(link_id): Path<i32>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<Link>, AppError> {
    if payload.title.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Title and URL must not be empty.".to_string(),
        ));
    }

    let updated = services::update_link(
        &app_state.db_pool,
        authenticated_user.id,
        link_id,
        LinkChanges {
            title: &payload.title,
            url: &payload.url,
            icon_url: payload.icon_url.as_deref(),
            order_index: payload.order_index,
            tag_ids: payload.tags,
        },
    )
    .await?;

    match updated {
        Some(link) => Ok(Json(link)),
        None => Err(AppError::NotFound(
            "Link or tag not found or permission denied".to_string(),
        )),
    }
}

async fn delete_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(link_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        services::delete_link(&app_state.db_pool, authenticated_user.id, link_id).await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "Link not found or permission denied".to_string(),
        ))
    }
}

// --- Router ---

pub fn create_links_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_links_handler).post(create_link_handler))
        .route(
            "/{link_id}",
            put(update_link_handler).delete(delete_link_handler),
        )
}
