use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    models::Tab as DtoTab,
    services::{self, TabChanges},
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct CreateTabRequest {
    name: String,
}

#[derive(Deserialize)]
pub struct UpdateTabRequest {
    name: Option<String>,
    order_index: Option<i32>,
}

async fn get_tabs_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<DtoTab>>, AppError> {
    let tabs = services::get_tabs(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(tabs.into_iter().map(DtoTab::from).collect()))
}

async fn create_tab_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateTabRequest>,
) -> Result<(StatusCode, Json<DtoTab>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Tab name must not be empty.".to_string(),
        ));
    }

    let tab_model =
        services::create_tab(&app_state.db_pool, authenticated_user.id, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(DtoTab::from(tab_model))))
}

async fn update_tab_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tab_id): Path<i32>,
    Json(payload): Json<UpdateTabRequest>,
) -> Result<Json<DtoTab>, AppError> {
    let updated = services::update_tab(
        &app_state.db_pool,
        authenticated_user.id,
        tab_id,
        TabChanges {
            name: payload.name,
            order_index: payload.order_index,
        },
    )
    .await?;

    match updated {
        Some(tab_model) => Ok(Json(DtoTab::from(tab_model))),
        None => Err(AppError::NotFound(
            "Tab not found or permission denied".to_string(),
        )),
    }
}

async fn delete_tab_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tab_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        services::delete_tab(&app_state.db_pool, authenticated_user.id, tab_id).await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "Tab not found or permission denied".to_string(),
        ))
    }
}

pub fn create_tabs_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_tabs_handler).post(create_tab_handler))
        .route("/{tab_id}", put(update_tab_handler).delete(delete_tab_handler))
}
