use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::{get, put},
};
use bcrypt::{DEFAULT_COST, hash};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::{self, ProfileChanges};
use crate::web::models::{AuthenticatedUser, UserResponse};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    name: Option<String>,
    avatar_url: Option<String>,
    email: Option<String>,
    password: Option<String>,
    view_mode: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateThemeRequest {
    theme: String,
}

async fn get_profile_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::get_user_by_id(&app_state.db_pool, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse::from(user)))
}

async fn update_profile_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if let Some(email) = &payload.email {
        if !email.contains('@') {
            return Err(AppError::InvalidInput(
                "A valid email address is required.".to_string(),
            ));
        }
    }
    if let Some(view_mode) = &payload.view_mode {
        if view_mode != "categorized" && view_mode != "simple" {
            return Err(AppError::InvalidInput(
                "View mode must be \"categorized\" or \"simple\".".to_string(),
            ));
        }
    }
    let password_hash = match &payload.password {
        Some(password) => {
            if password.len() < 8 {
                return Err(AppError::InvalidInput(
                    "Password must be at least 8 characters.".to_string(),
                ));
            }
            Some(hash(password, DEFAULT_COST).map_err(|e| {
                AppError::PasswordHashingError(format!("Failed to hash password: {e}"))
            })?)
        }
        None => None,
    };

    let updated = services::update_profile(
        &app_state.db_pool,
        authenticated_user.id,
        ProfileChanges {
            name: payload.name,
            avatar_url: payload.avatar_url,
            email: payload.email,
            password_hash,
            view_mode: payload.view_mode,
        },
    )
    .await?;

    match updated {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => Err(AppError::NotFound("User not found".to_string())),
    }
}

async fn update_theme_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateThemeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if payload.theme.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Theme must not be empty.".to_string(),
        ));
    }

    let updated =
        services::update_theme(&app_state.db_pool, authenticated_user.id, &payload.theme).await?;

    match updated {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => Err(AppError::NotFound("User not found".to_string())),
    }
}

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_profile_handler).put(update_profile_handler))
        .route("/theme", put(update_theme_handler))
}
