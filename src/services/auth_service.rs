use axum::{Extension, Json, extract::State};
use bcrypt::{DEFAULT_COST, hash, verify};
use std::sync::Arc;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::db::entities::user;
use crate::db::services as db_services;
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedUser, Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};

pub async fn register_user(
    pool: &DatabaseConnection,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    if !req.email.contains('@') || req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "A valid email and a password of at least 8 characters are required.".to_string(),
        ));
    }

    let existing = db_services::get_user_by_email(pool, &req.email)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check for existing user: {e}")))?;
    if existing.is_some() {
        return Err(AppError::UserAlreadyExists(
            "An account with this email already exists.".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(format!("Failed to hash password: {e}")))?;

    let now = Utc::now();
    let new_user = user::ActiveModel {
        email: Set(req.email.clone()),
        name: Set(req.name.clone()),
        password_hash: Set(Some(password_hash)),
        theme: Set("light".to_string()),
        view_mode: Set("categorized".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user_model = new_user
        .insert(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {e}")))?;
    Ok(UserResponse::from(user_model))
}

pub async fn login_user(
    pool: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password must not be empty.".to_string(),
        ));
    }

    let user = db_services::get_user_by_email(pool, &req.email)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to look up user: {e}")))?
        .ok_or(AppError::InvalidCredentials)?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    // Token valid for 24 hours.
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(format!("Failed to sign token: {e}")))?;

    Ok(LoginResponse {
        token,
        user: UserResponse::from(user.clone()),
    })
}

pub async fn me(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_services::get_user_by_id(&app_state.db_pool, authenticated_user.id)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or(AppError::InvalidCredentials)?;
    Ok(Json(UserResponse::from(user)))
}
