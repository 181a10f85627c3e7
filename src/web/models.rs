use serde::{Deserialize, Serialize};

use crate::db::entities::user;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: String,
    pub view_mode: String,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        UserResponse {
            id: m.id,
            email: m.email,
            name: m.name,
            avatar_url: m.avatar_url,
            theme: m.theme,
            view_mode: m.view_mode,
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    /// The user's email.
    pub sub: String,
    pub user_id: i32,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
}
