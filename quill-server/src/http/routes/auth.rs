//! Account endpoints: register, login, me

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::db::repos::{User, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::server::AppState;
use crate::models::{DisplayName, Email, Password};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account plus a fresh token
#[derive(Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for AccountResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

fn session(state: &AppState, user: User) -> Result<SessionResponse, ApiError> {
    Ok(SessionResponse {
        token: state.tokens.issue(user.id)?,
        id: user.id,
        name: user.name,
        email: user.email,
    })
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("password task failed: {e}"),
        })?
}

/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let name = DisplayName::new(&req.name)?;
    let email = Email::new(&req.email)?;
    let password = Password::new(&req.password)?;

    let hash = blocking(move || Ok(hash_password(password.expose())?)).await?;
    let user = UserRepo::new(&state.pool).create(&name, &email, &hash).await?;
    tracing::info!(user_id = user.id, "account registered");

    Ok((StatusCode::CREATED, Json(session(&state, user)?)))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password get the same answer.
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = Email::new(&req.email).map_err(|_| ApiError::INVALID_CREDENTIALS)?;
    let password = Password::new(&req.password).map_err(|_| ApiError::INVALID_CREDENTIALS)?;

    let user = UserRepo::new(&state.pool)
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::INVALID_CREDENTIALS)?;

    let hash = user.password_hash.clone();
    let matches = blocking(move || Ok(verify_password(password.expose(), &hash)?)).await?;
    if !matches {
        return Err(ApiError::INVALID_CREDENTIALS);
    }

    Ok(Json(session(&state, user)?))
}

/// GET /api/auth/me
async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).find_by_id(auth.id).await?;
    Ok(Json(AccountResponse::from(user)))
}

/// Account routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}
