//! Registration and login.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use freshmart_core::{Email, UserId, UserRole};

use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Identity fields repeated at the top level and under `user`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub identity: AuthUser,
    pub token: String,
    pub user: AuthUser,
}

fn respond(state: &AppState, user: User) -> Result<AuthResponse> {
    let token = state.tokens().issue(user.id, user.role, Utc::now())?;
    let identity = AuthUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    };
    Ok(AuthResponse {
        user: identity.clone(),
        identity,
        token,
    })
}

/// `POST /api/auth/register`
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(body) = body?;
    let (Some(name), Some(email), Some(password)) = (body.name, body.email, body.password) else {
        return Err(AuthError::MissingField("Name, email and password").into());
    };

    let user = AuthService::new(state.pool())
        .register(&name, &email, &password)
        .await?;
    Ok((StatusCode::CREATED, Json(respond(&state, user)?)))
}

/// `POST /api/auth/login`
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(body) = body?;
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    };

    let user = AuthService::new(state.pool())
        .login(&email, &password)
        .await?;
    Ok(Json(respond(&state, user)?))
}
