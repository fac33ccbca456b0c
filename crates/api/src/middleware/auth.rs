//! Bearer-token authentication extractors.
//!
//! The token only identifies the caller. The role used for every guard is
//! the one stored on the user row, re-read on each request, so a role
//! change takes effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use freshmart_core::UserRole;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

const NO_TOKEN: &str = "Not authorized, no token";
const TOKEN_FAILED: &str = "Not authorized, token failed";
const NOT_ADMIN: &str = "Not authorized as an admin";
const NOT_COURIER: &str = "Not authorized as delivery user";

/// The token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor that requires a valid bearer token for an existing user.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_owned()))?;

        let claims = state.tokens().verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            AppError::Unauthorized(TOKEN_FAILED.to_owned())
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| AppError::Unauthorized(TOKEN_FAILED.to_owned()))?;

        let user = UserRepository::new(state.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(TOKEN_FAILED.to_owned()))?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden(NOT_ADMIN.to_owned()));
        }
        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated courier.
pub struct RequireCourier(pub User);

impl FromRequestParts<AppState> for RequireCourier {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.role != UserRole::Courier {
            return Err(AppError::Forbidden(NOT_COURIER.to_owned()));
        }
        Ok(Self(user))
    }
}
