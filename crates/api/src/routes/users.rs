//! Admin user listing.

use axum::{Json, extract::State};

use crate::db::UserRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::UserResponse;
use crate::state::AppState;

/// `GET /api/users`: every user, newest first, without password hashes.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserResponse>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
