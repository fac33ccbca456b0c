//! User management commands.
//!
//! Registration through the API only ever creates customers; couriers and
//! admins are minted here.
//!
//! # Usage
//!
//! ```bash
//! fm-cli user create -e rider@example.com -n "Rider One" -r courier -p s3cret-pass
//! fm-cli user show rider@example.com
//! ```

use freshmart_api::db::{RepositoryError, UserRepository};
use freshmart_api::services::{AuthError, AuthService};
use freshmart_core::{Email, UserId, UserRole};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: customer, courier, admin")]
    InvalidRole(String),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a user with an explicit role.
///
/// # Errors
///
/// Returns an error for an unknown role, invalid input, a taken email or a
/// database failure.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<UserId, UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(&pool)
        .create_user(name, email, password, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Print a user's id, email, role and creation time.
///
/// # Errors
///
/// Returns an error for a malformed email or a database failure. An unknown
/// email is reported and is not an error.
pub async fn show(email: &str) -> Result<(), UserError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let pool = connect().await?;

    match UserRepository::new(&pool).get_by_email(&email).await? {
        Some(user) => tracing::info!(
            "User: id={}, email={}, role={}, created_at={}",
            user.id,
            user.email,
            user.role,
            user.created_at.to_rfc3339()
        ),
        None => tracing::info!("User not found: {}", email),
    }
    Ok(())
}
