//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the API as JSON with a `message` field. Validation
//! failures add `errors`; server errors add `error` with the detail and are
//! captured to Sentry before responding.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use freshmart_core::order::{CheckoutError, OrderError};

use crate::db::RepositoryError;
use crate::services::{AuthError, CatalogError, OrderServiceError, TokenError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token signing failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Order lifecycle rule refused the change.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Checkout body rejected.
    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failures.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// Rate limited.
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OrderServiceError> for AppError {
    fn from(e: OrderServiceError) -> Self {
        match e {
            OrderServiceError::Order(e) => Self::Order(e),
            OrderServiceError::Checkout(e) => Self::Checkout(e),
            OrderServiceError::CourierNotFound => Self::NotFound(e.to_string()),
            OrderServiceError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound => Self::NotFound(e.to_string()),
            CatalogError::Validation(errors) => Self::Validation(errors),
            CatalogError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Token(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::NotAssigned => StatusCode::FORBIDDEN,
                OrderError::DeliveredRequiresOtp
                | OrderError::AlreadyFinal(_)
                | OrderError::OtpRequired
                | OrderError::NoOtp
                | OrderError::OtpExpired
                | OrderError::OtpMismatch
                | OrderError::NotACourier => StatusCode::BAD_REQUEST,
            },
            Self::Checkout(_) | Self::BadRequest(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, errors, error) = match self {
            Self::Database(_) | Self::Token(_) | Self::Internal(_) => {
                ("Server error".to_owned(), None, Some(self.to_string()))
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    ("Invalid email or password".to_owned(), None, None)
                }
                AuthError::UserAlreadyExists => ("User already exists".to_owned(), None, None),
                AuthError::WeakPassword(msg) => (msg.clone(), None, None),
                AuthError::InvalidEmail(_) => ("Invalid email address".to_owned(), None, None),
                AuthError::MissingField(_) => (
                    "Please provide name, email and password".to_owned(),
                    None,
                    None,
                ),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    ("Server error".to_owned(), None, Some(err.to_string()))
                }
            },
            Self::Checkout(CheckoutError::Validation(errors)) | Self::Validation(errors) => (
                "Validation failed".to_owned(),
                Some(errors.clone()),
                None,
            ),
            _ => (self.to_string(), None, None),
        };
        ErrorBody {
            message,
            errors,
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
