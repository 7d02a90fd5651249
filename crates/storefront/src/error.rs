//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<Envelope, AppError>`. [`AppError::into_envelope`]
//! captures server errors to Sentry before turning them into an error
//! envelope; the dispatcher renders that envelope for the caller's audience.

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::{Envelope, FieldError};
use crate::services::ServiceError;

/// Message shown to clients for any 5xx.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the store API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule or persistence failure from the service layer.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Missing, unparseable or invalid request field.
    #[error("{0}")]
    Field(#[from] FieldError),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Response payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => err.status(),
            Self::Field(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to an error envelope (`data: []`).
    ///
    /// Server errors are logged and captured to Sentry; clients only see a
    /// generic message for them.
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        let status = self.status();

        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        Envelope::error(status, message)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Checkout started", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
