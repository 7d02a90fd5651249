//! Service-layer errors.

use axum::http::StatusCode;
use thiserror::Error;

use super::auth::{AuthError, TokenError};
use crate::db::RepositoryError;

/// Errors returned by [`super::StoreService`].
///
/// Each variant maps to the HTTP status the envelope layer reports; the
/// message is what clients see for 4xx errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entity lookup came back empty (`"Product"`, `"Member"`).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requested quantity exceeds stock.
    #[error("Quantity not enough")]
    InsufficientStock {
        /// Status configured for this condition (409, or 200 for legacy clients).
        status: StatusCode,
    },

    /// Quantity below one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Password did not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Stored credential could not be checked.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

impl ServiceError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientStock { status } => *status,
            Self::InvalidQuantity => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Repository(_) | Self::Auth(_) | Self::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_messages() {
        assert_eq!(
            ServiceError::NotFound("Product").to_string(),
            "Product not found"
        );
        assert_eq!(
            ServiceError::InsufficientStock {
                status: StatusCode::CONFLICT
            }
            .to_string(),
            "Quantity not enough"
        );
    }

    #[test]
    fn test_service_error_status() {
        assert_eq!(
            ServiceError::NotFound("Member").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InsufficientStock {
                status: StatusCode::OK
            }
            .status(),
            StatusCode::OK
        );
        assert_eq!(
            ServiceError::Repository(RepositoryError::Conflict("stock".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
