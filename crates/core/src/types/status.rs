//! Status enums for store entities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome recorded on a transaction row.
///
/// Every checkout attempt writes exactly one row: `Success` when stock, cart
/// and transaction were committed together, `Failed` for the audit record
/// written after any error past the product lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, Error)]
#[error("invalid transaction status: {0}")]
pub struct TransactionStatusError(pub String);

impl TransactionStatus {
    /// The value stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = TransactionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(TransactionStatusError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_column_values() {
        assert_eq!(TransactionStatus::Success.as_str(), "success");
        assert_eq!(TransactionStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "failed".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Failed
        );
        assert!("pending".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TransactionStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }
}
