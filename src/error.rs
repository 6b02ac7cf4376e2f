use crate::domain::intent::{IntentId, IntentStatus};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount: {0} minor units (must be positive)")]
    InvalidAmount(i64),
    #[error("Purchase intent {0} not found")]
    IntentNotFound(IntentId),
    #[error("Purchase intent {intent_id} is already finalized ({status})")]
    IntentAlreadyFinalized {
        intent_id: IntentId,
        status: IntentStatus,
    },
    #[error("Invalid intent transition from {from} to {to}")]
    InvalidTransition { from: IntentStatus, to: IntentStatus },
    #[error("Intent id {0} is already used by another buyer")]
    IdempotencyKeyReused(IntentId),
    #[error("Signature does not match the gateway claim")]
    SignatureInvalid,
    #[error("Gateway session is unknown")]
    SessionUnknown,
    #[error("Claim for this session was already consumed")]
    ReplayedClaim,
    #[error("Payment gateway unreachable: {0}")]
    GatewayUnreachable(String),
    #[error("Order for intent {0} already exists")]
    PersistenceConflict(IntentId),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Returns the rejection reason when this error means a verification claim
    /// must be refused rather than retried.
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            PaymentError::SignatureInvalid => Some(RejectionReason::SignatureInvalid),
            PaymentError::SessionUnknown => Some(RejectionReason::SessionUnknown),
            PaymentError::ReplayedClaim => Some(RejectionReason::ReplayedClaim),
            PaymentError::IntentAlreadyFinalized { .. } => {
                Some(RejectionReason::IntentAlreadyFinalized)
            }
            _ => None,
        }
    }
}

impl From<config::ConfigError> for PaymentError {
    fn from(err: config::ConfigError) -> Self {
        PaymentError::ConfigError(err.to_string())
    }
}

/// Why a verification claim was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    SignatureInvalid,
    SessionUnknown,
    ReplayedClaim,
    IntentAlreadyFinalized,
    MalformedClaim,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::SignatureInvalid => "payment signature could not be verified",
            RejectionReason::SessionUnknown => "payment session is unknown",
            RejectionReason::ReplayedClaim => "payment confirmation was already processed",
            RejectionReason::IntentAlreadyFinalized => "checkout was already closed",
            RejectionReason::MalformedClaim => "payment confirmation could not be read",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_mapping() {
        assert_eq!(
            PaymentError::SignatureInvalid.rejection(),
            Some(RejectionReason::SignatureInvalid)
        );
        assert_eq!(
            PaymentError::ReplayedClaim.rejection(),
            Some(RejectionReason::ReplayedClaim)
        );
        assert!(
            PaymentError::GatewayUnreachable("timeout".to_string())
                .rejection()
                .is_none()
        );
        assert!(PaymentError::InvalidAmount(0).rejection().is_none());
    }

    #[test]
    fn test_rejection_reason_serializes_snake_case() {
        let json = serde_json::to_string(&RejectionReason::SignatureInvalid).unwrap();
        assert_eq!(json, "\"signature_invalid\"");
        let json = serde_json::to_string(&RejectionReason::MalformedClaim).unwrap();
        assert_eq!(json, "\"malformed_claim\"");
    }
}
