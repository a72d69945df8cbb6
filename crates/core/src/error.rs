//! Billing error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the billing domain layer.
pub type BillingResult<T> = Result<T, BillingError>;

/// Gateway-specific decline sub-reason.
///
/// All decline reasons surface as the single `BillingError::PaymentDeclined`
/// kind; the sub-reason is carried for logging and reconciliation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    InsufficientFunds,
    SuspectedFraud,
    InvalidCvc,
    ExpiredCard,
    ProcessingError,
}

impl DeclineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineReason::InsufficientFunds => "insufficient_funds",
            DeclineReason::SuspectedFraud => "suspected_fraud",
            DeclineReason::InvalidCvc => "invalid_cvc",
            DeclineReason::ExpiredCard => "expired_card",
            DeclineReason::ProcessingError => "processing_error",
        }
    }
}

impl core::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level billing error.
///
/// Keep this focused on deterministic business failures (validation,
/// invariants, lifecycle conflicts). Infrastructure concerns belong elsewhere.
/// Soft-deleted aggregates report `NotFound`; absence and soft-delete are
/// intentionally indistinguishable to outside callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An illegal lifecycle transition (draft orders, already-approved,
    /// already-invoiced, already-paid, reject-from-non-pending).
    #[error("illegal state transition: {0}")]
    State(String),

    /// Payment/invoice/line-item cross-references do not match.
    #[error("relationship mismatch: {0}")]
    Relationship(String),

    /// Payment currency has no corresponding entry in the invoice totals.
    #[error("currency not present on invoice: {0}")]
    CurrencyMismatch(String),

    /// Block belongs to a different account than the paying one.
    #[error("block not owned by paying account: {0}")]
    BlockOwnership(String),

    /// Block is past its configured TTL.
    #[error("block expired: {0}")]
    BlockExpired(String),

    /// Block was manually exhausted outside of payment.
    #[error("block exhausted: {0}")]
    BlockExhausted(String),

    /// Block is already tied to a payment.
    #[error("block already spent: {0}")]
    BlockAlreadySpent(String),

    /// Redemption batch size does not equal the payment amount in blocks.
    #[error("block count mismatch: expected {expected}, got {actual}")]
    BlockCountMismatch { expected: u64, actual: u64 },

    /// The external charge gateway declined the charge.
    #[error("payment declined: {0}")]
    PaymentDeclined(DeclineReason),

    /// A requested aggregate is missing or soft-deleted.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl BillingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn relationship(msg: impl Into<String>) -> Self {
        Self::Relationship(msg.into())
    }

    pub fn currency_mismatch(msg: impl Into<String>) -> Self {
        Self::CurrencyMismatch(msg.into())
    }

    pub fn block_ownership(msg: impl Into<String>) -> Self {
        Self::BlockOwnership(msg.into())
    }

    pub fn block_expired(msg: impl Into<String>) -> Self {
        Self::BlockExpired(msg.into())
    }

    pub fn block_exhausted(msg: impl Into<String>) -> Self {
        Self::BlockExhausted(msg.into())
    }

    pub fn block_already_spent(msg: impl Into<String>) -> Self {
        Self::BlockAlreadySpent(msg.into())
    }

    pub fn declined(reason: DeclineReason) -> Self {
        Self::PaymentDeclined(reason)
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
