use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::{Identity, MarketStatus};

/// Role a gated operation required of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Resolver,
    CreatorOrOwner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Resolver => write!(f, "resolver"),
            Role::CreatorOrOwner => write!(f, "creator or owner"),
        }
    }
}

/// Coarse classification of a rejection, for callers that only need to
/// know which class of invariant failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidState,
    InvalidInput,
    InsufficientValue,
    TransferFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientValue => "insufficient_value",
            ErrorKind::TransferFailure => "transfer_failure",
        }
    }
}

/// Value transfer rejected by the payout backend or the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransferError(pub String);

/// Every way a registry operation can be rejected. Rejections are raised
/// before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("insufficient fee: provided {provided}, required {required}")]
    InsufficientFee { provided: Decimal, required: Decimal },

    #[error("question is required")]
    QuestionRequired,

    #[error("at least 2 outcomes are required, got {provided}")]
    InsufficientOutcomes { provided: usize },

    #[error("resolution deadline {deadline} is not after current time {now}")]
    ResolutionNotFuture {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("market {0} not found")]
    MarketNotFound(u64),

    #[error("unauthorized: caller is not the {required}")]
    Unauthorized { required: Role },

    #[error("market {id} is not open (status: {status})")]
    MarketNotOpen { id: u64, status: MarketStatus },

    #[error("too early to resolve: now {now}, deadline {deadline}")]
    TooEarly {
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },

    #[error("invalid outcome index {index}, market has {bound} outcomes")]
    InvalidOutcomeIndex { index: usize, bound: usize },

    #[error("zero identity is not allowed")]
    ZeroIdentity,

    #[error("fee must not be negative, got {0}")]
    InvalidFee(Decimal),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("paying {paid} would overflow the registry balance {balance}")]
    BalanceOverflow { balance: Decimal, paid: Decimal },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("transfer to {to} failed: {reason}")]
    TransferFailed { to: Identity, reason: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RegistryError::MarketNotFound(_) => ErrorKind::NotFound,
            RegistryError::MarketNotOpen { .. } | RegistryError::TooEarly { .. } => {
                ErrorKind::InvalidState
            }
            RegistryError::QuestionRequired
            | RegistryError::InsufficientOutcomes { .. }
            | RegistryError::ResolutionNotFuture { .. }
            | RegistryError::InvalidOutcomeIndex { .. }
            | RegistryError::ZeroIdentity
            | RegistryError::InvalidFee(_)
            | RegistryError::InvalidAmount(_)
            | RegistryError::BalanceOverflow { .. } => ErrorKind::InvalidInput,
            RegistryError::InsufficientFee { .. } | RegistryError::InsufficientBalance { .. } => {
                ErrorKind::InsufficientValue
            }
            RegistryError::TransferFailed { .. } => ErrorKind::TransferFailure,
        }
    }

    /// Stable machine-readable name of the failed check.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::InsufficientFee { .. } => "InsufficientFee",
            RegistryError::QuestionRequired => "QuestionRequired",
            RegistryError::InsufficientOutcomes { .. } => "InsufficientOutcomes",
            RegistryError::ResolutionNotFuture { .. } => "ResolutionNotFuture",
            RegistryError::MarketNotFound(_) => "MarketNotFound",
            RegistryError::Unauthorized { .. } => "Unauthorized",
            RegistryError::MarketNotOpen { .. } => "MarketNotOpen",
            RegistryError::TooEarly { .. } => "TooEarly",
            RegistryError::InvalidOutcomeIndex { .. } => "InvalidOutcomeIndex",
            RegistryError::ZeroIdentity => "ZeroIdentity",
            RegistryError::InvalidFee(_) => "InvalidFee",
            RegistryError::InvalidAmount(_) => "InvalidAmount",
            RegistryError::BalanceOverflow { .. } => "BalanceOverflow",
            RegistryError::InsufficientBalance { .. } => "InsufficientBalance",
            RegistryError::TransferFailed { .. } => "TransferFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_values() {
        let err = RegistryError::InsufficientFee {
            provided: Decimal::new(5, 4),
            required: Decimal::new(1, 3),
        };
        assert_eq!(
            err.to_string(),
            "insufficient fee: provided 0.0005, required 0.001"
        );
        assert_eq!(err.kind(), ErrorKind::InsufficientValue);

        let err = RegistryError::InvalidOutcomeIndex { index: 5, bound: 2 };
        assert_eq!(
            err.to_string(),
            "invalid outcome index 5, market has 2 outcomes"
        );
        assert_eq!(err.code(), "InvalidOutcomeIndex");
    }

    #[test]
    fn test_unauthorized_names_required_role() {
        let err = RegistryError::Unauthorized {
            required: Role::CreatorOrOwner,
        };
        assert_eq!(err.to_string(), "unauthorized: caller is not the creator or owner");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_state_errors_are_invalid_state() {
        let err = RegistryError::MarketNotOpen {
            id: 1,
            status: MarketStatus::Resolved,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "market 1 is not open (status: resolved)");
    }
}
