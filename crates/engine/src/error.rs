//! The module contains the errors the engine can throw.
//!
//! The errors a caller is expected to handle are:
//!
//! - [`Configuration`] thrown when no budget allocation resolves for an
//!   account/year and the operation requires one.
//! - [`OverspendRejected`] thrown by the overspend guard, carrying the
//!   available and required amounts.
//! - [`InvariantViolation`] thrown when a write would break a ledger
//!   invariant (e.g. two active allocations for the same scope).
//! - [`KeyNotFound`] thrown when an item is not found.
//!
//! [`Database`] errors are fatal for the current transaction: the triggering
//! write is rolled back.
//!
//!  [`Configuration`]: EngineError::Configuration
//!  [`OverspendRejected`]: EngineError::OverspendRejected
//!  [`InvariantViolation`]: EngineError::InvariantViolation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No budget configured: {0}")]
    Configuration(String),
    #[error("Insufficient budget. Available: {available}, required: {required}")]
    OverspendRejected { available: Money, required: Money },
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (
                Self::OverspendRejected {
                    available: a1,
                    required: r1,
                },
                Self::OverspendRejected {
                    available: a2,
                    required: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
