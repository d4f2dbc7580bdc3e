//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidObligation`] thrown when a debt fact is self-referencing or has
//!   a non-positive amount.
//! - [`ImbalancedLedger`] thrown when net balances do not sum to zero.
//! - [`InvalidAmount`] thrown when an amount cannot be parsed or overflows.
//! - [`InvalidExpense`] thrown when an expense and its shares disagree.
//!
//! Every error is a data error: the engine is deterministic, so calling again
//! with the same input reproduces the same error.
//!
//!  [`InvalidObligation`]: EngineError::InvalidObligation
//!  [`ImbalancedLedger`]: EngineError::ImbalancedLedger
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidExpense`]: EngineError::InvalidExpense
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid obligation: {0}")]
    InvalidObligation(String),
    #[error("Imbalanced ledger: {0}")]
    ImbalancedLedger(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
}
