//! Development chain error types.

use fundme_common::{Address, TxId, Usd, Wei};
use fundme_ledger::FundMeError;
use thiserror::Error;

/// Why a transaction did not execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Sender is not a known account.
    #[error("Unknown account {0}")]
    UnknownAccount(Address),

    /// Sender cannot cover the attached value.
    #[error("Insufficient balance in {account}: has {balance}, needs {required}")]
    InsufficientBalance {
        account: Address,
        balance: Wei,
        required: Wei,
    },

    /// Price cannot be expressed with the feed's decimals.
    #[error("Price {0} cannot be published by the feed")]
    InvalidPrice(Usd),

    /// Block clock cannot move by this many seconds.
    #[error("Cannot advance block time by {seconds}s")]
    ClockOverflow { seconds: i64 },

    /// The ledger rejected the call; all effects were undone.
    #[error("Transaction {tx_id} reverted: {error}")]
    Reverted { tx_id: TxId, error: FundMeError },
}

impl ChainError {
    /// Ledger error behind a revert.
    pub fn revert_reason(&self) -> Option<&FundMeError> {
        match self {
            ChainError::Reverted { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Get error code for receipts and reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChainError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            ChainError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ChainError::InvalidPrice(_) => "INVALID_PRICE",
            ChainError::ClockOverflow { .. } => "CLOCK_OVERFLOW",
            ChainError::Reverted { error, .. } => error.error_code(),
        }
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
