//! Error types for ledger operations.

use fundme_common::{Address, CommonError, Usd, Wei};
use fundme_oracle::OracleError;
use thiserror::Error;

/// Every way a ledger call can fail. A failed call leaves no trace in
/// ledger state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FundMeError {
    /// Contribution is worth less than the minimum USD threshold.
    #[error("Insufficient contribution: worth {usd_value}, minimum is {minimum}")]
    InsufficientContribution { usd_value: Usd, minimum: Usd },

    /// Caller is not the owner.
    #[error("Unauthorized caller {caller}")]
    Unauthorized { caller: Address },

    /// Outbound payment to the owner did not complete.
    #[error("Transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        to: Address,
        amount: Wei,
        reason: String,
    },

    /// Contributor list position does not exist.
    #[error("Index {index} out of range for {len} funders")]
    IndexOutOfRange { index: usize, len: usize },

    /// Value attached to a call that does not accept it.
    #[error("Function is not payable, got {value}")]
    NonPayable { value: Wei },

    /// Price feed read or validation failed.
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Checked arithmetic failed.
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] CommonError),
}

impl FundMeError {
    /// Check if the same call might succeed later without changes by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            FundMeError::Oracle(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get error code for receipts and reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            FundMeError::InsufficientContribution { .. } => "INSUFFICIENT_CONTRIBUTION",
            FundMeError::Unauthorized { .. } => "UNAUTHORIZED",
            FundMeError::TransferFailed { .. } => "TRANSFER_FAILED",
            FundMeError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            FundMeError::NonPayable { .. } => "NON_PAYABLE",
            FundMeError::Oracle(e) => e.error_code(),
            FundMeError::Arithmetic(e) => e.error_code(),
        }
    }
}

/// Result type alias for ledger operations.
pub type FundMeResult<T> = std::result::Result<T, FundMeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FundMeError::InsufficientContribution {
            usd_value: Usd::from_dollars(10),
            minimum: Usd::from_dollars(50),
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_CONTRIBUTION");
        assert_eq!(
            err.to_string(),
            "Insufficient contribution: worth $10.00, minimum is $50.00"
        );

        let err: FundMeError = OracleError::Unavailable("down".into()).into();
        assert_eq!(err.error_code(), "ORACLE_UNAVAILABLE");
    }

    #[test]
    fn test_retryable_only_for_transient_oracle_failures() {
        assert!(FundMeError::from(OracleError::Unavailable("down".into())).is_retryable());
        assert!(!FundMeError::from(OracleError::Overflow).is_retryable());
        assert!(!FundMeError::Unauthorized {
            caller: Address::ZERO
        }
        .is_retryable());
    }
}
