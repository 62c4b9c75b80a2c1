//! Error types shared by every FundMe crate.

use thiserror::Error;

/// Parse and arithmetic failures on common types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Address text is not 20 bytes of hex.
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Amount text could not be parsed or has too many decimals.
    #[error("Invalid amount {0:?}")]
    InvalidAmount(String),

    /// Checked arithmetic overflowed.
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// Checked arithmetic underflowed.
    #[error("Arithmetic underflow in {operation}")]
    Underflow { operation: &'static str },
}

impl CommonError {
    /// Get error code for logs and reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommonError::InvalidAddress { .. } => "INVALID_ADDRESS",
            CommonError::InvalidAmount(_) => "INVALID_AMOUNT",
            CommonError::Overflow { .. } => "OVERFLOW",
            CommonError::Underflow { .. } => "UNDERFLOW",
        }
    }
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;
