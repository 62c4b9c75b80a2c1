//! Price oracle error types.

use thiserror::Error;

/// Errors that can occur while reading or validating a price feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Feed could not be read at all.
    #[error("Price feed unavailable: {0}")]
    Unavailable(String),

    /// Feed reported a zero or negative price.
    #[error("Price feed returned non-positive answer {answer} in round {round_id}")]
    NonPositiveAnswer { round_id: u64, answer: i128 },

    /// Latest round is older than the allowed age.
    #[error("Round {round_id} is stale: updated {age_secs}s ago, max {max_age_secs}s")]
    StaleRound {
        round_id: u64,
        age_secs: i64,
        max_age_secs: i64,
    },

    /// Round was never completed or was carried over from an earlier round.
    #[error("Round {round_id} is incomplete")]
    IncompleteRound { round_id: u64 },

    /// Requested round does not exist.
    #[error("Round {0} not found")]
    RoundNotFound(u64),

    /// Fixed-point conversion overflowed.
    #[error("Price conversion overflow")]
    Overflow,
}

impl OracleError {
    /// Check if a later read might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OracleError::Unavailable(_)
                | OracleError::StaleRound { .. }
                | OracleError::IncompleteRound { .. }
        )
    }

    /// Get error code for logs and reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            OracleError::Unavailable(_) => "ORACLE_UNAVAILABLE",
            OracleError::NonPositiveAnswer { .. } => "ORACLE_NON_POSITIVE_ANSWER",
            OracleError::StaleRound { .. } => "ORACLE_STALE_ROUND",
            OracleError::IncompleteRound { .. } => "ORACLE_INCOMPLETE_ROUND",
            OracleError::RoundNotFound(_) => "ORACLE_ROUND_NOT_FOUND",
            OracleError::Overflow => "ORACLE_OVERFLOW",
        }
    }
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;
