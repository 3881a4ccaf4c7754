use std::{fmt, time::Duration};

use lto_common::{
    crypto::CryptoError, transaction::TransactionError, transaction::TransactionType,
    utils::AmountError,
};
use thiserror::Error;

/// Why the node did not accept a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionCause {
    /// The node answered with an error payload
    Rejected(String),
    /// The request never got a usable answer
    Transport(String),
}

impl fmt::Display for SubmissionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionCause::Rejected(message) => write!(f, "rejected by node: {}", message),
            SubmissionCause::Transport(message) => write!(f, "transport failure: {}", message),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{kind} submission failed, {cause}")]
    Submission {
        kind: TransactionType,
        cause: SubmissionCause,
    },
    #[error("Transaction {id} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { id: String, timeout: Duration },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response from node: {0}")]
    InvalidResponse(String),
    #[error("Assertion failed: {0}")]
    Assertion(String),
    #[error("Step error: {0}")]
    Step(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

impl HarnessError {
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            HarnessError::Submission {
                cause: SubmissionCause::Rejected(_),
                ..
            }
        )
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_error_message() {
        let err = HarnessError::Submission {
            kind: TransactionType::Sponsorship,
            cause: SubmissionCause::Rejected("insufficient funds".into()),
        };
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "Sponsorship submission failed, rejected by node: insufficient funds"
        );

        let err = HarnessError::Submission {
            kind: TransactionType::Lease,
            cause: SubmissionCause::Transport("connection refused".into()),
        };
        assert!(!err.is_rejection());
    }
}
