//! Server-side error taxonomy.
//!
//! Every fallible operation surfaces one of these kinds; the `kind` string
//! is the stable wire contract, the message is human-readable detail.

use appstack_core::GameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Retryable contention on a game's state
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl ApiError {
    /// Stable wire identifier for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::NotFound(_) => "not_found",
            ApiError::FailedPrecondition(_) => "failed_precondition",
            ApiError::Internal(_) => "internal",
            ApiError::Conflict(_) => "conflict",
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        match err {
            // Malformed or out-of-contract input
            GameError::HandIndexOutOfBounds(_)
            | GameError::WrongCardKind
            | GameError::MissingTarget
            | GameError::UnknownPlayer => ApiError::InvalidArgument(err.to_string()),

            // Legal requests the current state rejects
            GameError::GameOver
            | GameError::NotYourTurn
            | GameError::AttackPending
            | GameError::NoPendingAttack
            | GameError::NotYourResponse
            | GameError::EmptyAppDeck => ApiError::FailedPrecondition(err.to_string()),

            // Data integrity, never the caller's fault
            GameError::CorruptAppCard { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
