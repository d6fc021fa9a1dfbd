//! Error types for the recommendation engine.
//!
//! Unknown entities are surfaced as errors rather than folded into a zero
//! prediction, so callers can tell "this user does not exist" apart from
//! "this prediction carries no confidence". Sparse-but-known entities never
//! error; they take the documented fallback paths instead.

use data_loader::{MovieId, UserId};
use thiserror::Error;

/// Errors returned by the similarity and prediction queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Requested user is absent from the relevant matrix/table
    #[error("User {0} not found")]
    UnknownUser(UserId),

    /// Requested movie is absent from the relevant matrix/table
    #[error("Movie {0} not found")]
    UnknownMovie(MovieId),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;
