//! Server crate for the recommendation service.
//!
//! Thin HTTP transport over the read-only core: axum handlers wrap the
//! engine's pure functions in a `{success, data|error}` JSON envelope.
//! `NotFound` becomes 404, bad query parameters 400, anything else 500.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
