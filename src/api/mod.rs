//! HTTP API module for the payroll engine.
//!
//! This module provides the REST endpoints that resolve an organization's
//! rules, run payroll simulations and invalidate cached configurations.

mod handlers;
mod response;
mod state;

pub use handlers::create_router;
pub use response::{ApiError, ApiErrorResponse, InvalidationResponse};
pub use state::AppState;
