//! Web layer for the dispatch planner.
//!
//! Provides HTTP endpoints for reading planned delays and setting
//! dispatcher overrides.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
