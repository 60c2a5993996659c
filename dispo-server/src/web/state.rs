//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::planning::Planning;

/// Shared application state.
///
/// The feed task holds the write lock for a whole ingest cycle; handlers
/// read or set overrides between cycles.
#[derive(Clone)]
pub struct AppState {
    /// The planning model of the running session
    pub planning: Arc<RwLock<Planning>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(planning: Planning) -> Self {
        Self {
            planning: Arc::new(RwLock::new(planning)),
        }
    }
}
