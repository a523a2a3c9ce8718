use std::sync::Arc;

use relay_core::Registry;

/// Shared server state: the process-wide path registry.
#[derive(Clone, Default)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
