// Application state module
// Shared by every connection for the lifetime of the server

use super::types::Config;
use crate::handler::Dispatcher;

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub const fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }

    pub fn access_log_format(&self) -> &str {
        &self.config.logging.access_log_format
    }
}
