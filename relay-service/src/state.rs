//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::websocket::ConnectionRegistry;

/// Application state shared across handlers
///
/// Holds the configuration and the connection registry. The registry is
/// owned here and injected into whatever needs it — there is no process-wide
/// registry, so tests can run several independent instances side by side.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: ConnectionRegistry,
}

impl AppState {
    /// Create a new AppState with the given configuration and an empty
    /// registry
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: ConnectionRegistry::new(),
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the connection registry
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
