//! API request handlers

pub mod actions;

use springkey_core::{ActionEngine, InteractionIdIssuer};

use crate::config::ServiceConfig;

pub use actions::{expand, genkey, sign, update};

/// Application state shared across handlers
///
/// Nothing here changes after start-up; requests share it without locking.
pub struct AppState {
    /// Runs the key actions
    pub engine: ActionEngine,
    /// Issues per-request interaction ids
    pub issuer: InteractionIdIssuer,
    /// Service configuration
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            engine: ActionEngine::new(config.key_suite),
            issuer: InteractionIdIssuer::new(),
            config,
        }
    }
}
