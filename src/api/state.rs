//! Application state for the Payroll Engine API.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::store::PayrollGateway;

/// Shared application state.
///
/// Holds the loaded rate tables and the master data gateway.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    gateway: Arc<dyn PayrollGateway>,
}

impl AppState {
    /// Creates the state from a configuration and a master data gateway.
    pub fn new<G: PayrollGateway + 'static>(config: ConfigLoader, gateway: G) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the master data gateway.
    pub fn gateway(&self) -> &dyn PayrollGateway {
        self.gateway.as_ref()
    }
}
