//! Application state for the API server

use crate::api::auth::IdentityProvider;
use crate::{Config, TaskManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the task manager, the configuration and the identity provider.
#[derive(Clone)]
pub struct AppState {
    /// The task lifecycle manager
    pub manager: Arc<TaskManager>,

    /// Configuration (read-only)
    pub config: Arc<Config>,

    /// Resolves caller identities from request headers
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        manager: Arc<TaskManager>,
        config: Arc<Config>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            manager,
            config,
            identity,
        }
    }
}
