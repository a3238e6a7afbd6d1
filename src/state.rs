use std::sync::Arc;

use crate::websocket::router::BroadcastRouter;
use crate::ws::registry::SessionRegistry;

/// Shared state handed to both the socket and the API routers
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: BroadcastRouter,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            router: BroadcastRouter::new(Arc::new(SessionRegistry::new())),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.router.registry()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
