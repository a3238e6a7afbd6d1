use crate::{state::AppState, websocket::handler::websocket_handler};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the collaboration socket routes, `/?d=<documentId>` and `/ws?d=<documentId>`
pub fn create_socket_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .with_state(app_state)
}
