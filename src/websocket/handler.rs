use std::sync::Arc;
use axum::{
    extract::{Query, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::models::resolve_document_id;
use crate::state::AppState;
use crate::ws::connctx::ConnectionHandle;

/// Query string of the collaboration socket, `?d=<documentId>`
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub d: Option<String>,
}

impl ConnectParams {
    pub fn document_id(self) -> String {
        resolve_document_id(self.d.as_deref()).to_string()
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    let document_id = params.document_id();
    debug!("New WebSocket connection attempt for document {}", document_id);
    ws.on_upgrade(move |socket| handle_socket(socket, document_id, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, document_id: String, app_state: Arc<AppState>) {
    let router = app_state.router.clone();
    let (mut handle, mut outbound_rx) = ConnectionHandle::new(document_id);
    info!(
        "WebSocket connection established for document_id: {} with connection_id: {}",
        handle.document_id, handle.id
    );

    let (mut sender, mut receiver) = socket.split();

    // Writer: drains this connection's queue into the socket
    let writer_doc = handle.document_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {} frame: {}", msg.document_id(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Socket closed while writing to document {}", writer_doc);
                break;
            }
        }
    });

    router.connect(&mut handle).await;

    // Reader: frames are handled inline, one at a time, until either side ends
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => router.handle_text(&handle, &text).await,
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary frame on document {}", handle.document_id);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Transport error on connection {}: {}", handle.id, e);
                    break;
                }
            },
            _ = (&mut send_task) => break,
        }
    }

    send_task.abort();
    router.disconnect(handle).await;
    info!("WebSocket connection terminated");
}
