use crate::{models::{DocSessionResponse, ErrorResponse}, state::AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::debug;

/// Snapshot of the live session for a document
pub async fn doc_session(
    State(app_state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<DocSessionResponse>), (StatusCode, Json<ErrorResponse>)> {

    let session = match app_state.registry().get(&doc_id).await {
        Some(session) => session,
        None => {
            debug!("No live session for document '{}'", doc_id);
            let status = StatusCode::NOT_FOUND;
            return Err((status, Json(ErrorResponse::new(
                status,
                format!("No live session for document '{}'", doc_id),
            ))));
        }
    };

    let s = session.lock().await;
    Ok((
        StatusCode::OK,
        Json(DocSessionResponse {
            document_id: s.id.clone(),
            n_conn: s.connection_count() as u32,
            content_length: s.content.len() as u64,
            users: s.presence.users(),
        }),
    ))
}
