use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::PresenceUser;

/// Snapshot of a live document session
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocSessionResponse {
    pub document_id: String,
    pub n_conn: u32,
    pub content_length: u64,
    pub users: Vec<PresenceUser>,
}
