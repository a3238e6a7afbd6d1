use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Display metadata of one user as it travels in a presence snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct UserMeta {
    pub name: String,
    pub email: String,
    pub color: String,
}

/// Presence entry as exposed by the session endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub color: String,
}
