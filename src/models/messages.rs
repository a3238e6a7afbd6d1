use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::models::UserMeta;

/// Session joined when a connection names no document
pub const DEFAULT_DOCUMENT_ID: &str = "default";

/// The session a requested document id maps to. Missing and empty ids share
/// the default session.
pub fn resolve_document_id(requested: Option<&str>) -> &str {
    match requested {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_DOCUMENT_ID,
    }
}

// Client -> server frames. A `documentId` sent by the client is ignored,
// the connection already knows which session it belongs to.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    pub user_id: String,
    /// Any JSON number, relayed as received
    pub position: Number,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "update")]
    Update(UpdateMessage),
    #[serde(rename = "cursor")]
    Cursor(CursorMessage),
    #[serde(rename = "presence")]
    Presence(PresenceMessage),
}

// Server -> client frames. Every one of them is scoped to a document.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitMessage {
    pub content: String,
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastUpdateMessage {
    pub content: String,
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastCursorMessage {
    pub user_id: String,
    pub position: Number,
    pub document_id: String,
}

/// Full presence table, serialized as `[[userId, {name, email, color}], ...]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPresenceMessage {
    pub users: Vec<(String, UserMeta)>,
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipMessage {
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "init")]
    Init(InitMessage),
    #[serde(rename = "update")]
    Update(BroadcastUpdateMessage),
    #[serde(rename = "cursor")]
    Cursor(BroadcastCursorMessage),
    #[serde(rename = "presence")]
    Presence(BroadcastPresenceMessage),
    #[serde(rename = "user_joined")]
    UserJoined(MembershipMessage),
    #[serde(rename = "user_left")]
    UserLeft(MembershipMessage),
}

impl SendMessage {
    pub fn document_id(&self) -> &str {
        match self {
            SendMessage::Init(m) => &m.document_id,
            SendMessage::Update(m) => &m.document_id,
            SendMessage::Cursor(m) => &m.document_id,
            SendMessage::Presence(m) => &m.document_id,
            SendMessage::UserJoined(m) | SendMessage::UserLeft(m) => &m.document_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_frames_and_ignores_document_id() {
        let raw = r#"{"type":"update","content":"Hello","documentId":"doc-1"}"#;
        let msg: ReceivedMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg, ReceivedMessage::Update(UpdateMessage { content: "Hello".into() }));

        let raw = r#"{"type":"cursor","userId":"u1","position":42}"#;
        let msg: ReceivedMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg, ReceivedMessage::Cursor(CursorMessage { user_id: "u1".into(), position: 42.into() }));
    }

    #[test]
    fn cursor_position_keeps_any_json_number() {
        for raw_position in ["12.5", "-3", "0"] {
            let raw = format!(r#"{{"type":"cursor","userId":"u1","position":{raw_position}}}"#);
            let Ok(ReceivedMessage::Cursor(cursor)) = serde_json::from_str::<ReceivedMessage>(&raw) else {
                panic!("cursor frame with position {raw_position} was rejected");
            };
            assert_eq!(cursor.position.to_string(), raw_position);
        }
        assert!(serde_json::from_str::<ReceivedMessage>(r#"{"type":"cursor","userId":"u1","position":"7"}"#).is_err());
    }

    #[test]
    fn empty_or_missing_document_id_maps_to_default() {
        assert_eq!(resolve_document_id(None), DEFAULT_DOCUMENT_ID);
        assert_eq!(resolve_document_id(Some("")), "default");
        assert_eq!(resolve_document_id(Some("doc-7")), "doc-7");
    }

    #[test]
    fn rejects_unknown_type() {
        let raw = r#"{"type":"shout","content":"x"}"#;
        assert!(serde_json::from_str::<ReceivedMessage>(raw).is_err());
        assert!(serde_json::from_str::<ReceivedMessage>("not json").is_err());
    }

    #[test]
    fn presence_snapshot_uses_pair_arrays() {
        let msg = SendMessage::Presence(BroadcastPresenceMessage {
            users: vec![(
                "u1".into(),
                UserMeta { name: "Ada".into(), email: "ada@example.com".into(), color: "hsl(10, 70%, 50%)".into() },
            )],
            document_id: "doc-1".into(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "presence",
                "users": [["u1", {"name": "Ada", "email": "ada@example.com", "color": "hsl(10, 70%, 50%)"}]],
                "documentId": "doc-1"
            })
        );
    }

    #[test]
    fn membership_frames_carry_only_the_document_id() {
        let joined = serde_json::to_value(SendMessage::UserJoined(MembershipMessage { document_id: "d".into() })).unwrap();
        assert_eq!(joined, json!({"type": "user_joined", "documentId": "d"}));
        let left = serde_json::to_value(SendMessage::UserLeft(MembershipMessage { document_id: "d".into() })).unwrap();
        assert_eq!(left, json!({"type": "user_left", "documentId": "d"}));
    }
}
