use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{EventId, PlayerId, RoomCode};

pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateRoomResponse {
    pub room_code: RoomCode,
    pub player_id: PlayerId,
    pub token: String,
    pub last_event_id: EventId,
}

/// Supplying both `player_id` and `token` asks to resume an existing seat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JoinRoomRequest {
    pub room_code: RoomCode,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub token: Option<String>,
}

impl JoinRoomRequest {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.player_id.as_deref(), self.token.as_deref()) {
            (Some(id), Some(token)) if !id.is_empty() && !token.is_empty() => Some((id, token)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JoinRoomResponse {
    pub room_code: RoomCode,
    pub player_id: PlayerId,
    pub token: String,
    pub is_viewer: bool,
    pub last_event_id: EventId,
}

/// Query string of the room connection upgrade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub player_id: PlayerId,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Falls back to the default name when the client sent a blank one.
pub fn display_name_or_default(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_fields() {
        let mut request = JoinRoomRequest {
            room_code: "ABCDEF".to_string(),
            player_name: "Ana".to_string(),
            player_id: Some("p1".to_string()),
            token: None,
        };
        assert_eq!(request.credentials(), None);

        request.token = Some(String::new());
        assert_eq!(request.credentials(), None);

        request.token = Some("secret".to_string());
        assert_eq!(request.credentials(), Some(("p1", "secret")));
    }

    #[test]
    fn test_join_request_optional_fields_default() {
        let request: JoinRoomRequest =
            serde_json::from_str(r#"{"room_code": "ABCDEF"}"#).unwrap();
        assert_eq!(request.player_name, "");
        assert!(request.credentials().is_none());
    }

    #[test]
    fn test_blank_display_name_defaults() {
        assert_eq!(display_name_or_default(""), "Player");
        assert_eq!(display_name_or_default("   "), "Player");
        assert_eq!(display_name_or_default(" Ana "), "Ana");
    }
}
