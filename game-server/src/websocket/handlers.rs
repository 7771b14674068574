use game_types::ClientEvent;
use serde_json::Value;
use tracing::{debug, warn};
use warp::ws::Message;

use crate::room::Room;

const ENVELOPE_TYPE: &str = "event";

/// Decodes one inbound text frame.
///
/// Accepts both bare events and the `{"type": "event", "event": {...}}`
/// envelope, and fills in `player_id` with the session's player when the
/// sender left it out.
pub fn decode_client_event(text: &str, player_id: &str) -> Result<ClientEvent, serde_json::Error> {
    let mut value: Value = serde_json::from_str(text)?;

    let is_envelope = value.get("type").and_then(Value::as_str) == Some(ENVELOPE_TYPE);
    if is_envelope {
        if let Some(inner) = value.get_mut("event").filter(|inner| inner.is_object()) {
            value = inner.take();
        }
    }

    if let Value::Object(fields) = &mut value {
        fields
            .entry("player_id")
            .or_insert_with(|| Value::from(player_id));
    }

    serde_json::from_value(value)
}

/// Feeds one frame from `player_id` into the room. Non-text frames and
/// undecodable payloads are skipped.
pub async fn handle_message(message: Message, room: &Room, player_id: &str) {
    let Ok(text) = message.to_str() else {
        debug!(room_code = %room.code(), %player_id, "Ignoring non-text frame");
        return;
    };

    match decode_client_event(text, player_id) {
        Ok(event) => room.handle_event(player_id, event).await,
        Err(e) => warn!(
            room_code = %room.code(),
            %player_id,
            "Skipping malformed message: {}",
            e
        ),
    }
}
