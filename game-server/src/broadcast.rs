use game_types::PlayerId;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, warn};
use warp::ws::Message;

use crate::websocket::connection::PlayerConnection;

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy)]
pub enum Audience<'a> {
    Everyone,
    EveryoneExcept(&'a str),
}

pub fn encode<T: Serialize>(event: &T) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::text(json)),
        Err(e) => {
            error!("Failed to serialize event: {:?}", e);
            None
        }
    }
}

/// Sends one event to a single connection.
pub fn send_to<T: Serialize>(connection: &PlayerConnection, player_id: &str, event: &T) {
    let Some(message) = encode(event) else {
        return;
    };
    if let Err(e) = connection.send_message(message) {
        warn!(%player_id, connection_id = %connection.id, "Failed to queue message: {}", e);
    }
}

/// Serializes `event` once and queues it on every selected connection.
/// A failed connection is logged and skipped. Returns how many were reached.
pub fn broadcast<T: Serialize>(
    connections: &HashMap<PlayerId, PlayerConnection>,
    event: &T,
    audience: Audience<'_>,
) -> usize {
    let Some(message) = encode(event) else {
        return 0;
    };

    let mut delivered = 0;
    for (player_id, connection) in connections {
        if let Audience::EveryoneExcept(excluded) = audience {
            if player_id == excluded {
                continue;
            }
        }
        match connection.send_message(message.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => warn!(%player_id, connection_id = %connection.id, "Failed to queue broadcast: {}", e),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::ConnectionId;
    use game_types::ServerEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connections(
        ids: &[&str],
    ) -> (
        HashMap<PlayerId, PlayerConnection>,
        HashMap<PlayerId, UnboundedReceiver<Message>>,
    ) {
        let mut connections = HashMap::new();
        let mut receivers = HashMap::new();
        for id in ids {
            let (connection, receiver) = PlayerConnection::new(ConnectionId::new());
            connections.insert(id.to_string(), connection);
            receivers.insert(id.to_string(), receiver);
        }
        (connections, receivers)
    }

    fn ready(player: &str) -> ServerEvent {
        ServerEvent::PlayerReady {
            player_id: player.to_string(),
            ready: true,
        }
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let (connections, mut receivers) = connections(&["a", "b", "c"]);
        assert_eq!(broadcast(&connections, &ready("a"), Audience::Everyone), 3);

        for receiver in receivers.values_mut() {
            let message = receiver.try_recv().unwrap();
            let json: serde_json::Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
            assert_eq!(json["type"], "PLAYER_READY");
        }
    }

    #[test]
    fn test_broadcast_skips_excluded_player() {
        let (connections, mut receivers) = connections(&["a", "b"]);
        assert_eq!(
            broadcast(&connections, &ready("a"), Audience::EveryoneExcept("a")),
            1
        );
        assert!(receivers.get_mut("a").unwrap().try_recv().is_err());
        assert!(receivers.get_mut("b").unwrap().try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_survives_dead_connection() {
        let (connections, mut receivers) = connections(&["a", "b", "c"]);
        drop(receivers.remove("b"));

        assert_eq!(broadcast(&connections, &ready("c"), Audience::Everyone), 2);
        assert!(receivers.get_mut("a").unwrap().try_recv().is_ok());
        assert!(receivers.get_mut("c").unwrap().try_recv().is_ok());
    }
}
