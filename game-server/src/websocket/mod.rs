use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};
use warp::ws::WebSocket;

use crate::room::Room;
use crate::room_registry::RoomRegistry;
use game_types::PlayerId;

pub mod connection;
pub mod handlers;


use connection::{ConnectionId, PlayerConnection};
use handlers::handle_message;

/// Runs one authenticated player session until either side closes it, then
/// applies the leave policy exactly once.
pub async fn handle_connection(
    websocket: WebSocket,
    registry: Arc<RoomRegistry>,
    room: Arc<Room>,
    player_id: PlayerId,
) {
    let connection_id = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = websocket.split();

    // Create connection and get receiver for outgoing messages
    let (connection, message_receiver) = PlayerConnection::new(connection_id);
    if let Err(e) = room.connect(&player_id, connection).await {
        warn!(room_code = %room.code(), %player_id, "Rejecting connection: {}", e);
        let _ = ws_sender.close().await;
        return;
    }

    // Handle incoming messages
    let incoming_handler = {
        let room = room.clone();
        let player_id = player_id.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_close() => break,
                    Ok(msg) => handle_message(msg, &room, &player_id).await,
                    Err(e) => {
                        warn!(%player_id, %connection_id, "WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    };

    // Handle outgoing messages
    let outgoing_handler = {
        let player_id = player_id.clone();

        async move {
            let mut receiver = message_receiver;

            while let Some(message) = receiver.recv().await {
                let closing = message.is_close();
                if let Err(e) = ws_sender.send(message).await {
                    warn!(%player_id, %connection_id, "Failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        }
    };

    // Run both handlers concurrently
    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!(room_code = %room.code(), %player_id, %connection_id, "Connection closed");
    registry.disconnect(&room, &player_id, connection_id).await;
}
