use game_core::{Admission, EventLog, Game};
use game_types::{
    ClientEvent, EventId, GameEvent, PlayerId, RoomCode, RoomEndReason, RoomError, ServerEvent,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::broadcast::{self, Audience};
use crate::websocket::connection::{ConnectionId, PlayerConnection};

/// Roster-guarded state. Connection handles live beside the game so a
/// broadcast always sees the roster it was produced from.
struct RoomState {
    game: Game,
    connections: HashMap<PlayerId, PlayerConnection>,
    last_activity: Instant,
}

impl RoomState {
    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// One game instance.
///
/// Lock order is roster (`state`) before event log (`log`). Game events are
/// appended and broadcast while the roster lock is held, so every observer
/// sees them in id order.
pub struct Room {
    code: RoomCode,
    state: RwLock<RoomState>,
    log: Mutex<EventLog>,
}

impl Room {
    pub fn new(code: RoomCode, host_name: String) -> (Self, Admission) {
        let (game, admission) = Game::new(code.clone(), host_name);
        let room = Self {
            code,
            state: RwLock::new(RoomState {
                game,
                connections: HashMap::new(),
                last_activity: Instant::now(),
            }),
            log: Mutex::new(EventLog::new()),
        };
        (room, admission)
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats or reseats a player. See [`Game::admit`].
    pub async fn join(
        &self,
        name: String,
        credentials: Option<(&str, &str)>,
    ) -> Result<(Admission, EventId), RoomError> {
        let mut state = self.state.write().await;
        let admission = state.game.admit(name, credentials)?;
        state.touch();
        let last_event_id = self.log.lock().await.last_id();

        info!(
            room_code = %self.code,
            player_id = %admission.player_id,
            is_viewer = admission.is_viewer,
            rejoined = admission.rejoined,
            "Player joined room"
        );
        Ok((admission, last_event_id))
    }

    pub async fn authenticate(&self, player_id: &str, token: &str) -> bool {
        self.state.read().await.game.authenticate(player_id, token)
    }

    /// Attaches a live connection for `player_id`, closing any previous one,
    /// and sends the connecting player its catch-up messages.
    pub async fn connect(
        &self,
        player_id: &str,
        connection: PlayerConnection,
    ) -> Result<(), RoomError> {
        let mut state = self.state.write().await;
        let Some(is_viewer) = state.game.player(player_id).map(|p| p.is_viewer) else {
            return Err(RoomError::Unauthorized);
        };

        if let Some(previous) = state
            .connections
            .insert(player_id.to_string(), connection.clone())
        {
            info!(
                room_code = %self.code,
                %player_id,
                connection_id = %previous.id,
                "Closing superseded connection"
            );
            previous.close();
        }
        state.game.set_connected(player_id, true);
        state.touch();

        let started = state.game.has_started();
        if is_viewer {
            broadcast::send_to(&connection, player_id, &state.game.viewer_notice(player_id));
            if started {
                let log = self.log.lock().await;
                let snapshot = state.game.snapshot(log.history());
                broadcast::send_to(&connection, player_id, &snapshot);
            }
        }
        for presence in state.game.presence() {
            broadcast::send_to(&connection, player_id, &presence);
        }

        if !(is_viewer && started) {
            if let Some(joined) = state.game.presence_of(player_id) {
                broadcast::broadcast(
                    &state.connections,
                    &joined,
                    Audience::EveryoneExcept(player_id),
                );
            }
        }

        info!(room_code = %self.code, %player_id, connection_id = %connection.id, "Player connected");
        Ok(())
    }

    /// Applies one inbound event. Invalid actions are dropped silently.
    pub async fn handle_event(&self, player_id: &str, event: ClientEvent) {
        let event_type = event.kind();
        let mut state = self.state.write().await;
        state.touch();
        state.game.touch(player_id);

        let result = {
            let mut rng = rand::rng();
            state.game.apply(player_id, event, &mut rng)
        };

        match result {
            Ok(events) => {
                for event in events {
                    self.publish(&state, event).await;
                }
            }
            Err(reason) => debug!(
                room_code = %self.code,
                %player_id,
                event_type,
                "Ignoring event: {}",
                reason
            ),
        }
    }

    /// Runs the leave policy for a closed connection. Returns the reason when
    /// the room has ended and must be removed from the registry.
    ///
    /// A connection that was already replaced by a newer one is ignored.
    pub async fn disconnect(
        &self,
        player_id: &str,
        connection_id: ConnectionId,
    ) -> Option<RoomEndReason> {
        let mut state = self.state.write().await;
        match state.connections.get(player_id) {
            Some(current) if current.id == connection_id => {
                state.connections.remove(player_id);
            }
            _ => {
                debug!(room_code = %self.code, %player_id, %connection_id, "Stale connection closed");
                return None;
            }
        }
        state.touch();

        let departure = state.game.depart(player_id)?;
        info!(
            room_code = %self.code,
            %player_id,
            was_host = departure.was_host,
            "Player left room"
        );

        broadcast::broadcast(
            &state.connections,
            &departure.notice(),
            Audience::EveryoneExcept(player_id),
        );
        for event in departure.events.iter().cloned() {
            self.publish(&state, event).await;
        }

        let reason = departure.room_end?;
        info!(room_code = %self.code, %reason, "Room ended");
        broadcast::broadcast(
            &state.connections,
            &ServerEvent::RoomEnded { reason },
            Audience::Everyone,
        );
        for (_, connection) in state.connections.drain() {
            connection.close();
        }
        Some(reason)
    }

    /// Closes every live connection. Used when the room is evicted.
    pub async fn close_all(&self) {
        let mut state = self.state.write().await;
        let connections: Vec<_> = state.connections.drain().collect();
        for (player_id, connection) in connections {
            state.game.set_connected(&player_id, false);
            connection.close();
        }
    }

    pub async fn idle_for(&self) -> Duration {
        self.state.read().await.last_activity.elapsed()
    }

    pub async fn last_event_id(&self) -> EventId {
        self.log.lock().await.last_id()
    }

    pub async fn history(&self) -> Vec<GameEvent> {
        self.log.lock().await.history().to_vec()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Read-only view of the game under the roster lock.
    pub async fn inspect<T>(&self, f: impl FnOnce(&Game) -> T) -> T {
        f(&self.state.read().await.game)
    }

    async fn publish(&self, state: &RoomState, event: ServerEvent) {
        let logged = self.log.lock().await.append(event).clone();
        debug!(
            room_code = %self.code,
            event_id = logged.id,
            event_type = logged.event.kind(),
            "Event logged"
        );
        broadcast::broadcast(&state.connections, &logged, Audience::Everyone);
    }
}
