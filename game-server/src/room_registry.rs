use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::room::Room;
use crate::websocket::connection::ConnectionId;
use game_core::generate_room_code;
use game_types::{
    CreateRoomResponse, JoinRoomRequest, JoinRoomResponse, RoomCode, RoomEndReason, RoomError,
    display_name_or_default,
};

/// How often idle rooms are looked for.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Live rooms by code. The registry lock only guards membership. A room's
/// own locks may be taken while it is held, never the other way round.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a room with a fresh unique code and seats its host.
    pub async fn create_room(&self, player_name: &str) -> CreateRoomResponse {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_room_code(&mut rand::rng());
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let (room, host) = Room::new(code.clone(), display_name_or_default(player_name));
        rooms.insert(code.clone(), Arc::new(room));
        info!(room_code = %code, player_id = %host.player_id, "Room created");

        CreateRoomResponse {
            room_code: code,
            player_id: host.player_id,
            token: host.token,
            last_event_id: 0,
        }
    }

    pub async fn join_room(&self, request: JoinRoomRequest) -> Result<JoinRoomResponse, RoomError> {
        let room = self.lookup(&request.room_code).await?;
        let (admission, last_event_id) = room
            .join(
                display_name_or_default(&request.player_name),
                request.credentials(),
            )
            .await?;

        Ok(JoinRoomResponse {
            room_code: room.code().clone(),
            player_id: admission.player_id,
            token: admission.token,
            is_viewer: admission.is_viewer,
            last_event_id,
        })
    }

    pub async fn lookup(&self, room_code: &str) -> Result<Arc<Room>, RoomError> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(room_code.to_string()))
    }

    pub async fn remove(&self, room_code: &str) -> Option<Arc<Room>> {
        let removed = self.rooms.write().await.remove(room_code);
        if removed.is_some() {
            info!(%room_code, "Room removed");
        }
        removed
    }

    /// Runs the leave policy for a closed session and deletes the room when
    /// the policy ends it.
    pub async fn disconnect(
        &self,
        room: &Room,
        player_id: &str,
        connection_id: ConnectionId,
    ) -> Option<RoomEndReason> {
        let reason = room.disconnect(player_id, connection_id).await?;
        self.remove(room.code()).await;
        Some(reason)
    }

    /// Evicts every room idle for longer than `idle_timeout`, closing its
    /// connections. Returns how many rooms were evicted.
    pub async fn sweep(&self, idle_timeout: Duration) -> usize {
        let stale = self.idle_rooms(idle_timeout).await;
        self.evict_idle(stale, idle_timeout).await
    }

    /// Rooms idle for longer than `idle_timeout`, measured without holding
    /// the registry lock.
    async fn idle_rooms(&self, idle_timeout: Duration) -> Vec<(RoomCode, Arc<Room>)> {
        let candidates: Vec<(RoomCode, Arc<Room>)> = {
            let rooms = self.rooms.read().await;
            rooms
                .iter()
                .map(|(code, room)| (code.clone(), room.clone()))
                .collect()
        };

        let mut stale = Vec::new();
        for (code, room) in candidates {
            if room.idle_for().await > idle_timeout {
                stale.push((code, room));
            }
        }
        stale
    }

    /// Removes the given rooms that are still idle once the registry lock is
    /// held, then closes their connections.
    async fn evict_idle(
        &self,
        stale: Vec<(RoomCode, Arc<Room>)>,
        idle_timeout: Duration,
    ) -> usize {
        let mut evicted = Vec::new();
        if !stale.is_empty() {
            let mut rooms = self.rooms.write().await;
            for (code, room) in stale {
                // Only evict the room that was measured, not a newer one under the same code.
                if !rooms.get(&code).is_some_and(|live| Arc::ptr_eq(live, &room)) {
                    continue;
                }
                // Activity may have landed since it was measured.
                if room.idle_for().await <= idle_timeout {
                    continue;
                }
                rooms.remove(&code);
                evicted.push(room);
            }
        }

        for room in &evicted {
            room.close_all().await;
            info!(room_code = %room.code(), "Removed idle room");
        }
        evicted.len()
    }

    /// Spawns the periodic idle sweep.
    pub fn spawn_sweeper(self: &Arc<Self>, idle_timeout: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let evicted = registry.sweep(idle_timeout).await;
                if evicted > 0 {
                    info!(evicted, "Idle room sweep finished");
                }
            }
        })
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
