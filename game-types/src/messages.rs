use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::{Category, Dice, EventId, FinalScore, PlayerId, PlayerSummary, RoomEndReason};

/// Free-form fields carried by chat messages and forwarded untouched.
pub type Passthrough = HashMap<String, Value>;

/// Events a player sends over their room connection.
///
/// Messages may also arrive wrapped as `{"type": "event", "event": {...}}`;
/// unwrapping happens before this type is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ClientEvent {
    PlayerReady {
        #[serde(default)]
        ready: bool,
    },
    #[serde(alias = "GAME_START")]
    StartGame,
    RequestRoll {
        #[serde(default)]
        held_indices: Vec<usize>,
    },
    CategoryChosen {
        category: Category,
        #[serde(default)]
        score: i32,
    },
    RequestEndTurn,
    ChatMessage(Passthrough),
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::PlayerReady { .. } => "PLAYER_READY",
            ClientEvent::StartGame => "START_GAME",
            ClientEvent::RequestRoll { .. } => "REQUEST_ROLL",
            ClientEvent::CategoryChosen { .. } => "CATEGORY_CHOSEN",
            ClientEvent::RequestEndTurn => "REQUEST_END_TURN",
            ClientEvent::ChatMessage(_) => "CHAT_MESSAGE",
        }
    }
}

/// Everything the server pushes to connected players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ServerEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        is_host: bool,
        is_viewer: bool,
    },
    PlayerLeft {
        player_id: PlayerId,
        player_name: String,
        is_host: bool,
    },
    PlayerReady {
        player_id: PlayerId,
        ready: bool,
    },
    GameStarted {
        players: BTreeMap<PlayerId, PlayerSummary>,
        player_list: Vec<PlayerSummary>,
        turn_order: Vec<PlayerId>,
        current_player: PlayerId,
    },
    RollResult {
        player_id: PlayerId,
        dice: Dice,
        rolls_left: u8,
    },
    ScoreUpdate {
        player_id: PlayerId,
        category: Category,
        score: i32,
    },
    TurnChanged {
        current_player: PlayerId,
        rolls_left: u8,
    },
    GameEnd {
        final_scores: BTreeMap<PlayerId, FinalScore>,
        winner_id: PlayerId,
        winner_name: String,
        is_draw: bool,
    },
    ChatMessage(Passthrough),
    RoomEnded {
        reason: RoomEndReason,
    },
    ViewerMode {
        player_id: PlayerId,
        message: String,
    },
    GameState {
        players: BTreeMap<PlayerId, PlayerSummary>,
        player_list: Vec<PlayerSummary>,
        turn_order: Vec<PlayerId>,
        current_player: Option<PlayerId>,
        dice: Dice,
        rolls_left: u8,
        #[ts(type = "Array<{ id: bigint } & ServerEvent>")]
        event_history: Vec<GameEvent>,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::PlayerJoined { .. } => "PLAYER_JOINED",
            ServerEvent::PlayerLeft { .. } => "PLAYER_LEFT",
            ServerEvent::PlayerReady { .. } => "PLAYER_READY",
            ServerEvent::GameStarted { .. } => "GAME_STARTED",
            ServerEvent::RollResult { .. } => "ROLL_RESULT",
            ServerEvent::ScoreUpdate { .. } => "SCORE_UPDATE",
            ServerEvent::TurnChanged { .. } => "TURN_CHANGED",
            ServerEvent::GameEnd { .. } => "GAME_END",
            ServerEvent::ChatMessage(_) => "CHAT_MESSAGE",
            ServerEvent::RoomEnded { .. } => "ROOM_ENDED",
            ServerEvent::ViewerMode { .. } => "VIEWER_MODE",
            ServerEvent::GameState { .. } => "GAME_STATE",
        }
    }
}

/// A logged event. Serializes flat, e.g. `{"id": 3, "type": "ROLL_RESULT", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub event: ServerEvent,
}
