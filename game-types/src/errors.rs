use thiserror::Error;

use crate::{Category, RoomCode};

/// Reasons a game action is dropped without telling the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("player {player_id} is not in this room")]
    UnknownPlayer { player_id: String },
    #[error("viewers cannot act")]
    ViewerAction,
    #[error("only the host can start the game")]
    NotHost,
    #[error("game already started")]
    AlreadyStarted,
    #[error("game is not in progress")]
    NotInProgress,
    #[error("not this player's turn")]
    NotYourTurn,
    #[error("no rolls left this turn")]
    NoRollsLeft,
    #[error("category {category} already scored")]
    CategoryTaken { category: Category },
    #[error("score {score} cannot be recorded")]
    InvalidScore { score: i32 },
}

/// Failures surfaced to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("room {0} is full")]
    RoomFull(RoomCode),
    #[error("invalid player credentials")]
    Unauthorized,
}
