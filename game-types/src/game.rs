use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

pub type RoomCode = String;
pub type PlayerId = String;
pub type EventId = u64;

/// Five dice faces. `[0, 0, 0, 0, 0]` means the current turn has not rolled yet.
pub type Dice = [u8; 5];

pub const DICE_COUNT: usize = 5;
pub const UNROLLED_DICE: Dice = [0; DICE_COUNT];
pub const STARTING_DICE: Dice = [1; DICE_COUNT];
pub const ROLLS_PER_TURN: u8 = 3;
pub const MAX_PLAYERS: usize = 6;

pub const UPPER_BONUS_THRESHOLD: i32 = 63;
pub const UPPER_BONUS: i32 = 35;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Yahtzee,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Yahtzee,
    ];

    /// Ones through sixes count towards the upper bonus.
    pub fn is_upper(self) -> bool {
        matches!(
            self,
            Category::Ones
                | Category::Twos
                | Category::Threes
                | Category::Fours
                | Category::Fives
                | Category::Sixes
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Ones => "ones",
            Category::Twos => "twos",
            Category::Threes => "threes",
            Category::Fours => "fours",
            Category::Fives => "fives",
            Category::Sixes => "sixes",
            Category::ThreeOfAKind => "three_of_a_kind",
            Category::FourOfAKind => "four_of_a_kind",
            Category::FullHouse => "full_house",
            Category::SmallStraight => "small_straight",
            Category::LargeStraight => "large_straight",
            Category::Yahtzee => "yahtzee",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GamePhase {
    Lobby,
    InProgress,
    Ended,
}

impl GamePhase {
    pub fn has_started(self) -> bool {
        self != GamePhase::Lobby
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RoomEndReason {
    HostDisconnected,
    InsufficientPlayers,
}

impl fmt::Display for RoomEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEndReason::HostDisconnected => write!(f, "host_disconnected"),
            RoomEndReason::InsufficientPlayers => write!(f, "insufficient_players"),
        }
    }
}

/// Public view of a roster member. Never carries the player's token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_viewer: bool,
    pub ready: bool,
    pub scores: BTreeMap<Category, i32>,
    pub total_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinalScore {
    pub name: String,
    pub base_score: i32,
    pub upper_bonus: i32,
    pub final_score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_name() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
            assert_eq!(
                serde_json::to_string(&category).unwrap(),
                format!("\"{}\"", category)
            );
        }
    }

    #[test]
    fn test_category_unknown_name_rejected() {
        assert!("chance".parse::<Category>().is_err());
    }

    #[test]
    fn test_upper_section_is_first_six() {
        let upper: Vec<_> = Category::ALL.into_iter().filter(|c| c.is_upper()).collect();
        assert_eq!(upper, Category::ALL[..6].to_vec());
    }

    #[test]
    fn test_scores_serialize_with_category_keys() {
        let mut scores = BTreeMap::new();
        scores.insert(Category::FullHouse, 25);
        scores.insert(Category::Ones, 3);
        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(json, serde_json::json!({"ones": 3, "full_house": 25}));
    }

    #[test]
    fn test_room_end_reason_wire_name() {
        let json = serde_json::to_string(&RoomEndReason::HostDisconnected).unwrap();
        assert_eq!(json, "\"host_disconnected\"");
        assert_eq!(RoomEndReason::InsufficientPlayers.to_string(), "insufficient_players");
    }
}
