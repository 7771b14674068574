use game_types::{
    Category, ClientEvent, Dice, GameError, GameEvent, GamePhase, MAX_PLAYERS, Passthrough,
    PlayerId, PlayerSummary, ROLLS_PER_TURN, RoomCode, RoomEndReason, RoomError, STARTING_DICE,
    ServerEvent, UNROLLED_DICE,
};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::debug;

use crate::{Scorecard, generate_player_id, generate_token, roll_dice, tally};

const VIEWER_MESSAGE: &str = "You are watching this game. You can rejoin as a player next game.";

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    token: String,
    /// Join order, used to list the roster consistently.
    seat: u64,
    pub scorecard: Scorecard,
    pub ready: bool,
    pub is_viewer: bool,
    pub connected: bool,
    pub last_seen: Instant,
}

impl Player {
    fn new(name: String, seat: u64, is_viewer: bool) -> Self {
        Self {
            id: generate_player_id(),
            name,
            token: generate_token(&mut rand::rng()),
            seat,
            scorecard: Scorecard::new(),
            ready: false,
            is_viewer,
            connected: false,
            last_seen: Instant::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Result of a successful join: the seat's credentials and role.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub player_id: PlayerId,
    pub token: String,
    pub is_viewer: bool,
    pub rejoined: bool,
}

/// What happened when a player's connection went away.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub player_id: PlayerId,
    pub player_name: String,
    pub was_host: bool,
    /// Game events caused by the departure, in order.
    pub events: Vec<ServerEvent>,
    pub room_end: Option<RoomEndReason>,
}

impl Departure {
    pub fn notice(&self) -> ServerEvent {
        ServerEvent::PlayerLeft {
            player_id: self.player_id.clone(),
            player_name: self.player_name.clone(),
            is_host: self.was_host,
        }
    }
}

/// Roster, turn sequence and table state of one room.
#[derive(Debug)]
pub struct Game {
    code: RoomCode,
    host_id: PlayerId,
    players: HashMap<PlayerId, Player>,
    turn_order: Vec<PlayerId>,
    current: usize,
    dice: Dice,
    rolls_left: u8,
    phase: GamePhase,
    next_seat: u64,
}

impl Game {
    /// Opens a lobby with `host_name` as its only member and permanent host.
    pub fn new(code: RoomCode, host_name: String) -> (Self, Admission) {
        let host = Player::new(host_name, 0, false);
        let admission = Admission {
            player_id: host.id.clone(),
            token: host.token.clone(),
            is_viewer: false,
            rejoined: false,
        };

        let game = Self {
            code,
            host_id: host.id.clone(),
            turn_order: vec![host.id.clone()],
            players: HashMap::from([(host.id.clone(), host)]),
            current: 0,
            dice: STARTING_DICE,
            rolls_left: ROLLS_PER_TURN,
            phase: GamePhase::Lobby,
            next_seat: 1,
        };

        (game, admission)
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.phase.has_started()
    }

    pub fn dice(&self) -> Dice {
        self.dice
    }

    pub fn rolls_left(&self) -> u8 {
        self.rolls_left
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    pub fn current_player(&self) -> Option<&PlayerId> {
        self.turn_order.get(self.current)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn roster_len(&self) -> usize {
        self.players.len()
    }

    /// Roster in join order.
    pub fn roster(&self) -> Vec<&Player> {
        let mut roster: Vec<&Player> = self.players.values().collect();
        roster.sort_by_key(|p| p.seat);
        roster
    }

    /// Non-viewers holding a live connection, in turn order.
    pub fn connected_active_players(&self) -> Vec<&PlayerId> {
        self.turn_order
            .iter()
            .filter(|id| {
                self.players
                    .get(*id)
                    .is_some_and(|p| p.connected && !p.is_viewer)
            })
            .collect()
    }

    pub fn authenticate(&self, player_id: &str, token: &str) -> bool {
        self.players
            .get(player_id)
            .is_some_and(|p| !token.is_empty() && p.token == token)
    }

    /// Resumes a seat when the credentials match, otherwise seats a new
    /// player (a viewer once the game has started).
    pub fn admit(
        &mut self,
        name: String,
        credentials: Option<(&str, &str)>,
    ) -> Result<Admission, RoomError> {
        if let Some((player_id, token)) = credentials {
            if self.authenticate(player_id, token) {
                let in_sequence = self.turn_order.iter().any(|id| id == player_id);
                let started = self.has_started();
                if let Some(player) = self.players.get_mut(player_id) {
                    player.name = name;
                    player.touch();
                    player.is_viewer = started || !in_sequence;
                    return Ok(Admission {
                        player_id: player.id.clone(),
                        token: player.token.clone(),
                        is_viewer: player.is_viewer,
                        rejoined: true,
                    });
                }
            }
        }

        let is_viewer = self.has_started();
        if !is_viewer && self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        let player = Player::new(name, self.next_seat, is_viewer);
        self.next_seat += 1;
        let admission = Admission {
            player_id: player.id.clone(),
            token: player.token.clone(),
            is_viewer,
            rejoined: false,
        };
        if !is_viewer {
            self.turn_order.push(player.id.clone());
        }
        self.players.insert(player.id.clone(), player);

        Ok(admission)
    }

    pub fn set_connected(&mut self, player_id: &str, connected: bool) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.connected = connected;
            player.touch();
        }
    }

    pub fn touch(&mut self, player_id: &str) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.touch();
        }
    }

    /// Applies one inbound event from `player_id`. Every returned event is
    /// meant for the room's log, in order.
    pub fn apply<R: Rng>(
        &mut self,
        player_id: &str,
        event: ClientEvent,
        rng: &mut R,
    ) -> Result<Vec<ServerEvent>, GameError> {
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| GameError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
        if player.is_viewer {
            return Err(GameError::ViewerAction);
        }

        match event {
            ClientEvent::PlayerReady { ready } => self.set_ready(player_id, ready),
            ClientEvent::StartGame => self.start(player_id, rng),
            ClientEvent::RequestRoll { held_indices } => self.roll(player_id, &held_indices, rng),
            ClientEvent::CategoryChosen { category, score } => {
                self.choose_category(player_id, category, score)
            }
            ClientEvent::RequestEndTurn => self.end_turn(player_id),
            ClientEvent::ChatMessage(fields) => Ok(self.chat(player_id, fields)),
        }
    }

    pub fn set_ready(
        &mut self,
        player_id: &str,
        ready: bool,
    ) -> Result<Vec<ServerEvent>, GameError> {
        if self.has_started() {
            return Err(GameError::AlreadyStarted);
        }
        let player = self.player_mut(player_id)?;
        player.ready = ready;

        Ok(vec![ServerEvent::PlayerReady {
            player_id: player_id.to_string(),
            ready,
        }])
    }

    /// Shuffles the active roster into a turn sequence and opens the first turn.
    pub fn start<R: Rng>(
        &mut self,
        requester: &str,
        rng: &mut R,
    ) -> Result<Vec<ServerEvent>, GameError> {
        if requester != self.host_id {
            return Err(GameError::NotHost);
        }
        if self.has_started() {
            return Err(GameError::AlreadyStarted);
        }

        let mut order: Vec<PlayerId> = self
            .roster()
            .into_iter()
            .filter(|p| !p.is_viewer)
            .map(|p| p.id.clone())
            .collect();
        order.shuffle(rng);

        for player in self.players.values_mut() {
            player.scorecard.clear();
        }
        self.turn_order = order;
        self.current = 0;
        self.dice = STARTING_DICE;
        self.rolls_left = ROLLS_PER_TURN;
        self.phase = GamePhase::InProgress;
        debug!(room_code = %self.code, players = self.turn_order.len(), "Game started");

        let player_list = self.summaries();
        Ok(vec![ServerEvent::GameStarted {
            players: keyed(&player_list),
            player_list,
            turn_order: self.turn_order.clone(),
            current_player: self.current_player().cloned().unwrap_or_default(),
        }])
    }

    pub fn roll<R: Rng>(
        &mut self,
        player_id: &str,
        held_indices: &[usize],
        rng: &mut R,
    ) -> Result<Vec<ServerEvent>, GameError> {
        self.ensure_turn_of(player_id)?;
        if self.rolls_left == 0 {
            return Err(GameError::NoRollsLeft);
        }

        self.dice = roll_dice(self.dice, held_indices, rng);
        self.rolls_left -= 1;

        Ok(vec![ServerEvent::RollResult {
            player_id: player_id.to_string(),
            dice: self.dice,
            rolls_left: self.rolls_left,
        }])
    }

    /// Records a score, passes the turn and checks whether the game is over.
    pub fn choose_category(
        &mut self,
        player_id: &str,
        category: Category,
        score: i32,
    ) -> Result<Vec<ServerEvent>, GameError> {
        self.ensure_turn_of(player_id)?;
        self.player_mut(player_id)?
            .scorecard
            .record(category, score)?;

        let mut events = vec![ServerEvent::ScoreUpdate {
            player_id: player_id.to_string(),
            category,
            score,
        }];
        events.extend(self.advance_turn());
        events.extend(self.finish_if_complete());
        Ok(events)
    }

    pub fn end_turn(&mut self, player_id: &str) -> Result<Vec<ServerEvent>, GameError> {
        self.ensure_turn_of(player_id)?;
        Ok(self.advance_turn().into_iter().collect())
    }

    /// Forwards chat fields, stamped with the sender's id.
    pub fn chat(&mut self, player_id: &str, mut fields: Passthrough) -> Vec<ServerEvent> {
        fields.remove("type");
        fields.remove("id");
        fields.insert("player_id".to_string(), Value::from(player_id));
        vec![ServerEvent::ChatMessage(fields)]
    }

    /// Applies the leave policy for `player_id`. Before the start the seat is
    /// dropped; afterwards the player stays on the roster as a viewer.
    pub fn depart(&mut self, player_id: &str) -> Option<Departure> {
        let started = self.has_started();
        let player_name = if started {
            let player = self.players.get_mut(player_id)?;
            player.connected = false;
            player.is_viewer = true;
            player.touch();
            player.name.clone()
        } else {
            self.players.remove(player_id)?.name
        };
        let was_host = player_id == self.host_id;
        let was_current = self.remove_from_sequence(player_id);

        let mut events = Vec::new();
        if self.phase == GamePhase::InProgress {
            if was_current {
                if let Some(next) = self.current_player().cloned() {
                    self.rolls_left = ROLLS_PER_TURN;
                    self.dice = UNROLLED_DICE;
                    events.push(ServerEvent::TurnChanged {
                        current_player: next,
                        rolls_left: self.rolls_left,
                    });
                }
            }
            events.extend(self.finish_if_complete());
        }

        let room_end = if started && was_host {
            Some(RoomEndReason::HostDisconnected)
        } else if started && self.connected_active_players().len() == 1 {
            Some(RoomEndReason::InsufficientPlayers)
        } else {
            None
        };

        Some(Departure {
            player_id: player_id.to_string(),
            player_name,
            was_host,
            events,
            room_end,
        })
    }

    /// `PLAYER_JOINED` for one roster member.
    pub fn presence_of(&self, player_id: &str) -> Option<ServerEvent> {
        self.players.get(player_id).map(|p| ServerEvent::PlayerJoined {
            player_id: p.id.clone(),
            name: p.name.clone(),
            is_host: p.id == self.host_id,
            is_viewer: p.is_viewer,
        })
    }

    /// `PLAYER_JOINED` for every roster member, in join order.
    pub fn presence(&self) -> Vec<ServerEvent> {
        self.roster()
            .into_iter()
            .filter_map(|p| self.presence_of(&p.id))
            .collect()
    }

    pub fn viewer_notice(&self, player_id: &str) -> ServerEvent {
        ServerEvent::ViewerMode {
            player_id: player_id.to_string(),
            message: VIEWER_MESSAGE.to_string(),
        }
    }

    /// Full table state plus the replayed history, for late viewers.
    pub fn snapshot(&self, history: &[GameEvent]) -> ServerEvent {
        let player_list = self.summaries();
        ServerEvent::GameState {
            players: keyed(&player_list),
            player_list,
            turn_order: self.turn_order.clone(),
            current_player: self.current_player().cloned(),
            dice: self.dice,
            rolls_left: self.rolls_left,
            event_history: history.to_vec(),
        }
    }

    fn summaries(&self) -> Vec<PlayerSummary> {
        self.roster()
            .into_iter()
            .map(|p| PlayerSummary {
                player_id: p.id.clone(),
                name: p.name.clone(),
                is_host: p.id == self.host_id,
                is_viewer: p.is_viewer,
                ready: p.ready,
                scores: p.scorecard.scores().clone(),
                total_score: p.scorecard.total(),
            })
            .collect()
    }

    fn player_mut(&mut self, player_id: &str) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(player_id)
            .ok_or_else(|| GameError::UnknownPlayer {
                player_id: player_id.to_string(),
            })
    }

    fn ensure_turn_of(&self, player_id: &str) -> Result<(), GameError> {
        if self.phase != GamePhase::InProgress {
            return Err(GameError::NotInProgress);
        }
        match self.current_player() {
            Some(current) if current == player_id => Ok(()),
            _ => Err(GameError::NotYourTurn),
        }
    }

    fn advance_turn(&mut self) -> Option<ServerEvent> {
        if self.turn_order.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.turn_order.len();
        self.rolls_left = ROLLS_PER_TURN;
        self.dice = UNROLLED_DICE;

        Some(ServerEvent::TurnChanged {
            current_player: self.turn_order[self.current].clone(),
            rolls_left: self.rolls_left,
        })
    }

    /// Ends the game once every player in the sequence has a full scorecard.
    fn finish_if_complete(&mut self) -> Option<ServerEvent> {
        if self.phase != GamePhase::InProgress || self.turn_order.is_empty() {
            return None;
        }
        let complete = self.turn_order.iter().all(|id| {
            self.players
                .get(id)
                .is_some_and(|p| p.scorecard.is_complete())
        });
        if !complete {
            return None;
        }

        let end = tally(self.turn_order.iter().filter_map(|id| {
            self.players
                .get(id)
                .map(|p| (&p.id, p.name.as_str(), &p.scorecard))
        }))?;
        self.phase = GamePhase::Ended;
        debug!(room_code = %self.code, "Game finished");
        Some(end)
    }

    /// Drops `player_id` from the turn sequence and keeps the index in range.
    /// Returns whether it was that player's turn.
    fn remove_from_sequence(&mut self, player_id: &str) -> bool {
        let Some(position) = self.turn_order.iter().position(|id| id == player_id) else {
            return false;
        };
        let was_current = position == self.current;
        self.turn_order.remove(position);

        if self.turn_order.is_empty() {
            self.current = 0;
        } else if was_current {
            self.current %= self.turn_order.len();
        } else if position < self.current {
            self.current -= 1;
        }
        was_current
    }
}

fn keyed(summaries: &[PlayerSummary]) -> BTreeMap<PlayerId, PlayerSummary> {
    summaries
        .iter()
        .map(|s| (s.player_id.clone(), s.clone()))
        .collect()
}
