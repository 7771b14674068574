#![allow(dead_code)]

use game_core::{Admission, Departure, EventLog, Game};
use game_types::{ClientEvent, GameError, PlayerId, ServerEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A game plus the log its events would land in, driven the way a room drives it.
pub struct TestTable {
    pub game: Game,
    pub seats: Vec<Admission>,
    pub log: EventLog,
    pub rng: StdRng,
}

impl TestTable {
    /// Seats every name (first one hosts) and marks them connected.
    pub fn lobby(names: &[&str]) -> Self {
        let (mut game, host) = Game::new("TABLE2".to_string(), names[0].to_string());
        let mut seats = vec![host];
        for name in &names[1..] {
            seats.push(game.admit(name.to_string(), None).unwrap());
        }
        for seat in &seats {
            game.set_connected(&seat.player_id, true);
        }

        Self {
            game,
            seats,
            log: EventLog::new(),
            rng: StdRng::seed_from_u64(2024),
        }
    }

    pub fn started(names: &[&str]) -> Self {
        let mut table = Self::lobby(names);
        let host = table.id(0);
        table.send(&host, ClientEvent::StartGame).unwrap();
        table
    }

    pub fn id(&self, seat: usize) -> PlayerId {
        self.seats[seat].player_id.clone()
    }

    pub fn current(&self) -> PlayerId {
        self.game.current_player().cloned().unwrap()
    }

    pub fn send(&mut self, player_id: &str, event: ClientEvent) -> Result<(), GameError> {
        let events = self.game.apply(player_id, event, &mut self.rng)?;
        for event in events {
            self.log.append(event);
        }
        Ok(())
    }

    pub fn depart(&mut self, player_id: &str) -> Departure {
        let departure = self.game.depart(player_id).unwrap();
        for event in departure.events.clone() {
            self.log.append(event);
        }
        departure
    }

    pub fn last_event(&self) -> Option<&ServerEvent> {
        self.log.history().last().map(|logged| &logged.event)
    }

    pub fn assert_index_valid(&self) {
        if !self.game.turn_order().is_empty() {
            assert!(self.game.current_player().is_some());
        }
    }
}
