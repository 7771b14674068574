use game_types::{EventId, GameEvent, ServerEvent};

/// Append-only history of one room. Ids start at 1 and have no gaps.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: ServerEvent) -> &GameEvent {
        let id = self.last_id() + 1;
        self.events.push(GameEvent { id, event });
        &self.events[self.events.len() - 1]
    }

    /// Id of the newest event, or 0 for an empty log.
    pub fn last_id(&self) -> EventId {
        self.events.len() as EventId
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn history(&self) -> &[GameEvent] {
        &self.events
    }
}
