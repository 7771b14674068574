use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound queue of one player's socket.
///
/// The session's writer task owns the socket sink and drains this queue, so
/// frames from concurrent senders never interleave and a slow peer never
/// blocks whoever is sending to it.
#[derive(Debug, Clone)]
pub struct PlayerConnection {
    pub id: ConnectionId,
    sender: mpsc::UnboundedSender<Message>,
}

impl PlayerConnection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }

    pub fn send_message(&self, message: Message) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    /// Queues a close frame; the writer task stops after sending it.
    pub fn close(&self) {
        let _ = self.sender.send(Message::close());
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
