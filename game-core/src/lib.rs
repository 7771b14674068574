pub mod dice;
pub mod game_events;
pub mod game_state;
pub mod identity;
pub mod scoring;

// Re-export main components
pub use dice::*;
pub use game_events::*;
pub use game_state::*;
pub use identity::*;
pub use scoring::*;
