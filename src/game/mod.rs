//! Game Logic Module
//!
//! Match records and the pure rules over them. No I/O happens here.
//!
//! ## Module Structure
//!
//! - `state`: Seats, participants and the match record
//! - `rotation`: Turn order and termination rules
//! - `unit`: Unit types, actions and their dictionary encoding
//! - `engine`: Seam to the board simulation
//! - `events`: Lifecycle events for the presentation layer

pub mod engine;
pub mod events;
pub mod rotation;
pub mod state;
pub mod unit;

// Re-export key types
pub use engine::{EngineError, GameEngine, SnapshotEngine};
pub use events::{DismissReason, MatchEvent};
pub use state::{Match, MatchId, MatchOutcome, Participant, PlayerId, Seat, StateError};
pub use unit::{Unit, UnitAction, UnitError, UnitType};
