//! # Warfare Match Client
//!
//! Turn rotation and match lifecycle for a three-player turn-based strategy
//! game played over an asynchronous matchmaking platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WARFARE MATCH                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Match records and rules (no I/O)          │
//! │  ├── state.rs    - Seats, participants, match record         │
//! │  ├── rotation.rs - Next-participant and quit ordering        │
//! │  ├── unit.rs     - Unit types, actions, dictionary codec     │
//! │  ├── engine.rs   - Board simulation seam                     │
//! │  └── events.rs   - Lifecycle events                          │
//! │                                                              │
//! │  network/        - Platform side (async)                     │
//! │  ├── transport.rs- Platform operations trait                 │
//! │  ├── lifecycle.rs- Match controller                          │
//! │  ├── service.rs  - Controller task and handle                │
//! │  ├── auth.rs     - Local player identity                     │
//! │  ├── protocol.rs - Requests and notifications                │
//! │  └── loopback.rs - In-memory platform                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Turn Order
//!
//! After the participant in seat `c` acts, the turn goes to seats
//! `(c+1)%3, (c+2)%3, c`. A match ends once exactly two of its three
//! participants have a decided outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::rotation::{next_participants, next_participants_from_current, quit_order};
pub use game::state::{Match, MatchId, MatchOutcome, Participant, PlayerId, Seat};
pub use game::unit::{Unit, UnitAction, UnitType};
pub use network::lifecycle::{ControllerConfig, LifecycleState, MatchController, MatchError};
pub use network::service::{MatchHandle, MatchService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seats per match
pub const PLAYERS_PER_MATCH: usize = game::state::SEAT_COUNT;
