//! Platform Transport Seam
//!
//! Async operations the matchmaking / turn-persistence platform provides.
//! Implementations own the wire; the controller only sees this trait.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::game::state::{Match, MatchOutcome, Participant};
use crate::network::protocol::{MatchRequest, TurnTimeout};

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The platform did not answer in time.
    #[error("platform call timed out after {0:?}")]
    Timeout(Duration),

    /// The player cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The platform reported a failure.
    #[error("platform error: {0}")]
    Failed(String),
}

/// The external matchmaking and turn-persistence service.
#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// Present matchmaking and wait for a match.
    async fn find_match(&self, request: MatchRequest) -> Result<Match, TransportError>;

    /// Load the stored match-data blob.
    async fn load_match_data(&self, game_match: &Match) -> Result<Vec<u8>, TransportError>;

    /// Save match data under the current turn without passing it.
    async fn save_turn_data(&self, game_match: &Match, data: Vec<u8>) -> Result<(), TransportError>;

    /// End the current turn and hand it to `next`.
    async fn end_turn(
        &self,
        game_match: &Match,
        next: Vec<Participant>,
        timeout: TurnTimeout,
        data: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Close the match with its final data.
    async fn end_match(&self, game_match: &Match, data: Vec<u8>) -> Result<(), TransportError>;

    /// Quit the match in turn with `outcome`, handing the turn to `next`.
    async fn quit_match(
        &self,
        game_match: &Match,
        outcome: MatchOutcome,
        next: Vec<Participant>,
        timeout: TurnTimeout,
        data: Vec<u8>,
    ) -> Result<(), TransportError>;
}
