//! Game Engine Seam
//!
//! The board simulation lives outside this crate. The lifecycle controller
//! only moves its opaque blobs between the engine and the platform.

use thiserror::Error;

/// Board-state collaborator that owns the match-data format.
pub trait GameEngine: Send {
    /// Apply a received match-data blob to the game state.
    fn decode(&mut self, data: &[u8]) -> Result<(), EngineError>;

    /// Serialize the current game state.
    fn encode_match_data(&self) -> Vec<u8>;

    /// Serialize a human-readable summary of the turn just played.
    fn encode_turn_message(&self) -> Vec<u8>;
}

/// Errors reported by the game engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Blob could not be applied.
    #[error("match data rejected: {0}")]
    Rejected(String),
}

/// Engine that keeps the last decoded blob verbatim.
///
/// Useful when the match data is itself the full game state, and as a
/// stand-in engine in tests.
#[derive(Debug, Clone, Default)]
pub struct SnapshotEngine {
    /// Current game state blob
    pub state: Vec<u8>,
    /// Summary of the last turn
    pub turn_summary: String,
    /// Number of successful decodes
    pub decode_count: usize,
}

impl SnapshotEngine {
    /// Create an engine holding the given state.
    pub fn with_state(state: impl Into<Vec<u8>>) -> Self {
        Self {
            state: state.into(),
            ..Default::default()
        }
    }
}

impl GameEngine for SnapshotEngine {
    fn decode(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.state = data.to_vec();
        self.decode_count += 1;
        Ok(())
    }

    fn encode_match_data(&self) -> Vec<u8> {
        self.state.clone()
    }

    fn encode_turn_message(&self) -> Vec<u8> {
        self.turn_summary.as_bytes().to_vec()
    }
}
