//! Match Events
//!
//! Lifecycle events broadcast by the controller to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::game::state::{MatchId, Participant, Seat};

/// Why the matchmaking flow was dismissed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissReason {
    /// The player closed the matchmaking flow
    Cancelled,
    /// The platform reported a failure
    Failed(String),
}

/// Lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Matchmaking flow presented
    SearchStarted,

    /// Matchmaking flow closed without a match
    MatchmakingDismissed {
        /// Why the flow closed
        reason: DismissReason,
    },

    /// Match data decoded by the engine
    MatchLoaded {
        /// Match concerned
        match_id: MatchId,
        /// The app was brought to the foreground by this event
        became_active: bool,
    },

    /// Turn data saved without passing the turn
    MatchDataSaved {
        /// Match concerned
        match_id: MatchId,
    },

    /// Turn passed to the next participants
    TurnAdvanced {
        /// Match concerned
        match_id: MatchId,
        /// Participant order handed to the platform
        next: Vec<Participant>,
    },

    /// Participant marked as lost
    ParticipantEliminated {
        /// Match concerned
        match_id: MatchId,
        /// Seat of the eliminated participant
        seat: Seat,
    },

    /// Match closed with its final data
    MatchEnded {
        /// Match concerned
        match_id: MatchId,
    },

    /// Local player quit a match
    QuitSent {
        /// Match concerned
        match_id: MatchId,
        /// Participant order handed to the platform
        next: Vec<Participant>,
    },

    /// Active match dereferenced
    MatchReleased {
        /// Match concerned
        match_id: MatchId,
    },
}

impl MatchEvent {
    /// Match this event concerns, if any.
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            MatchEvent::SearchStarted | MatchEvent::MatchmakingDismissed { .. } => None,
            MatchEvent::MatchLoaded { match_id, .. }
            | MatchEvent::MatchDataSaved { match_id }
            | MatchEvent::TurnAdvanced { match_id, .. }
            | MatchEvent::ParticipantEliminated { match_id, .. }
            | MatchEvent::MatchEnded { match_id }
            | MatchEvent::QuitSent { match_id, .. }
            | MatchEvent::MatchReleased { match_id } => Some(*match_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_match_id() {
        let id = MatchId::new_v4();
        assert_eq!(MatchEvent::MatchEnded { match_id: id }.match_id(), Some(id));
        assert_eq!(MatchEvent::SearchStarted.match_id(), None);
    }

    #[test]
    fn test_event_serializes() {
        let event = MatchEvent::MatchmakingDismissed {
            reason: DismissReason::Failed("offline".into()),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: MatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
