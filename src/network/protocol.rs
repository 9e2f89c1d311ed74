//! Platform Protocol Types
//!
//! Requests sent to the matchmaking platform and notifications it delivers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::state::{Match, MatchId, SEAT_COUNT};

// =============================================================================
// CLIENT -> PLATFORM
// =============================================================================

/// Matchmaking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Minimum players.
    pub min_players: usize,
    /// Maximum players.
    pub max_players: usize,
    /// Players the platform should aim for.
    pub default_players: usize,
}

impl Default for MatchRequest {
    fn default() -> Self {
        Self {
            min_players: SEAT_COUNT,
            max_players: SEAT_COUNT,
            default_players: SEAT_COUNT,
        }
    }
}

/// How long a participant has to take their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum TurnTimeout {
    /// Let the platform apply its own default.
    #[default]
    PlatformDefault,
    /// Explicit timeout.
    After(Duration),
}

// =============================================================================
// PLATFORM -> CLIENT
// =============================================================================

/// Notifications delivered by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformNotification {
    /// Matchmaking found a match.
    MatchFound(Match),

    /// The player cancelled matchmaking.
    MatchmakingCancelled,

    /// Matchmaking failed.
    MatchmakingFailed(String),

    /// It became the local player's turn, or the match was updated.
    TurnReceived {
        /// Match snapshot.
        game_match: Match,
        /// The app was brought to the foreground by this event.
        became_active: bool,
    },

    /// The match ended on the platform.
    MatchEnded(MatchId),

    /// The local player asked to quit a match.
    QuitRequested(Match),

    /// The platform's view of the local player's authentication changed.
    AuthenticationChanged(bool),
}

impl PlatformNotification {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformNotification::MatchFound(_) => "match_found",
            PlatformNotification::MatchmakingCancelled => "matchmaking_cancelled",
            PlatformNotification::MatchmakingFailed(_) => "matchmaking_failed",
            PlatformNotification::TurnReceived { .. } => "turn_received",
            PlatformNotification::MatchEnded(_) => "match_ended",
            PlatformNotification::QuitRequested(_) => "quit_requested",
            PlatformNotification::AuthenticationChanged(_) => "authentication_changed",
        }
    }
}
