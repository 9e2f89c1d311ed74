//! Local Player Identity
//!
//! The platform authenticates the local player; this crate only tracks
//! whether that happened and which participant is "us".

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::game::state::PlayerId;

/// Derive a deterministic PlayerId from a platform player identifier.
/// Uses SHA256 to create a 16-byte ID from the identifier string.
pub fn player_id_for(platform_id: &str) -> PlayerId {
    let mut hasher = Sha256::new();
    hasher.update(b"warfare-player:");
    hasher.update(platform_id.as_bytes());
    let hash = hasher.finalize();

    let mut id = [0u8; 16];
    id.copy_from_slice(&hash[..16]);
    PlayerId::new(id)
}

/// The player running this client.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    /// Platform identifier string.
    platform_id: String,
    /// Derived player id.
    player_id: PlayerId,
    /// Has the platform authenticated this player?
    authenticated: bool,
}

impl LocalPlayer {
    /// Create an unauthenticated local player.
    pub fn new(platform_id: impl Into<String>) -> Self {
        let platform_id = platform_id.into();
        let player_id = player_id_for(&platform_id);
        Self {
            platform_id,
            player_id,
            authenticated: false,
        }
    }

    /// Create an already authenticated local player.
    pub fn authenticated(platform_id: impl Into<String>) -> Self {
        let mut player = Self::new(platform_id);
        player.authenticated = true;
        player
    }

    /// Platform identifier string.
    pub fn platform_id(&self) -> &str {
        &self.platform_id
    }

    /// Derived player id.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Is the player authenticated?
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Apply an authentication-changed notification.
    ///
    /// Returns true if the state flipped.
    pub fn set_authenticated(&mut self, authenticated: bool) -> bool {
        if self.authenticated == authenticated {
            debug!(player = %self.player_id.short(), authenticated, "authentication unchanged");
            return false;
        }

        self.authenticated = authenticated;
        info!(player = %self.player_id.short(), authenticated, "local player authentication changed");
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_derivation() {
        let id1 = player_id_for("G:1234");
        let id2 = player_id_for("G:1234");

        // Same identifier should give same ID
        assert_eq!(id1, id2);

        // Different identifier should give different ID
        assert_ne!(id1, player_id_for("G:5678"));
    }

    #[test]
    fn test_new_player_unauthenticated() {
        let player = LocalPlayer::new("G:1234");
        assert!(!player.is_authenticated());
        assert_eq!(player.player_id(), player_id_for("G:1234"));
        assert_eq!(player.platform_id(), "G:1234");
    }

    #[test]
    fn test_authentication_changes() {
        let mut player = LocalPlayer::new("G:1234");

        assert!(player.set_authenticated(true));
        assert!(player.is_authenticated());

        // Repeated notification is a no-op
        assert!(!player.set_authenticated(true));

        assert!(player.set_authenticated(false));
        assert!(!player.is_authenticated());
    }
}
