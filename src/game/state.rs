//! Match State Definitions
//!
//! Participants, seats and the match record shared with the platform.
//! A match always seats exactly three participants in a fixed order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of seats in every match.
pub const SEAT_COUNT: usize = 3;

/// Number of decided participants that ends a match.
pub const DECIDED_TO_END: usize = 2;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Opaque platform player identifier.
///
/// Implements Ord so it can key a BTreeMap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

// =============================================================================
// MATCH ID
// =============================================================================

/// Platform-assigned match identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub uuid::Uuid);

impl MatchId {
    /// Generate a fresh random identifier.
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// SEAT
// =============================================================================

/// Fixed seat position (0-2), independent of elimination status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct Seat(u8);

impl Seat {
    /// First seat, also the fallback when the current participant is unknown.
    pub const FIRST: Seat = Seat(0);

    /// Validate a raw seat index.
    pub fn new(index: usize) -> Result<Self, StateError> {
        if index < SEAT_COUNT {
            Ok(Self(index as u8))
        } else {
            Err(StateError::SeatOutOfRange(index))
        }
    }

    /// Raw index into the participant array.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Seat `steps` places further in rotation order.
    #[inline]
    pub fn offset(self, steps: usize) -> Seat {
        Seat(((self.index() + steps) % SEAT_COUNT) as u8)
    }

    /// All seats in order.
    pub fn all() -> [Seat; SEAT_COUNT] {
        [Seat(0), Seat(1), Seat(2)]
    }
}

impl TryFrom<u8> for Seat {
    type Error = StateError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Seat::new(index as usize)
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

// =============================================================================
// MATCH OUTCOME
// =============================================================================

/// Terminal status of a participant. `None` means still playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum MatchOutcome {
    /// Still playing
    #[default]
    None,
    /// Won the match
    Won,
    /// Lost (eliminated)
    Lost,
    /// Tied
    Tied,
    /// Quit voluntarily
    Quit,
}

impl MatchOutcome {
    /// Whether this outcome is decided (anything but `None`).
    #[inline]
    pub fn is_decided(self) -> bool {
        self != MatchOutcome::None
    }
}

// =============================================================================
// PARTICIPANT
// =============================================================================

/// One seat of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Player occupying the seat. `None` until matchmaking fills it.
    pub player_id: Option<PlayerId>,
    /// Match outcome for this participant
    pub outcome: MatchOutcome,
    /// Seat index, fixed for the match lifetime
    pub seat: Seat,
}

impl Participant {
    /// Create a still-playing participant.
    pub fn new(seat: Seat, player_id: Option<PlayerId>) -> Self {
        Self {
            player_id,
            outcome: MatchOutcome::None,
            seat,
        }
    }

    /// Is this participant still playing?
    #[inline]
    pub fn is_playing(&self) -> bool {
        !self.outcome.is_decided()
    }

    /// Is this participant the given player?
    #[inline]
    pub fn is_player(&self, id: &PlayerId) -> bool {
        self.player_id.as_ref() == Some(id)
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// A three-seat turn-based match as known to the platform.
///
/// Deserialization rejects participants whose seat does not match their
/// position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchRecord")]
pub struct Match {
    /// Match identifier
    pub id: MatchId,
    /// Participants in seat order
    participants: [Participant; SEAT_COUNT],
    /// Player the platform records as holding the turn
    pub current_participant: Option<PlayerId>,
    /// Opaque match data, owned by the game engine
    pub match_data: Vec<u8>,
    /// Opaque turn message, owned by the game engine
    pub message: Vec<u8>,
    /// When the platform created the match
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Create a match with the given players seated in order.
    ///
    /// The first player holds the opening turn.
    pub fn new(id: MatchId, players: [Option<PlayerId>; SEAT_COUNT]) -> Self {
        let participants = [
            Participant::new(Seat(0), players[0]),
            Participant::new(Seat(1), players[1]),
            Participant::new(Seat(2), players[2]),
        ];

        Self {
            id,
            current_participant: players[0],
            participants,
            match_data: Vec::new(),
            message: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Build a match from a participant list received from the platform.
    ///
    /// Rejects any list that does not hold exactly three participants.
    /// Seats are reassigned from list order.
    pub fn from_participants(
        id: MatchId,
        participants: Vec<Participant>,
    ) -> Result<Self, StateError> {
        let count = participants.len();
        let mut seated: [Participant; SEAT_COUNT] = participants
            .try_into()
            .map_err(|_| StateError::ParticipantCount(count))?;

        for (index, participant) in seated.iter_mut().enumerate() {
            participant.seat = Seat(index as u8);
        }

        Ok(Self {
            id,
            current_participant: seated[0].player_id,
            participants: seated,
            match_data: Vec::new(),
            message: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Participants in seat order.
    pub fn participants(&self) -> &[Participant; SEAT_COUNT] {
        &self.participants
    }

    /// Participant at a seat.
    pub fn participant(&self, seat: Seat) -> &Participant {
        &self.participants[seat.index()]
    }

    /// Set the outcome of the participant at a seat.
    pub fn set_outcome(&mut self, seat: Seat, outcome: MatchOutcome) {
        self.participants[seat.index()].outcome = outcome;
    }

    /// Seat held by a player, if that player is in this match.
    pub fn seat_of(&self, id: &PlayerId) -> Option<Seat> {
        self.participants
            .iter()
            .find(|p| p.is_player(id))
            .map(|p| p.seat)
    }

    /// Number of participants with a decided outcome.
    pub fn decided_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.outcome.is_decided())
            .count()
    }

    /// Number of participants still playing.
    pub fn playing_count(&self) -> usize {
        SEAT_COUNT - self.decided_count()
    }
}

/// Wire form of [`Match`], checked before use.
#[derive(Deserialize)]
struct MatchRecord {
    id: MatchId,
    participants: [Participant; SEAT_COUNT],
    current_participant: Option<PlayerId>,
    match_data: Vec<u8>,
    message: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRecord> for Match {
    type Error = StateError;

    fn try_from(record: MatchRecord) -> Result<Self, Self::Error> {
        for (index, participant) in record.participants.iter().enumerate() {
            if participant.seat.index() != index {
                return Err(StateError::SeatMismatch {
                    position: index,
                    seat: participant.seat.index(),
                });
            }
        }

        Ok(Self {
            id: record.id,
            participants: record.participants,
            current_participant: record.current_participant,
            match_data: record.match_data,
            message: record.message,
            created_at: record.created_at,
        })
    }
}

/// Errors building or addressing match state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Seat index outside 0..3.
    #[error("seat index {0} out of range")]
    SeatOutOfRange(usize),

    /// Participant list was not exactly three long.
    #[error("expected 3 participants, got {0}")]
    ParticipantCount(usize),

    /// Participant listed at one position claims another seat.
    #[error("participant at position {position} claims seat {seat}")]
    SeatMismatch {
        /// Position in the participant list
        position: usize,
        /// Seat the participant claims
        seat: usize,
    },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    #[test]
    fn test_seat_validation() {
        assert_eq!(Seat::new(0).unwrap(), Seat::FIRST);
        assert_eq!(Seat::new(2).unwrap().index(), 2);
        assert_eq!(Seat::new(3), Err(StateError::SeatOutOfRange(3)));
    }

    #[test]
    fn test_seat_offset_wraps() {
        let seat = Seat::new(2).unwrap();
        assert_eq!(seat.offset(1), Seat::FIRST);
        assert_eq!(seat.offset(2).index(), 1);
        assert_eq!(seat.offset(3), seat);
    }

    #[test]
    fn test_new_match_seats_in_order() {
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), Some(player(2)), None]);

        for (index, p) in m.participants().iter().enumerate() {
            assert_eq!(p.seat.index(), index);
            assert!(p.is_playing());
        }
        assert_eq!(m.current_participant, Some(player(1)));
        assert_eq!(m.seat_of(&player(2)), Some(Seat::new(1).unwrap()));
        assert_eq!(m.seat_of(&player(9)), None);
    }

    #[test]
    fn test_from_participants_rejects_wrong_count() {
        let seat = Seat::FIRST;
        let two = vec![Participant::new(seat, None); 2];
        let four = vec![Participant::new(seat, None); 4];

        assert_eq!(
            Match::from_participants(MatchId::new_v4(), two),
            Err(StateError::ParticipantCount(2))
        );
        assert_eq!(
            Match::from_participants(MatchId::new_v4(), four),
            Err(StateError::ParticipantCount(4))
        );
    }

    #[test]
    fn test_from_participants_reassigns_seats() {
        let list = vec![Participant::new(Seat::FIRST, Some(player(1))); 3];
        let m = Match::from_participants(MatchId::new_v4(), list).unwrap();

        let seats: Vec<usize> = m.participants().iter().map(|p| p.seat.index()).collect();
        assert_eq!(seats, vec![0, 1, 2]);
    }

    #[test]
    fn test_seat_deserialize_checks_range() {
        let seat: Seat = serde_json::from_str("2").unwrap();
        assert_eq!(seat.index(), 2);

        assert!(serde_json::from_str::<Seat>("7").is_err());
    }

    #[test]
    fn test_match_json_survives() {
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), None, Some(player(3))]);
        let json = serde_json::to_string(&m).unwrap();
        let back: Match = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_match_deserialize_rejects_bad_seats() {
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), Some(player(2)), Some(player(3))]);
        let mut value = serde_json::to_value(&m).unwrap();

        value["participants"][1]["seat"] = serde_json::json!(7);
        assert!(serde_json::from_value::<Match>(value.clone()).is_err());

        value["participants"][1]["seat"] = serde_json::json!(2);
        let err = serde_json::from_value::<Match>(value).unwrap_err();
        assert!(err.to_string().contains("position 1 claims seat 2"));
    }

    #[test]
    fn test_decided_count() {
        let mut m = Match::new(MatchId::new_v4(), [Some(player(1)), Some(player(2)), Some(player(3))]);
        assert_eq!(m.decided_count(), 0);

        m.set_outcome(Seat::FIRST, MatchOutcome::Lost);
        m.set_outcome(Seat::new(2).unwrap(), MatchOutcome::Quit);
        assert_eq!(m.decided_count(), 2);
        assert_eq!(m.playing_count(), 1);
    }
}
