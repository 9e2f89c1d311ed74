//! In-Memory Platform
//!
//! A [`MatchTransport`] that keeps matches in process. Every call is
//! recorded, any operation can be scripted to fail or stall once, and
//! subscribed players receive the notifications a real platform would send
//! them (turn received, match ended).
//!
//! Clones share state, so a test can keep one handle while the controller
//! owns another.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::state::{Match, MatchId, MatchOutcome, Participant, PlayerId};
use crate::network::protocol::{MatchRequest, PlatformNotification, TurnTimeout};
use crate::network::transport::{MatchTransport, TransportError};

/// Transport operation, for scripting and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportOp {
    /// `find_match`
    FindMatch,
    /// `load_match_data`
    LoadMatchData,
    /// `save_turn_data`
    SaveTurnData,
    /// `end_turn`
    EndTurn,
    /// `end_match`
    EndMatch,
    /// `quit_match`
    QuitMatch,
}

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// Matchmaking requested.
    FindMatch(MatchRequest),
    /// Match data loaded.
    LoadMatchData {
        /// Match concerned
        match_id: MatchId,
    },
    /// Turn data saved.
    SaveTurnData {
        /// Match concerned
        match_id: MatchId,
        /// Match data sent
        data: Vec<u8>,
    },
    /// Turn ended.
    EndTurn {
        /// Match concerned
        match_id: MatchId,
        /// Participant order sent
        next: Vec<Participant>,
        /// Turn timeout sent
        timeout: TurnTimeout,
        /// Match data sent
        data: Vec<u8>,
    },
    /// Match ended.
    EndMatch {
        /// Match concerned
        match_id: MatchId,
        /// Match data sent
        data: Vec<u8>,
    },
    /// Participant quit.
    QuitMatch {
        /// Match concerned
        match_id: MatchId,
        /// Outcome of the leaving participant
        outcome: MatchOutcome,
        /// Participant order sent
        next: Vec<Participant>,
        /// Turn timeout sent
        timeout: TurnTimeout,
        /// Match data sent
        data: Vec<u8>,
    },
}

impl TransportCall {
    /// Operation this call belongs to.
    pub fn op(&self) -> TransportOp {
        match self {
            TransportCall::FindMatch(_) => TransportOp::FindMatch,
            TransportCall::LoadMatchData { .. } => TransportOp::LoadMatchData,
            TransportCall::SaveTurnData { .. } => TransportOp::SaveTurnData,
            TransportCall::EndTurn { .. } => TransportOp::EndTurn,
            TransportCall::EndMatch { .. } => TransportOp::EndMatch,
            TransportCall::QuitMatch { .. } => TransportOp::QuitMatch,
        }
    }
}

/// Scripted behavior for the next call of an operation.
#[derive(Debug, Clone)]
enum Script {
    Fail(TransportError),
    Stall,
}

#[derive(Default)]
struct LoopbackState {
    /// Authoritative copy of every match.
    matches: BTreeMap<MatchId, Match>,
    /// Results handed out by `find_match`, in order.
    pending_matches: VecDeque<Result<Match, TransportError>>,
    /// One-shot scripts per operation.
    scripts: BTreeMap<TransportOp, Script>,
    /// Call log.
    calls: Vec<TransportCall>,
    /// Notification channel per player.
    subscribers: BTreeMap<PlayerId, mpsc::UnboundedSender<PlatformNotification>>,
}

impl LoopbackState {
    fn notify(&mut self, player: &PlayerId, notification: PlatformNotification) {
        if let Some(tx) = self.subscribers.get(player) {
            if tx.send(notification).is_err() {
                debug!(player = %player.short(), "subscriber gone");
                self.subscribers.remove(player);
            }
        }
    }

    fn stored_mut(&mut self, id: &MatchId) -> Result<&mut Match, TransportError> {
        self.matches
            .get_mut(id)
            .ok_or_else(|| TransportError::Failed(format!("unknown match {}", id)))
    }
}

/// In-process matchmaking platform.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    inner: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        // A panicking test thread must not hide the call log from the others.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a match on the platform.
    pub fn insert_match(&self, game_match: Match) {
        self.lock().matches.insert(game_match.id, game_match);
    }

    /// Platform copy of a match.
    pub fn stored_match(&self, id: &MatchId) -> Option<Match> {
        self.lock().matches.get(id).cloned()
    }

    /// Queue the result of the next `find_match`. Found matches are stored.
    pub fn queue_find_result(&self, result: Result<Match, TransportError>) {
        let mut state = self.lock();
        if let Ok(game_match) = &result {
            state.matches.insert(game_match.id, game_match.clone());
        }
        state.pending_matches.push_back(result);
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: TransportOp, error: TransportError) {
        self.lock().scripts.insert(op, Script::Fail(error));
    }

    /// Make the next call of `op` never complete.
    pub fn stall_next(&self, op: TransportOp) {
        self.lock().scripts.insert(op, Script::Stall);
    }

    /// Receive the notifications addressed to `player`.
    pub fn subscribe(&self, player: PlayerId) -> mpsc::UnboundedReceiver<PlatformNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.insert(player, tx);
        rx
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of one operation.
    pub fn count(&self, op: TransportOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Record the call, then apply any script for its operation.
    async fn begin(&self, call: TransportCall) -> Result<(), TransportError> {
        let op = call.op();
        let script = {
            let mut state = self.lock();
            state.calls.push(call);
            state.scripts.remove(&op)
        };

        match script {
            None => Ok(()),
            Some(Script::Fail(error)) => {
                warn!(?op, %error, "scripted failure");
                Err(error)
            }
            Some(Script::Stall) => {
                debug!(?op, "stalling call");
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MatchTransport for LoopbackTransport {
    async fn find_match(&self, request: MatchRequest) -> Result<Match, TransportError> {
        self.begin(TransportCall::FindMatch(request)).await?;

        self.lock()
            .pending_matches
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Failed("no opponents available".into())))
    }

    async fn load_match_data(&self, game_match: &Match) -> Result<Vec<u8>, TransportError> {
        self.begin(TransportCall::LoadMatchData { match_id: game_match.id }).await?;

        let mut state = self.lock();
        let stored = state.stored_mut(&game_match.id)?;
        Ok(stored.match_data.clone())
    }

    async fn save_turn_data(&self, game_match: &Match, data: Vec<u8>) -> Result<(), TransportError> {
        self.begin(TransportCall::SaveTurnData {
            match_id: game_match.id,
            data: data.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored = state.stored_mut(&game_match.id)?;
        // Outcomes set by the current participant travel with the save.
        *stored = game_match.clone();
        stored.match_data = data;
        Ok(())
    }

    async fn end_turn(
        &self,
        game_match: &Match,
        next: Vec<Participant>,
        timeout: TurnTimeout,
        data: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.begin(TransportCall::EndTurn {
            match_id: game_match.id,
            next: next.clone(),
            timeout,
            data: data.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored = state.stored_mut(&game_match.id)?;
        *stored = game_match.clone();
        stored.match_data = data;
        stored.current_participant = next.first().and_then(|p| p.player_id);

        let snapshot = stored.clone();
        if let Some(player) = snapshot.current_participant {
            state.notify(
                &player,
                PlatformNotification::TurnReceived {
                    game_match: snapshot,
                    became_active: false,
                },
            );
        }
        Ok(())
    }

    async fn end_match(&self, game_match: &Match, data: Vec<u8>) -> Result<(), TransportError> {
        self.begin(TransportCall::EndMatch {
            match_id: game_match.id,
            data: data.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored = state.stored_mut(&game_match.id)?;
        *stored = game_match.clone();
        stored.match_data = data;
        stored.current_participant = None;

        let players: Vec<PlayerId> = stored
            .participants()
            .iter()
            .filter_map(|p| p.player_id)
            .collect();
        for player in players {
            state.notify(&player, PlatformNotification::MatchEnded(game_match.id));
        }
        Ok(())
    }

    async fn quit_match(
        &self,
        game_match: &Match,
        outcome: MatchOutcome,
        next: Vec<Participant>,
        timeout: TurnTimeout,
        data: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.begin(TransportCall::QuitMatch {
            match_id: game_match.id,
            outcome,
            next: next.clone(),
            timeout,
            data: data.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored = state.stored_mut(&game_match.id)?;
        // Quitting in turn: the current participant is the one leaving.
        let leaving = game_match
            .current_participant
            .and_then(|current| stored.seat_of(&current));
        if let Some(seat) = leaving {
            stored.set_outcome(seat, outcome);
        }
        stored.match_data = data;
        stored.current_participant = next.first().and_then(|p| p.player_id);
        Ok(())
    }
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

    fn stored(transport: &LoopbackTransport) -> Match {
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), Some(player(2)), Some(player(3))]);
        transport.insert_match(m.clone());
        m
    }

    #[tokio::test]
    async fn test_find_match_hands_out_queued_results() {
        let transport = LoopbackTransport::new();
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), None, None]);
        transport.queue_find_result(Ok(m.clone()));
        transport.queue_find_result(Err(TransportError::Cancelled));

        let found = transport.find_match(MatchRequest::default()).await.unwrap();
        assert_eq!(found.id, m.id);
        assert!(transport.stored_match(&m.id).is_some());

        let second = transport.find_match(MatchRequest::default()).await;
        assert_eq!(second, Err(TransportError::Cancelled));

        let third = transport.find_match(MatchRequest::default()).await;
        assert!(matches!(third, Err(TransportError::Failed(_))));
        assert_eq!(transport.count(TransportOp::FindMatch), 3);
    }

    #[tokio::test]
    async fn test_end_turn_notifies_next_player() {
        let transport = LoopbackTransport::new();
        let m = stored(&transport);
        let mut inbox = transport.subscribe(player(2));

        let next = crate::game::rotation::next_participants_from_current(&m).to_vec();
        transport
            .end_turn(&m, next, TurnTimeout::PlatformDefault, b"t1".to_vec())
            .await
            .unwrap();

        let platform_copy = transport.stored_match(&m.id).unwrap();
        assert_eq!(platform_copy.current_participant, Some(player(2)));
        assert_eq!(platform_copy.match_data, b"t1");

        match inbox.try_recv().unwrap() {
            PlatformNotification::TurnReceived { game_match, became_active } => {
                assert_eq!(game_match.id, m.id);
                assert!(!became_active);
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scripted_failure_is_one_shot() {
        let transport = LoopbackTransport::new();
        let m = stored(&transport);
        transport.fail_next(TransportOp::SaveTurnData, TransportError::Failed("offline".into()));

        let first = transport.save_turn_data(&m, b"a".to_vec()).await;
        assert_eq!(first, Err(TransportError::Failed("offline".into())));

        transport.save_turn_data(&m, b"b".to_vec()).await.unwrap();
        assert_eq!(transport.stored_match(&m.id).unwrap().match_data, b"b");
        assert_eq!(transport.count(TransportOp::SaveTurnData), 2);
    }

    #[tokio::test]
    async fn test_end_match_notifies_everyone() {
        let transport = LoopbackTransport::new();
        let m = stored(&transport);
        let mut inboxes: Vec<_> = (1..=3).map(|n| transport.subscribe(player(n))).collect();

        transport.end_match(&m, b"final".to_vec()).await.unwrap();

        for inbox in &mut inboxes {
            assert_eq!(inbox.try_recv().unwrap(), PlatformNotification::MatchEnded(m.id));
        }
    }

    #[tokio::test]
    async fn test_quit_marks_current_participant() {
        let transport = LoopbackTransport::new();
        let m = stored(&transport);

        let next = crate::game::rotation::quit_order(&m, &player(1));
        transport
            .quit_match(&m, MatchOutcome::Quit, next, TurnTimeout::PlatformDefault, Vec::new())
            .await
            .unwrap();

        let platform_copy = transport.stored_match(&m.id).unwrap();
        assert_eq!(platform_copy.participants()[0].outcome, MatchOutcome::Quit);
        assert_eq!(platform_copy.current_participant, Some(player(3)));
    }
}
