//! Match Lifecycle
//!
//! Owns the active match and moves it from matchmaking to its end.
//! Consults [`crate::game::rotation`] for turn order and delegates blob
//! encoding to the [`GameEngine`].
//!
//! ```text
//!  Idle ──find──▶ Searching ──found+loaded──▶ Active ──advance──▶ TurnAdvancing
//!   ▲                 │                        ▲  │                    │
//!   └──cancel/fail────┘                        │  └──2 of 3 decided──▶ Ended
//!                                              └───────────────────────┘
//! ```
//!
//! ## Transport errors
//!
//! Save, end-turn, end-match and quit calls follow [`TransportErrorPolicy`].
//! With the default [`TransportErrorPolicy::LogAndContinue`] a failed call is
//! logged and the operation returns `Ok`; local state is left as it was
//! before the call, except for `end_match`, which ends the match locally
//! either way. Loading match data always surfaces its errors.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::game::engine::{EngineError, GameEngine};
use crate::game::events::{DismissReason, MatchEvent};
use crate::game::rotation;
use crate::game::state::{Match, MatchId, MatchOutcome, Seat, StateError};
use crate::network::auth::LocalPlayer;
use crate::network::protocol::{MatchRequest, PlatformNotification, TurnTimeout};
use crate::network::transport::{MatchTransport, TransportError};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No match in play (or a referenced match not loaded yet).
    Idle,
    /// Matchmaking flow presented.
    Searching,
    /// Match loaded, turns can be taken.
    Active,
    /// End-turn call outstanding.
    TurnAdvancing,
    /// Match closed.
    Ended,
}

/// What to do when a save / end-turn / end-match / quit call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Default)]
pub enum TransportErrorPolicy {
    /// Fire and forget: log the error and report success.
    #[default]
    LogAndContinue,
    /// Return the error to the caller.
    Surface,
}

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Turn timeout passed to the platform.
    pub turn_timeout: TurnTimeout,
    /// Upper bound on any single platform call (matchmaking excluded).
    pub transport_timeout: Duration,
    /// Transport error handling for fire-and-forget calls.
    pub error_policy: TransportErrorPolicy,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            turn_timeout: TurnTimeout::PlatformDefault,
            transport_timeout: Duration::from_secs(30),
            error_policy: TransportErrorPolicy::LogAndContinue,
            event_capacity: 64,
        }
    }
}

impl ControllerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_secs("WARFARE_TURN_TIMEOUT_SECS") {
            config.turn_timeout = TurnTimeout::After(Duration::from_secs(secs));
        }
        if let Some(secs) = env_secs("WARFARE_TRANSPORT_TIMEOUT_SECS") {
            config.transport_timeout = Duration::from_secs(secs);
        }
        let surface = std::env::var("WARFARE_SURFACE_TRANSPORT_ERRORS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if surface {
            config.error_policy = TransportErrorPolicy::Surface;
        }

        config
    }
}

fn env_secs(key: &str) -> Option<u64> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(key, %value, "ignoring non-numeric duration");
            None
        }
    }
}

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// No match is referenced.
    #[error("no active match")]
    NoActiveMatch,

    /// Seat or participant-count violation.
    #[error(transparent)]
    State(#[from] StateError),

    /// Matchmaking requires an authenticated local player.
    #[error("local player is not authenticated")]
    NotAuthenticated,

    /// Operation not allowed in the current state.
    #[error("operation not allowed while {0:?}")]
    InvalidState(LifecycleState),

    /// The match has already ended.
    #[error("match already ended")]
    MatchEnded,

    /// Platform call failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Engine rejected match data.
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
}

/// Bound a platform call by `limit`.
async fn with_timeout<R>(
    limit: Duration,
    call: impl Future<Output = Result<R, TransportError>>,
) -> Result<R, TransportError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}

/// Lifecycle controller for one client's active match.
pub struct MatchController<T, E> {
    /// Platform collaborator.
    transport: T,
    /// Board collaborator.
    engine: E,
    /// The player running this client.
    local: LocalPlayer,
    /// Configuration.
    config: ControllerConfig,
    /// Current state.
    state: LifecycleState,
    /// The match being played, if any.
    active: Option<Match>,
    /// Lifecycle event broadcast channel.
    event_tx: broadcast::Sender<MatchEvent>,
}

impl<T: MatchTransport, E: GameEngine> MatchController<T, E> {
    /// Create an idle controller.
    pub fn new(transport: T, engine: E, local: LocalPlayer, config: ControllerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            transport,
            engine,
            local,
            config,
            state: LifecycleState::Idle,
            active: None,
            event_tx,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The referenced match.
    pub fn active_match(&self) -> Option<&Match> {
        self.active.as_ref()
    }

    /// The local player.
    pub fn local_player(&self) -> &LocalPlayer {
        &self.local
    }

    /// The game engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The game engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The platform transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<MatchEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: MatchEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// The active match, if mutations are allowed.
    fn mutable_match(&self) -> Result<&Match, MatchError> {
        let game_match = self.active.as_ref().ok_or(MatchError::NoActiveMatch)?;
        match self.state {
            LifecycleState::Active => Ok(game_match),
            LifecycleState::Ended => Err(MatchError::MatchEnded),
            other => Err(MatchError::InvalidState(other)),
        }
    }

    /// Snapshot of the active match, if mutations are allowed.
    fn mutable_snapshot(&self) -> Result<Match, MatchError> {
        self.mutable_match().cloned()
    }

    fn active_mut(&mut self) -> Result<&mut Match, MatchError> {
        self.active.as_mut().ok_or(MatchError::NoActiveMatch)
    }

    /// Apply the error policy. Returns whether the call was delivered.
    fn absorb(&self, operation: &'static str, result: Result<(), TransportError>) -> Result<bool, MatchError> {
        match result {
            Ok(()) => Ok(true),
            Err(e) => match self.config.error_policy {
                TransportErrorPolicy::LogAndContinue => {
                    error!(operation, error = %e, "platform call failed, continuing");
                    Ok(false)
                }
                TransportErrorPolicy::Surface => {
                    warn!(operation, error = %e, "platform call failed");
                    Err(e.into())
                }
            },
        }
    }

    // =========================================================================
    // MATCHMAKING
    // =========================================================================

    /// Present matchmaking for a three-player match.
    ///
    /// Returns `Ok(true)` when a match was found and loaded, `Ok(false)` when
    /// the flow was cancelled or failed (a `MatchmakingDismissed` event is
    /// emitted and no retry happens).
    #[instrument(skip(self), fields(player = %self.local.player_id().short()))]
    pub async fn find_match(&mut self) -> Result<bool, MatchError> {
        if !self.local.is_authenticated() {
            return Err(MatchError::NotAuthenticated);
        }
        if matches!(self.state, LifecycleState::Searching | LifecycleState::TurnAdvancing) {
            return Err(MatchError::InvalidState(self.state));
        }

        self.state = LifecycleState::Searching;
        self.emit(MatchEvent::SearchStarted);
        info!("matchmaking started");

        // A human is choosing opponents here; the platform owns this timeout.
        match self.transport.find_match(MatchRequest::default()).await {
            Ok(game_match) => {
                self.on_match_found(game_match).await?;
                Ok(true)
            }
            Err(TransportError::Cancelled) => {
                self.on_matchmaking_cancelled();
                Ok(false)
            }
            Err(e) => {
                self.on_matchmaking_failed(e.to_string());
                Ok(false)
            }
        }
    }

    /// A match was found: reference it and load its data.
    pub async fn on_match_found(&mut self, game_match: Match) -> Result<(), MatchError> {
        info!(match_id = %game_match.id, "match found");
        self.adopt(game_match);
        self.load(false).await
    }

    /// The player cancelled matchmaking.
    pub fn on_matchmaking_cancelled(&mut self) {
        info!("matchmaking cancelled");
        self.dismiss(DismissReason::Cancelled);
    }

    /// Matchmaking failed.
    pub fn on_matchmaking_failed(&mut self, reason: String) {
        warn!(%reason, "matchmaking failed");
        self.dismiss(DismissReason::Failed(reason));
    }

    fn dismiss(&mut self, reason: DismissReason) {
        if self.state == LifecycleState::Searching {
            self.state = LifecycleState::Idle;
        }
        self.emit(MatchEvent::MatchmakingDismissed { reason });
    }

    fn adopt(&mut self, game_match: Match) {
        let same_match = self.active.as_ref().map(|previous| previous.id) == Some(game_match.id);
        if let Some(previous) = &self.active {
            if !same_match {
                debug!(previous = %previous.id, next = %game_match.id, "switching active match");
            }
        }
        self.active = Some(game_match);
        // An ended match stays ended when the platform reports it again.
        if !(same_match && self.state == LifecycleState::Ended) {
            self.state = LifecycleState::Idle;
        }
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Load the active match's data and hand it to the engine.
    pub async fn load_match_data(&mut self) -> Result<(), MatchError> {
        self.load(false).await
    }

    #[instrument(skip(self))]
    async fn load(&mut self, became_active: bool) -> Result<(), MatchError> {
        let snapshot = self.active.clone().ok_or(MatchError::NoActiveMatch)?;

        let data = with_timeout(
            self.config.transport_timeout,
            self.transport.load_match_data(&snapshot),
        )
        .await?;

        #[cfg(feature = "debug-tracing")]
        debug!(match_id = %snapshot.id, blob = %hex::encode(&data), "loaded match data");

        self.engine.decode(&data)?;

        let game_match = self.active_mut()?;
        game_match.match_data = data;
        if self.state != LifecycleState::Ended {
            self.state = LifecycleState::Active;
        }

        info!(match_id = %snapshot.id, became_active, "match data loaded");
        self.emit(MatchEvent::MatchLoaded {
            match_id: snapshot.id,
            became_active,
        });
        Ok(())
    }

    // =========================================================================
    // TURNS
    // =========================================================================

    /// Save the engine's current state under the current turn.
    ///
    /// For irrevocable actions that do not pass the turn.
    #[instrument(skip(self))]
    pub async fn update_match_data(&mut self) -> Result<(), MatchError> {
        let snapshot = self.mutable_snapshot()?;
        let data = self.engine.encode_match_data();

        let result = with_timeout(
            self.config.transport_timeout,
            self.transport.save_turn_data(&snapshot, data.clone()),
        )
        .await;

        if self.absorb("save_turn_data", result)? {
            self.active_mut()?.match_data = data;
            debug!(match_id = %snapshot.id, "turn data saved");
            self.emit(MatchEvent::MatchDataSaved { match_id: snapshot.id });
        }
        Ok(())
    }

    /// End the current turn with freshly encoded data and turn message.
    pub async fn advance_turn(&mut self) -> Result<(), MatchError> {
        let data = self.engine.encode_match_data();
        let message = self.engine.encode_turn_message();
        self.pass_turn(data, Some(message)).await
    }

    /// End the current turn with caller-supplied match data.
    ///
    /// For steps where the action itself is the match data, such as map
    /// selection.
    pub async fn advance_selection_turn(&mut self, data: Vec<u8>) -> Result<(), MatchError> {
        self.pass_turn(data, None).await
    }

    #[instrument(skip(self, data, message))]
    async fn pass_turn(&mut self, data: Vec<u8>, message: Option<Vec<u8>>) -> Result<(), MatchError> {
        self.mutable_match()?;
        let game_match = self.active_mut()?;
        if let Some(message) = message {
            game_match.message = message;
        }
        let snapshot = game_match.clone();
        let next = rotation::next_participants_from_current(&snapshot).to_vec();

        self.state = LifecycleState::TurnAdvancing;
        let result = with_timeout(
            self.config.transport_timeout,
            self.transport
                .end_turn(&snapshot, next.clone(), self.config.turn_timeout, data.clone()),
        )
        .await;
        self.state = LifecycleState::Active;

        if self.absorb("end_turn", result)? {
            let game_match = self.active_mut()?;
            game_match.match_data = data;
            game_match.current_participant = next.first().and_then(|p| p.player_id);

            info!(
                match_id = %snapshot.id,
                next_seat = next.first().map(|p| p.seat.index()),
                "turn advanced"
            );
            self.emit(MatchEvent::TurnAdvanced {
                match_id: snapshot.id,
                next,
            });
        }
        Ok(())
    }

    // =========================================================================
    // ELIMINATION & TERMINATION
    // =========================================================================

    /// Mark the participant at `seat_index` as lost.
    ///
    /// Ends the match if that makes two of three decided, otherwise saves
    /// the update. Voluntary quits go through [`Self::on_quit_requested`].
    #[instrument(skip(self))]
    pub async fn remove_participant(&mut self, seat_index: usize) -> Result<(), MatchError> {
        let seat = Seat::new(seat_index)?;
        let snapshot = self.mutable_snapshot()?;

        self.active_mut()?.set_outcome(seat, MatchOutcome::Lost);
        info!(match_id = %snapshot.id, %seat, "participant eliminated");
        self.emit(MatchEvent::ParticipantEliminated {
            match_id: snapshot.id,
            seat,
        });

        if !self.did_end_match().await? {
            self.update_match_data().await?;
        }
        Ok(())
    }

    /// Whether exactly two of three participants are decided.
    ///
    /// Not a pure query: the first time it holds, the match is ended.
    /// Later calls return true without contacting the platform again.
    pub async fn did_end_match(&mut self) -> Result<bool, MatchError> {
        let Some(game_match) = &self.active else {
            return Ok(false);
        };
        if !rotation::is_terminal(game_match) {
            return Ok(false);
        }
        if self.state == LifecycleState::Ended {
            return Ok(true);
        }

        self.end_match().await?;
        Ok(true)
    }

    /// Close the match with the engine's final data.
    #[instrument(skip(self))]
    pub async fn end_match(&mut self) -> Result<(), MatchError> {
        let snapshot = self.mutable_snapshot()?;
        let data = self.engine.encode_match_data();

        let result = with_timeout(
            self.config.transport_timeout,
            self.transport.end_match(&snapshot, data.clone()),
        )
        .await;

        let delivered = self.absorb("end_match", result)?;
        if delivered {
            self.active_mut()?.match_data = data;
        }
        self.state = LifecycleState::Ended;

        info!(match_id = %snapshot.id, delivered, "match ended");
        self.emit(MatchEvent::MatchEnded { match_id: snapshot.id });
        Ok(())
    }

    // =========================================================================
    // PLATFORM NOTIFICATIONS
    // =========================================================================

    /// Quit `game_match` on behalf of the local player.
    ///
    /// Sends the match's existing data blob, which may lag behind the
    /// engine's state.
    #[instrument(skip(self, game_match), fields(match_id = %game_match.id))]
    pub async fn on_quit_requested(&mut self, game_match: Match) -> Result<(), MatchError> {
        let local = self.local.player_id();
        let next = rotation::quit_order(&game_match, &local);

        let result = with_timeout(
            self.config.transport_timeout,
            self.transport.quit_match(
                &game_match,
                MatchOutcome::Quit,
                next.clone(),
                self.config.turn_timeout,
                game_match.match_data.clone(),
            ),
        )
        .await;

        if self.absorb("quit_match", result)? {
            info!(remaining = next.len(), "quit sent");
            self.emit(MatchEvent::QuitSent {
                match_id: game_match.id,
                next,
            });
        }
        Ok(())
    }

    /// A turn event arrived: reference its match and load the data.
    pub async fn on_turn_received(&mut self, game_match: Match, became_active: bool) -> Result<(), MatchError> {
        debug!(match_id = %game_match.id, became_active, "turn received");
        self.adopt(game_match);
        self.load(became_active).await
    }

    /// The platform ended a match. Releases it if it is the active one.
    pub fn on_match_ended(&mut self, match_id: MatchId) {
        match &self.active {
            Some(game_match) if game_match.id == match_id => self.release(),
            _ => debug!(%match_id, "ignoring end of inactive match"),
        }
    }

    /// Dereference the active match.
    pub fn release(&mut self) {
        if let Some(game_match) = self.active.take() {
            info!(match_id = %game_match.id, "match released");
            self.emit(MatchEvent::MatchReleased { match_id: game_match.id });
        }
        self.state = LifecycleState::Idle;
    }

    /// Dispatch a platform notification.
    pub async fn handle(&mut self, notification: PlatformNotification) -> Result<(), MatchError> {
        debug!(kind = notification.kind(), "platform notification");

        match notification {
            PlatformNotification::MatchFound(game_match) => self.on_match_found(game_match).await,
            PlatformNotification::MatchmakingCancelled => {
                self.on_matchmaking_cancelled();
                Ok(())
            }
            PlatformNotification::MatchmakingFailed(reason) => {
                self.on_matchmaking_failed(reason);
                Ok(())
            }
            PlatformNotification::TurnReceived { game_match, became_active } => {
                self.on_turn_received(game_match, became_active).await
            }
            PlatformNotification::MatchEnded(match_id) => {
                self.on_match_ended(match_id);
                Ok(())
            }
            PlatformNotification::QuitRequested(game_match) => self.on_quit_requested(game_match).await,
            PlatformNotification::AuthenticationChanged(authenticated) => {
                self.local.set_authenticated(authenticated);
                Ok(())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
