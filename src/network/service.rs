//! Match Service
//!
//! Runs a [`MatchController`] on its own task. Caller commands and platform
//! notifications are applied one at a time, so no two lifecycle operations
//! ever interleave on the same match.
//!
//! ```text
//!  MatchHandle ──Command──▶ ┐
//!                           ├─▶ run loop ─▶ MatchController ─▶ MatchTransport
//!  platform ──Notification─▶┘
//! ```

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::engine::GameEngine;
use crate::game::state::Match;
use crate::network::lifecycle::{LifecycleState, MatchController, MatchError};
use crate::network::protocol::PlatformNotification;
use crate::network::transport::MatchTransport;

/// Command channel capacity.
const COMMAND_CAPACITY: usize = 64;

/// Service errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service task has stopped.
    #[error("match service closed")]
    Closed,

    /// The lifecycle operation failed.
    #[error(transparent)]
    Match(#[from] MatchError),
}

type Reply<R> = oneshot::Sender<Result<R, MatchError>>;

/// Commands accepted by the service loop.
enum Command {
    FindMatch(Reply<bool>),
    LoadMatchData(Reply<()>),
    UpdateMatchData(Reply<()>),
    AdvanceTurn(Reply<()>),
    AdvanceSelectionTurn(Vec<u8>, Reply<()>),
    RemoveParticipant(usize, Reply<()>),
    DidEndMatch(Reply<bool>),
    EndMatch(Reply<()>),
    Notify(PlatformNotification, Reply<()>),
    Snapshot(oneshot::Sender<(LifecycleState, Option<Match>)>),
    Shutdown,
}

/// Spawner for the controller task.
pub struct MatchService;

impl MatchService {
    /// Move `controller` onto a task fed by `notifications`.
    ///
    /// The join handle yields the controller back when the service stops,
    /// either on [`MatchHandle::shutdown`] or when every handle is dropped.
    pub fn spawn<T, E>(
        controller: MatchController<T, E>,
        notifications: mpsc::UnboundedReceiver<PlatformNotification>,
    ) -> (MatchHandle, JoinHandle<MatchController<T, E>>)
    where
        T: MatchTransport + 'static,
        E: GameEngine + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(run(controller, rx, notifications));
        (MatchHandle { tx }, task)
    }
}

async fn run<T, E>(
    mut controller: MatchController<T, E>,
    mut commands: mpsc::Receiver<Command>,
    mut notifications: mpsc::UnboundedReceiver<PlatformNotification>,
) -> MatchController<T, E>
where
    T: MatchTransport,
    E: GameEngine,
{
    let player = controller.local_player().player_id().short();
    info!("Match service started for {}", player);

    let mut notifications_open = true;

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => apply(&mut controller, command).await,
                }
            }
            notification = notifications.recv(), if notifications_open => {
                match notification {
                    Some(notification) => {
                        let kind = notification.kind();
                        if let Err(e) = controller.handle(notification).await {
                            warn!(kind, error = %e, "notification handling failed");
                        }
                    }
                    None => {
                        debug!("platform notification channel closed");
                        notifications_open = false;
                    }
                }
            }
        }
    }

    info!("Match service stopped for {}", player);
    controller
}

async fn apply<T, E>(controller: &mut MatchController<T, E>, command: Command)
where
    T: MatchTransport,
    E: GameEngine,
{
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::FindMatch(reply) => {
            let _ = reply.send(controller.find_match().await);
        }
        Command::LoadMatchData(reply) => {
            let _ = reply.send(controller.load_match_data().await);
        }
        Command::UpdateMatchData(reply) => {
            let _ = reply.send(controller.update_match_data().await);
        }
        Command::AdvanceTurn(reply) => {
            let _ = reply.send(controller.advance_turn().await);
        }
        Command::AdvanceSelectionTurn(data, reply) => {
            let _ = reply.send(controller.advance_selection_turn(data).await);
        }
        Command::RemoveParticipant(seat, reply) => {
            let _ = reply.send(controller.remove_participant(seat).await);
        }
        Command::DidEndMatch(reply) => {
            let _ = reply.send(controller.did_end_match().await);
        }
        Command::EndMatch(reply) => {
            let _ = reply.send(controller.end_match().await);
        }
        Command::Notify(notification, reply) => {
            let _ = reply.send(controller.handle(notification).await);
        }
        Command::Snapshot(reply) => {
            let _ = reply.send((controller.state(), controller.active_match().cloned()));
        }
        Command::Shutdown => {}
    }
}

/// Cloneable handle to a running [`MatchService`].
#[derive(Clone)]
pub struct MatchHandle {
    tx: mpsc::Sender<Command>,
}

impl MatchHandle {
    async fn request<R>(&self, build: impl FnOnce(Reply<R>) -> Command) -> Result<R, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| ServiceError::Closed)?;
        let result = reply_rx.await.map_err(|_| ServiceError::Closed)?;
        Ok(result?)
    }

    /// See [`MatchController::find_match`].
    pub async fn find_match(&self) -> Result<bool, ServiceError> {
        self.request(Command::FindMatch).await
    }

    /// See [`MatchController::load_match_data`].
    pub async fn load_match_data(&self) -> Result<(), ServiceError> {
        self.request(Command::LoadMatchData).await
    }

    /// See [`MatchController::update_match_data`].
    pub async fn update_match_data(&self) -> Result<(), ServiceError> {
        self.request(Command::UpdateMatchData).await
    }

    /// See [`MatchController::advance_turn`].
    pub async fn advance_turn(&self) -> Result<(), ServiceError> {
        self.request(Command::AdvanceTurn).await
    }

    /// See [`MatchController::advance_selection_turn`].
    pub async fn advance_selection_turn(&self, data: Vec<u8>) -> Result<(), ServiceError> {
        self.request(|reply| Command::AdvanceSelectionTurn(data, reply)).await
    }

    /// See [`MatchController::remove_participant`].
    pub async fn remove_participant(&self, seat_index: usize) -> Result<(), ServiceError> {
        self.request(|reply| Command::RemoveParticipant(seat_index, reply)).await
    }

    /// See [`MatchController::did_end_match`].
    pub async fn did_end_match(&self) -> Result<bool, ServiceError> {
        self.request(Command::DidEndMatch).await
    }

    /// See [`MatchController::end_match`].
    pub async fn end_match(&self) -> Result<(), ServiceError> {
        self.request(Command::EndMatch).await
    }

    /// Deliver a platform notification through the command queue.
    pub async fn notify(&self, notification: PlatformNotification) -> Result<(), ServiceError> {
        self.request(|reply| Command::Notify(notification, reply)).await
    }

    /// Current state and a copy of the active match.
    pub async fn snapshot(&self) -> Result<(LifecycleState, Option<Match>), ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| ServiceError::Closed)?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> Result<LifecycleState, ServiceError> {
        Ok(self.snapshot().await?.0)
    }

    /// Stop the service task after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
