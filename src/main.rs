//! Warfare Match Demo
//!
//! Plays a short three-player match against the in-memory platform: map
//! selection, a few turns, then two eliminations that end the match.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use warfare::{
    game::{engine::SnapshotEngine, events::MatchEvent},
    network::{LocalPlayer, LoopbackTransport, MatchTransport},
    ControllerConfig, LifecycleState, Match, MatchController, MatchHandle, MatchId, MatchService,
    PlayerId, VERSION,
};

struct Seated {
    name: &'static str,
    player: PlayerId,
    handle: MatchHandle,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Warfare Match v{}", VERSION);

    let config = ControllerConfig::from_env();
    info!("Turn timeout: {:?}", config.turn_timeout);
    info!("Transport timeout: {:?}", config.transport_timeout);

    demo_match(config).await
}

/// Three clients sharing one in-memory platform.
async fn demo_match(config: ControllerConfig) -> Result<()> {
    info!("=== Starting Demo Match ===");

    let transport = LoopbackTransport::new();
    let mut seated = Vec::new();

    for (name, platform_id) in [("alice", "G:alice"), ("bob", "G:bob"), ("carol", "G:carol")] {
        let local = LocalPlayer::authenticated(platform_id);
        let player = local.player_id();
        let inbox = transport.subscribe(player);

        let controller = MatchController::new(
            transport.clone(),
            SnapshotEngine::default(),
            local,
            config.clone(),
        );
        if name == "alice" {
            log_events(name, &controller);
        }

        let (handle, _task) = MatchService::spawn(controller, inbox);
        info!("Seated {} as player {}", name, player.short());
        seated.push(Seated { name, player, handle });
    }

    let players = [seated[0].player, seated[1].player, seated[2].player];
    let game_match = Match::new(MatchId::new_v4(), players.map(Some));
    info!("Match ID: {}", game_match.id);
    transport.queue_find_result(Ok(game_match.clone()));

    let (alice, bob, carol) = (&seated[0], &seated[1], &seated[2]);

    if !alice.handle.find_match().await? {
        bail!("matchmaking was dismissed");
    }

    // Map selection: the choice itself is the match data.
    alice.handle.advance_selection_turn(b"map:delta".to_vec()).await?;

    wait_for_turn(bob).await?;
    bob.handle.advance_turn().await?;

    wait_for_turn(carol).await?;
    carol.handle.remove_participant(0).await?;
    info!("{} eliminated seat 0", carol.name);
    carol.handle.advance_turn().await?;

    // Decided participants still take their place in rotation.
    wait_for_turn(alice).await?;
    alice.handle.advance_turn().await?;

    wait_for_turn(bob).await?;
    bob.handle.remove_participant(2).await?;
    info!("{} eliminated seat 2", bob.name);

    let (state, _) = bob.handle.snapshot().await?;
    if state != LifecycleState::Ended && state != LifecycleState::Idle {
        warn!("Expected the match to be over, {} is {:?}", bob.name, state);
    }

    info!("=== Match Results ===");
    let final_match = transport
        .stored_match(&game_match.id)
        .context("platform lost the match")?;
    for (participant, entry) in final_match.participants().iter().zip(&seated) {
        info!("{} ({}): {:?}", entry.name, participant.seat, participant.outcome);
    }

    let reloaded = transport.load_match_data(&final_match).await?;
    info!("Final match data: {} bytes", reloaded.len());

    for entry in &seated {
        entry.handle.shutdown().await?;
    }
    Ok(())
}

/// Poll until the platform has handed `seat` the turn.
async fn wait_for_turn(seat: &Seated) -> Result<Match> {
    let poll = async {
        loop {
            if let (LifecycleState::Active, Some(m)) = seat.handle.snapshot().await? {
                if m.current_participant == Some(seat.player) {
                    return Ok::<_, anyhow::Error>(m);
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    let game_match = tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .with_context(|| format!("turn never reached {}", seat.name))??;
    info!("{}'s turn", seat.name);
    Ok(game_match)
}

/// Print one client's lifecycle events as they happen.
fn log_events(name: &'static str, controller: &MatchController<LoopbackTransport, SnapshotEngine>) {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                MatchEvent::TurnAdvanced { next, .. } => {
                    let order: Vec<usize> = next.iter().map(|p| p.seat.index()).collect();
                    info!("[{}] turn advanced, next order {:?}", name, order);
                }
                other => info!("[{}] {:?}", name, other),
            }
        }
    });
}
