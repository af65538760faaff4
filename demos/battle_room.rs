//! # Battle Room Example
//!
//! Walks through one Ocean Saver team battle against the real API:
//!
//! 1. Sign in (or use a stored access token)
//! 2. Create a room, or join an existing one
//! 3. Wait in the lobby while teammates arrive
//! 4. As host, start the game once both teams are full
//! 5. Print live scores until Ctrl+C, which forfeits and exits
//!
//! ## Running
//!
//! ```sh
//! # Sign in with e-mail and password and create a new room:
//! OCEAN_SAVER_EMAIL=me@example.com OCEAN_SAVER_PASSWORD=secret \
//!     cargo run --example battle_room
//!
//! # Join room 42 with an existing token:
//! OCEAN_SAVER_TOKEN=... OCEAN_SAVER_ROOM=42 cargo run --example battle_room
//!
//! # Point at a local server:
//! OCEAN_SAVER_API_URL=http://localhost:8080 cargo run --example battle_room
//! ```

use std::sync::Arc;

use ocean_saver_client::protocol::CreateRoomRequest;
use ocean_saver_client::{
    ApiClient, ClientConfig, GamePhase, RefreshingTokenProvider, RoomController, RoomEvent,
    RoomService, StaticTokenProvider, TokenProvider,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=ocean_saver_client=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = ClientConfig::from_env();
    tracing::info!("Using API at {}", config.base_url);

    // ── Sign in ─────────────────────────────────────────────────────
    let tokens: Arc<dyn TokenProvider> = match (
        std::env::var("OCEAN_SAVER_EMAIL"),
        std::env::var("OCEAN_SAVER_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => {
            let provider = RefreshingTokenProvider::new(reqwest::Client::new(), &config.base_url);
            provider.login(&email, &password).await?;
            Arc::new(provider)
        }
        _ => Arc::new(StaticTokenProvider::new(std::env::var("OCEAN_SAVER_TOKEN")?)),
    };
    let api = Arc::new(ApiClient::new(&config, tokens)?);

    // Host checks compare against the server's idea of who we are.
    let nickname = api.current_user().await?.nickname;
    tracing::info!("Signed in as {nickname}");

    // ── Pick a room ─────────────────────────────────────────────────
    let room_id = match std::env::var("OCEAN_SAVER_ROOM") {
        Ok(id) => {
            let id: u64 = id.parse()?;
            api.join_room(id, std::env::var("OCEAN_SAVER_ROOM_PASSWORD").ok().as_deref())
                .await?;
            tracing::info!("Joined room {id}");
            id
        }
        Err(_) => {
            let room = api
                .create_room(&CreateRoomRequest::public(format!("{nickname}'s cleanup")))
                .await?;
            tracing::info!("Created room {} ({})", room.room_id, room.title);
            room.room_id
        }
    };

    // ── Room controller ─────────────────────────────────────────────
    let (mut room, mut events) =
        RoomController::start(api.clone(), api, room_id, nickname.clone(), &config);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    RoomEvent::RoomUpdated(snapshot) => {
                        tracing::info!(
                            "{}: {} member(s), host {}",
                            snapshot.title,
                            snapshot.member_count(),
                            snapshot.host_name
                        );
                        if snapshot.is_full() && snapshot.is_host(&nickname) {
                            match room.start_game().await {
                                Ok(()) => tracing::info!("Game start requested"),
                                Err(e) => tracing::warn!("Could not start game: {e}"),
                            }
                        }
                    }

                    RoomEvent::PhaseChanged(GamePhase::Countdown { remaining }) => {
                        tracing::info!("Starting in {remaining}…");
                    }

                    RoomEvent::PhaseChanged(phase @ GamePhase::Active { remaining })
                        if remaining.as_secs() % 60 == 0 =>
                    {
                        tracing::info!("Battle: {phase}");
                    }

                    RoomEvent::ScoresUpdated(scores) => {
                        tracing::info!("Score  A {} : {} B", scores.a, scores.b);
                    }

                    RoomEvent::BattleTimeElapsed => {
                        let scores = room.scores();
                        tracing::info!("Time! Final score A {} : {} B", scores.a, scores.b);
                        room.end_battle().await?;
                        break;
                    }

                    RoomEvent::StreamEnded(end) => {
                        tracing::warn!("Score stream ended ({end}); reconnecting");
                        room.resubscribe().await?;
                    }

                    RoomEvent::PollFailed(reason) => {
                        tracing::warn!("Lobby refresh failed: {reason}");
                    }

                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving the room…");
                if room.phase().is_active() {
                    room.forfeit().await?;
                }
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    room.shutdown().await;
    tracing::info!("Room controller shut down.");
    Ok(())
}
