//! # Custom Stream Example
//!
//! Shows how to implement [`StreamOpener`] and [`ChunkSource`] over an
//! in-process channel, then read scores through [`EventStreamClient`]
//! without any network. This is useful for:
//!
//! - **Testing**: drive score updates from a script
//! - **Replays**: feed a recorded stream body back chunk by chunk
//!
//! ## Running
//!
//! ```sh
//! cargo run --example custom_stream
//! ```

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use ocean_saver_client::protocol::ScoreUpdate;
use ocean_saver_client::{
    ChunkSource, EventStreamClient, OceanSaverError, OpenError, Scoreboard, StreamEndpoint,
    StreamOpener,
};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A chunk source fed from a channel
// ─────────────────────────────────────────────────────────────────────

/// Yields whatever bytes arrive on the channel; ends when the sender drops.
struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl ChunkSource for ChannelSource {
    /// `UnboundedReceiver::recv` is cancel-safe, so this is too.
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, OceanSaverError>> {
        self.rx.recv().await.map(Ok)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: An opener that hands out the source once
// ─────────────────────────────────────────────────────────────────────

struct ChannelOpener {
    source: StdMutex<Option<ChannelSource>>,
}

#[async_trait]
impl StreamOpener for ChannelOpener {
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<Box<dyn ChunkSource>, OpenError> {
        tracing::info!("Opening {endpoint}");
        let source = self
            .source
            .lock()
            .map_err(|_| OpenError::Failed(OceanSaverError::Transport("lock poisoned".into())))?
            .take();
        match source {
            Some(source) => Ok(Box::new(source)),
            // Only one stream in this example.
            None => Err(OpenError::Rejected { status: 409 }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Subscribe and feed a stream body split at awkward places
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (tx, rx) = mpsc::unbounded_channel();
    let opener = Arc::new(ChannelOpener {
        source: StdMutex::new(Some(ChannelSource { rx })),
    });

    let scores = Arc::new(StdMutex::new(Scoreboard::default()));
    let board = Arc::clone(&scores);
    let mut handle = EventStreamClient::new(opener).subscribe(
        StreamEndpoint::game_scores(42),
        move |payload| {
            let Some(update) = ScoreUpdate::from_payload(&payload) else {
                return;
            };
            if let Ok(mut board) = board.lock() {
                if board.apply(&update) {
                    tracing::info!("Score  A {} : {} B", board.a, board.b);
                }
            }
        },
    );

    // Frames deliberately straddle chunk boundaries.
    let body = concat!(
        "data: {\"teams\":[{\"name\":\"A\",\"score\":3}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"teams\":[{\"name\":\"B\",\"score\":5},{\"name\":\"A\",\"score\":4}]}\n\n",
        "data: {\"teams\":[{\"teamName\":\"B\",\"score\":6}]}\n\n",
    );
    for chunk in body.as_bytes().chunks(11) {
        tx.send(chunk.to_vec())?;
    }
    drop(tx);

    let end = handle.finished().await;
    let final_scores = scores.lock().map(|s| *s).unwrap_or_default();
    tracing::info!(
        "Stream {end}. Final score A {} : {} B",
        final_scores.a,
        final_scores.b
    );
    Ok(())
}
