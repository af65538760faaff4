//! # Ocean Saver Client
//!
//! Async Rust client for the Ocean Saver beach-cleanup game API.
//!
//! The crate covers the two stateful parts of a battle session and the
//! plain HTTP calls around them:
//!
//! - **Event stream**: [`EventStreamClient`] reads a chunked HTTP response,
//!   reassembles `data:` frames across arbitrary chunk boundaries and hands
//!   each decoded JSON message to a callback. Subscriptions are cancellable
//!   at any point.
//! - **Room lifecycle**: [`RoomController`] polls the lobby, lets the host
//!   start the battle, runs the countdown and battle timer and keeps the
//!   scoreboard current from the score stream.
//! - **HTTP API** (feature `transport-http`, on by default): [`ApiClient`]
//!   implements [`RoomService`] and [`StreamOpener`] with `reqwest`, attaches
//!   bearer tokens and retries once after refreshing on `401`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ocean_saver_client::{ApiClient, ClientConfig, RoomController, RoomEvent, StaticTokenProvider};
//!
//! let config = ClientConfig::from_env();
//! let api = Arc::new(ApiClient::new(&config, Arc::new(StaticTokenProvider::new(token)))?);
//! let (mut room, mut events) = RoomController::start(api.clone(), api, room_id, "alice", &config);
//!
//! while let Some(event) = events.recv().await {
//!     if let RoomEvent::ScoresUpdated(scores) = event {
//!         println!("A {} : {} B", scores.a, scores.b);
//!     }
//! }
//! room.shutdown().await;
//! ```

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_stream;
pub mod frame;
pub mod location;
pub mod poller;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use auth::{Credentials, StaticTokenProvider, TokenProvider};
pub use config::ClientConfig;
pub use controller::{GamePhase, RoomController, RoomEvent, RoomState, Scoreboard};
pub use error::{OceanSaverError, Result};
pub use event_stream::{EventStreamClient, SubscriptionEnd, SubscriptionHandle};
pub use frame::FrameDecoder;
pub use location::{Location, LocationPolicy, LocationSource};
pub use protocol::{Room, RoomId, ScoreUpdate, Team, TeamLabel, User};
pub use service::RoomService;
pub use transport::{ChunkSource, OpenError, StreamEndpoint, StreamOpener};

#[cfg(feature = "transport-http")]
pub use auth::RefreshingTokenProvider;
#[cfg(feature = "transport-http")]
pub use transports::{ApiClient, HttpChunkSource, TrashPhoto};
