//! Concrete transports for the game API.
//!
//! This module provides the HTTP implementation of
//! [`RoomService`](crate::RoomService) and [`StreamOpener`](crate::StreamOpener)
//! behind a feature gate:
//!
//! | Feature          | Types                                   |
//! |------------------|-----------------------------------------|
//! | `transport-http` | [`ApiClient`], [`HttpChunkSource`], [`TrashPhoto`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), ocean_saver_client::OceanSaverError> {
//! use std::sync::Arc;
//! use ocean_saver_client::{ApiClient, ClientConfig, EventStreamClient, StaticTokenProvider, StreamEndpoint};
//!
//! let api = Arc::new(ApiClient::new(&ClientConfig::default(), Arc::new(StaticTokenProvider::new("tok")))?);
//! let stream = EventStreamClient::new(api);
//! let handle = stream.subscribe(StreamEndpoint::game_scores(42), |msg| println!("{msg}"));
//! # drop(handle);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-http")]
pub mod http;

#[cfg(feature = "transport-http")]
pub use http::{ApiClient, HttpChunkSource, TrashPhoto};
