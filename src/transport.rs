//! Byte-stream abstraction behind the score event stream.
//!
//! Two traits split the stream into "opening" and "reading":
//!
//! - [`StreamOpener`] turns a [`StreamEndpoint`] into a live [`ChunkSource`],
//!   attaching whatever credentials the backend needs. A non-success response
//!   is reported as [`OpenError::Rejected`] so the subscriber can end silently.
//! - [`ChunkSource`] yields raw body chunks exactly as they came off the wire.
//!   Chunks carry no framing guarantees; the
//!   [`FrameDecoder`](crate::frame::FrameDecoder) reassembles them.
//!
//! The HTTP implementation lives in [`crate::transports`]. Tests and alternative
//! runtimes can implement both traits over channels or scripted data.
//!
//! # Implementing a Custom Source
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use ocean_saver_client::error::OceanSaverError;
//! use ocean_saver_client::transport::ChunkSource;
//!
//! struct Replay { chunks: Vec<Vec<u8>> }
//!
//! #[async_trait]
//! impl ChunkSource for Replay {
//!     async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, OceanSaverError>> {
//!         if self.chunks.is_empty() { None } else { Some(Ok(self.chunks.remove(0))) }
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::error::OceanSaverError;
use crate::protocol::RoomId;

/// Describes which stream to open. Credentials are added by the [`StreamOpener`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamEndpoint {
    path: String,
}

impl StreamEndpoint {
    /// An endpoint at an API-relative path (must start with `/`).
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The score stream of a room: `/games/{room_id}/subscribe`.
    pub fn game_scores(room_id: RoomId) -> Self {
        Self::new(format!("/games/{room_id}/subscribe"))
    }

    /// API-relative path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Why a stream could not be opened.
#[derive(Debug)]
pub enum OpenError {
    /// The server answered with a non-success status.
    Rejected {
        /// HTTP status code.
        status: u16,
    },
    /// The connection itself failed.
    Failed(OceanSaverError),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status } => write!(f, "stream rejected with status {status}"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

impl From<OceanSaverError> for OpenError {
    fn from(err: OceanSaverError) -> Self {
        match err {
            OceanSaverError::Http { status, .. } => Self::Rejected { status },
            OceanSaverError::Unauthorized => Self::Rejected { status: 401 },
            other => Self::Failed(other),
        }
    }
}

/// A source of raw body chunks for one open stream.
///
/// # Cancel Safety
///
/// [`next_chunk`](ChunkSource::next_chunk) is raced against the cancellation
/// signal inside `tokio::select!`. Dropping the future must not corrupt the
/// source; after cancellation the source is dropped anyway, so losing the
/// in-flight chunk is acceptable.
#[async_trait]
pub trait ChunkSource: Send + 'static {
    /// Read the next chunk.
    ///
    /// Returns:
    /// - `Some(Ok(bytes))`: raw bytes, possibly a fraction of a frame
    /// - `Some(Err(e))`: the transport failed
    /// - `None`: the server ended the stream
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, OceanSaverError>>;
}

/// Opens authenticated streams.
#[async_trait]
pub trait StreamOpener: Send + Sync + 'static {
    /// Open `endpoint` and return its body as a [`ChunkSource`].
    ///
    /// # Errors
    ///
    /// [`OpenError::Rejected`] for non-success statuses, [`OpenError::Failed`]
    /// when the connection could not be established.
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<Box<dyn ChunkSource>, OpenError>;
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn game_scores_endpoint_path() {
        assert_eq!(StreamEndpoint::game_scores(42).path(), "/games/42/subscribe");
    }

    #[test]
    fn http_errors_map_to_rejection() {
        let err = OpenError::from(OceanSaverError::http(503, "open stream"));
        assert!(matches!(err, OpenError::Rejected { status: 503 }));
        let err = OpenError::from(OceanSaverError::Timeout);
        assert!(matches!(err, OpenError::Failed(OceanSaverError::Timeout)));
    }

    #[test]
    fn traits_are_object_safe() {
        fn assert_opener(_: Option<Box<dyn StreamOpener>>) {}
        fn assert_source(_: Option<Box<dyn ChunkSource>>) {}
        assert_opener(None);
        assert_source(None);
    }
}
