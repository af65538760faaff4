//! Error types for the Ocean Saver client.

use thiserror::Error;

/// Errors that can occur when using the Ocean Saver client.
#[derive(Debug, Error)]
pub enum OceanSaverError {
    /// The underlying connection failed (unreachable host, reset, broken stream).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{context} failed with HTTP status {status}")]
    Http {
        /// Numeric HTTP status code.
        status: u16,
        /// Operation that was attempted (e.g. `"start game"`).
        context: String,
    },

    /// The request was still rejected after one token refresh.
    #[error("unauthorized: credentials rejected after refresh")]
    Unauthorized,

    /// Failed to serialize or deserialize a JSON payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Only the room host may start a battle.
    #[error("only the room host can start the game")]
    NotHost,

    /// The room snapshot has not been fetched yet.
    #[error("room state has not been loaded yet")]
    RoomNotLoaded,

    /// The requested transition is not valid from the current phase.
    #[error("invalid phase: expected {expected}, currently {actual}")]
    InvalidPhase {
        /// Phase the operation requires.
        expected: &'static str,
        /// Phase the controller was in.
        actual: String,
    },

    /// The room controller loop has exited.
    #[error("room controller is not running")]
    ControllerClosed,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// No position could be obtained and no fallback was allowed.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl OceanSaverError {
    /// Build an [`OceanSaverError::Http`] from a status code and operation name.
    pub fn http(status: u16, context: impl Into<String>) -> Self {
        Self::Http {
            status,
            context: context.into(),
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// A specialized [`Result`] type for Ocean Saver client operations.
pub type Result<T> = std::result::Result<T, OceanSaverError>;

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
    fn status_is_reported_for_http_failures_only() {
        assert_eq!(OceanSaverError::http(503, "get room").status(), Some(503));
        assert_eq!(OceanSaverError::Unauthorized.status(), Some(401));
        assert_eq!(OceanSaverError::Timeout.status(), None);
    }

    #[test]
    fn every_variant_renders_a_message() {
        let errors = [
            OceanSaverError::Transport("reset".into()),
            OceanSaverError::http(403, "start game"),
            OceanSaverError::Unauthorized,
            OceanSaverError::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
            OceanSaverError::NotHost,
            OceanSaverError::RoomNotLoaded,
            OceanSaverError::InvalidPhase {
                expected: "lobby",
                actual: "ended".into(),
            },
            OceanSaverError::ControllerClosed,
            OceanSaverError::Timeout,
            OceanSaverError::LocationUnavailable("denied".into()),
            OceanSaverError::Config("bad url".into()),
        ];
        for error in &errors {
            // Exhaustive on purpose: a new variant must be added above.
            match error {
                OceanSaverError::Transport(_)
                | OceanSaverError::Http { .. }
                | OceanSaverError::Unauthorized
                | OceanSaverError::Serialization(_)
                | OceanSaverError::NotHost
                | OceanSaverError::RoomNotLoaded
                | OceanSaverError::InvalidPhase { .. }
                | OceanSaverError::ControllerClosed
                | OceanSaverError::Timeout
                | OceanSaverError::LocationUnavailable(_)
                | OceanSaverError::Config(_) => {}
            }
            assert!(!error.to_string().is_empty());
        }
        assert_eq!(
            OceanSaverError::http(403, "start game").to_string(),
            "start game failed with HTTP status 403"
        );
    }
}
