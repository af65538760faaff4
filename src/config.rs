//! Client configuration.
//!
//! [`ClientConfig`] carries the API base URL and the timing constants used by
//! the room controller. Every field has a default matching the production
//! game; override individual values with the `with_*` builder methods.
//!
//! # Example
//!
//! ```
//! use ocean_saver_client::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("http://localhost:8080/")
//!     .with_poll_interval(Duration::from_secs(1))
//!     .with_countdown_seconds(3);
//! assert_eq!(config.base_url, "http://localhost:8080");
//! assert_eq!(config.countdown_seconds, 3);
//! ```

use std::time::Duration;

/// Production API endpoint used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://ocean-saver-server.parafara.cloud";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "OCEAN_SAVER_API_URL";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_COUNTDOWN_SECONDS: u32 = 5;
const DEFAULT_BATTLE_DURATION: Duration = Duration::from_secs(30 * 60);
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration shared by the API client and the room controller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the game API, without a trailing slash.
    pub base_url: String,
    /// How often the room is re-fetched while in the lobby.
    ///
    /// Defaults to **3 seconds**.
    pub poll_interval: Duration,
    /// Length of the pre-battle countdown, in ticks.
    ///
    /// Defaults to **5**.
    pub countdown_seconds: u32,
    /// Total battle time once the room is active.
    ///
    /// Defaults to **30 minutes**.
    pub battle_duration: Duration,
    /// Length of one countdown / battle-timer tick.
    ///
    /// Defaults to **1 second**. Zero is clamped to one millisecond.
    pub tick_interval: Duration,
    /// Capacity of the bounded room event channel. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`RoomController::shutdown`](crate::controller::RoomController::shutdown)
    /// waits for the controller loop before aborting it.
    pub shutdown_timeout: Duration,
    /// Per-request timeout for plain HTTP calls. The score stream is exempt.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the given API base URL with default timings.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            battle_duration: DEFAULT_BATTLE_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            request_timeout: None,
        }
    }

    /// Build a configuration from [`BASE_URL_ENV`], falling back to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!(url = %url, "using API base URL from environment");
                Self::new(url.trim())
            }
            _ => Self::default(),
        }
    }

    /// Join `path` onto the base URL. `path` must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Set the lobby polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the countdown length in ticks.
    #[must_use]
    pub fn with_countdown_seconds(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    /// Set the battle duration.
    #[must_use]
    pub fn with_battle_duration(mut self, duration: Duration) -> Self {
        self.battle_duration = duration;
        self
    }

    /// Set the tick length used by the countdown and battle timer.
    #[must_use]
    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick.max(Duration::from_millis(1));
        self
    }

    /// Set the capacity of the bounded room event channel.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set a per-request timeout for non-streaming HTTP calls.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
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
    fn defaults_match_game_rules() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.countdown_seconds, 5);
        assert_eq!(config.battle_duration, Duration::from_secs(1800));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = ClientConfig::new("http://api.test//");
        assert_eq!(config.url("/games/rooms"), "http://api.test/games/rooms");
    }

    #[test]
    fn capacity_and_tick_are_clamped() {
        let config = ClientConfig::default()
            .with_event_channel_capacity(0)
            .with_tick_interval(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.tick_interval, Duration::from_millis(1));
    }
}
