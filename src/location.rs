//! Position capability used when submitting trash photos.
//!
//! Uploads carry the photographer's position as `"lat,lon"`. Device location
//! can fail (permissions, timeouts), so the caller chooses a
//! [`LocationPolicy`]: propagate the failure, or substitute a known fallback
//! position.

use std::fmt;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{OceanSaverError, Result};

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Haeundae beach, Busan. The fallback position used by the demo build.
    pub const DEMO_FALLBACK: Location = Location {
        latitude: 35.1587,
        longitude: 129.1603,
    };

    /// A position from latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Something that can report the current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// The current position.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::LocationUnavailable`] when no fix can be obtained.
    async fn current_location(&self) -> Result<Location>;
}

/// A source that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_location(&self) -> Result<Location> {
        Ok(self.0)
    }
}

/// What to do when the source cannot produce a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationPolicy {
    /// Report the failure to the caller.
    BestEffort,
    /// Use the given position instead.
    ForcedFallback(Location),
}

/// Ask `source` for a position and apply `policy` on failure.
///
/// # Errors
///
/// Only with [`LocationPolicy::BestEffort`], when the source fails.
pub async fn resolve_location(
    source: &dyn LocationSource,
    policy: LocationPolicy,
) -> Result<Location> {
    match source.current_location().await {
        Ok(location) => Ok(location),
        Err(e) => match policy {
            LocationPolicy::BestEffort => Err(e),
            LocationPolicy::ForcedFallback(fallback) => {
                warn!("location unavailable ({e}); using fallback {fallback}");
                Ok(fallback)
            }
        },
    }
}

/// A source that never has a fix. Useful for headless environments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn current_location(&self) -> Result<Location> {
        Err(OceanSaverError::LocationUnavailable(
            "no location source configured".into(),
        ))
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
    fn formats_as_lat_lon() {
        assert_eq!(Location::DEMO_FALLBACK.to_string(), "35.1587,129.1603");
    }

    #[tokio::test]
    async fn best_effort_propagates_failure() {
        let err = resolve_location(&NoLocation, LocationPolicy::BestEffort)
            .await
            .unwrap_err();
        assert!(matches!(err, OceanSaverError::LocationUnavailable(_)));
    }

    #[tokio::test]
    async fn forced_fallback_substitutes_position() {
        let loc = resolve_location(
            &NoLocation,
            LocationPolicy::ForcedFallback(Location::DEMO_FALLBACK),
        )
        .await
        .unwrap();
        assert_eq!(loc, Location::DEMO_FALLBACK);
    }

    #[tokio::test]
    async fn source_position_wins_over_fallback() {
        let here = Location::new(37.5, 127.0);
        let loc = resolve_location(
            &FixedLocation(here),
            LocationPolicy::ForcedFallback(Location::DEMO_FALLBACK),
        )
        .await
        .unwrap();
        assert_eq!(loc, here);
    }
}
