//! Data models shared by the magnitude processors.
//!
//! Inputs arrive from the amplitude-picking and event-location stages of the
//! host pipeline; outputs go to whatever aggregates network magnitudes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MagnitudeError;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees [-180, 180]
    pub longitude: f64,
    /// Latitude in degrees [-90, 90]
    pub latitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Check that both coordinates are finite and inside their ranges.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending coordinate.
    pub fn validate(&self) -> Result<(), String> {
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            ));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} out of range [-90, 90]", self.latitude));
        }
        Ok(())
    }
}

impl std::str::FromStr for GeoPoint {
    type Err = String;

    /// Parse `lon,lat`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(format!(
                "point requires 2 values (lon,lat), got {}",
                parts.len()
            ));
        }

        let vals: Result<Vec<f64>, _> = parts.iter().map(|p| p.trim().parse::<f64>()).collect();
        let vals = vals.map_err(|e| format!("invalid number in point: {e}"))?;

        let point = Self::new(vals[0], vals[1]);
        point.validate()?;
        Ok(point)
    }
}

/// Time window of an amplitude pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Pick time the offsets are relative to
    pub reference: DateTime<Utc>,
    /// Window start relative to `reference` (seconds)
    pub begin: f64,
    /// Window end relative to `reference` (seconds)
    pub end: f64,
}

impl TimeWindow {
    /// Absolute window start.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.reference + seconds(self.begin)
    }

    /// Absolute window end.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.reference + seconds(self.end)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seconds(s: f64) -> Duration {
    Duration::microseconds((s * 1e6).round() as i64)
}

/// Output of an amplitude measurement primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeMeasurement {
    /// Amplitude value (convention depends on the producer)
    pub value: f64,
    /// Dominant period in seconds, `None` when not computed
    pub period: Option<f64>,
    /// Signal-to-noise ratio
    pub snr: f64,
    /// Where the pick was made
    pub window: TimeWindow,
}

/// Everything a magnitude processor needs for one station amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeInput {
    /// Amplitude in millimetres
    pub amplitude: f64,
    /// Period in seconds
    #[serde(default)]
    pub period: Option<f64>,
    /// Signal-to-noise ratio
    #[serde(default)]
    pub snr: Option<f64>,
    /// Epicentral distance in degrees
    pub delta: f64,
    /// Hypocenter depth in kilometres (positive down)
    pub depth: f64,
    /// Hypocenter location
    pub hypocenter: GeoPoint,
    /// Receiving station location
    #[serde(default)]
    pub receiver: Option<GeoPoint>,
}

/// Status code reported alongside a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    DistanceOutOfRange,
    PeriodOutOfRange,
    AmplitudeOutOfRange,
    NotConfigured,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::DistanceOutOfRange => "distance_out_of_range",
            Self::PeriodOutOfRange => "period_out_of_range",
            Self::AmplitudeOutOfRange => "amplitude_out_of_range",
            Self::NotConfigured => "not_configured",
        }
    }
}

/// Normalized result record emitted in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct MagnitudeRecord {
    pub magnitude_type: String,
    pub status: Status,
    pub magnitude: Option<f64>,
    pub region: Option<String>,
    pub amplitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    pub delta: f64,
    pub depth_km: f64,
    pub longitude: f64,
    pub latitude: f64,
}

impl MagnitudeRecord {
    /// Build a record from a processor result.
    #[must_use]
    pub fn new(
        magnitude_type: &str,
        input: &MagnitudeInput,
        region: Option<&str>,
        result: Result<f64, MagnitudeError>,
    ) -> Self {
        let (status, magnitude) = match result {
            Ok(m) => (Status::Ok, Some(m)),
            Err(e) => (e.status(), None),
        };
        Self {
            magnitude_type: magnitude_type.to_string(),
            status,
            magnitude,
            region: region.map(str::to_string),
            amplitude: input.amplitude,
            period: input.period,
            delta: input.delta,
            depth_km: input.depth,
            longitude: input.hypocenter.longitude,
            latitude: input.hypocenter.latitude,
        }
    }
}
