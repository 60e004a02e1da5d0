//! Error types for seismag.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

use crate::models::Status;

/// Errors that can occur while setting up or driving seismag.
#[derive(Error, Debug)]
pub enum SeismagError {
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Boundary file is malformed
    #[error("Invalid boundary file (line {line}): {message}")]
    BoundaryFormat { line: usize, message: String },

    /// Required setting missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing failed
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Amplitude measurement failed
    #[error("Amplitude measurement failed: {0}")]
    Amplitude(#[from] AmplitudeError),
}

/// Per-event rejection from a magnitude computation.
///
/// Everything except `NotConfigured` is an expected outcome for some events;
/// callers typically fall back to another magnitude type.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MagnitudeError {
    /// Processor used before a successful setup
    #[error("magnitude processor is not configured")]
    NotConfigured,

    /// Hypocenter outside covered regions, no formula for the region,
    /// or an unusable distance
    #[error("distance out of range")]
    DistanceOutOfRange,

    /// Period outside the band the formula is defined for
    #[error("period {period} s out of range")]
    PeriodOutOfRange { period: f64 },

    /// Amplitude cannot be passed to a logarithm
    #[error("amplitude {amplitude} out of range")]
    AmplitudeOutOfRange { amplitude: f64 },
}

impl MagnitudeError {
    /// Status code reported downstream for this rejection.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::NotConfigured => Status::NotConfigured,
            Self::DistanceOutOfRange => Status::DistanceOutOfRange,
            Self::PeriodOutOfRange { .. } => Status::PeriodOutOfRange,
            Self::AmplitudeOutOfRange { .. } => Status::AmplitudeOutOfRange,
        }
    }
}

/// Failures of an amplitude measurement primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmplitudeError {
    /// Signal or noise window has no samples
    #[error("empty {0} window")]
    EmptyWindow(&'static str),

    /// Window indices fall outside the trace
    #[error("window {begin}..{end} outside trace of {len} samples")]
    WindowOutOfBounds { begin: usize, end: usize, len: usize },

    /// No measurable signal in the window
    #[error("no signal in window")]
    NoSignal,

    /// Station too far from the epicenter for this amplitude type
    #[error("station at {delta} deg beyond maximum distance {max} deg")]
    DistanceOutOfRange { delta: f64, max: f64 },

    /// Distance hint required but never supplied
    #[error("epicentral distance not set")]
    MissingDistance,

    /// Filter band is empty or reaches Nyquist
    #[error("invalid band {low}..{high} Hz (nyquist {nyquist} Hz)")]
    InvalidBand { low: f64, high: f64, nyquist: f64 },

    /// Sampling rate is not a positive number
    #[error("invalid sampling rate {0} Hz")]
    InvalidSamplingRate(f64),
}
