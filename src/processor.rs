//! Magnitude processor interface and the table of available processors.
//!
//! The host pipeline looks processors up by magnitude type through
//! [`create`]; nothing registers itself implicitly.

use crate::config::Settings;
use crate::engine::{MLA_TYPE, MagnitudeEngine};
use crate::errors::{MagnitudeError, SeismagError};
use crate::models::{GeoPoint, MagnitudeInput};
use crate::surface::{MSMAX_TYPE, MsMaxMagnitude};

/// A configurable magnitude calculation for one magnitude type.
pub trait MagnitudeProcessor: Send + Sync {
    /// Magnitude type this processor produces.
    fn magnitude_type(&self) -> &'static str;

    /// Amplitude type this processor consumes.
    fn amplitude_type(&self) -> &'static str;

    /// Read settings and prepare for computation.
    ///
    /// # Errors
    ///
    /// Returns an error if required settings are missing or invalid.
    fn setup(&mut self, settings: &dyn Settings) -> Result<(), SeismagError>;

    /// Compute a magnitude for one station amplitude.
    ///
    /// # Errors
    ///
    /// Returns the per-event rejection status.
    fn compute_magnitude(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeError>;

    /// Region the processor would use for a hypocenter, if it is region based.
    fn region(&self, _point: GeoPoint) -> Option<&str> {
        None
    }
}

type Constructor = fn() -> Box<dyn MagnitudeProcessor>;

/// Magnitude types and their constructors.
const PROCESSORS: [(&str, Constructor); 2] = [(MLA_TYPE, new_mla), (MSMAX_TYPE, new_msmax)];

fn new_mla() -> Box<dyn MagnitudeProcessor> {
    Box::new(MagnitudeEngine::new())
}

fn new_msmax() -> Box<dyn MagnitudeProcessor> {
    Box::new(MsMaxMagnitude::new())
}

/// Known magnitude types.
#[must_use]
pub fn magnitude_types() -> Vec<&'static str> {
    PROCESSORS.iter().map(|(name, _)| *name).collect()
}

/// Create an unconfigured processor for a magnitude type (case-insensitive).
#[must_use]
pub fn create(magnitude_type: &str) -> Option<Box<dyn MagnitudeProcessor>> {
    PROCESSORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(magnitude_type))
        .map(|(_, ctor)| ctor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_types() {
        for name in magnitude_types() {
            let p = create(name).expect("known type");
            assert_eq!(p.magnitude_type(), name);
        }
        assert_eq!(create("mla").map(|p| p.magnitude_type()), Some("MLa"));
    }

    #[test]
    fn test_create_unknown_type() {
        assert!(create("Mw").is_none());
    }

    #[test]
    fn test_fresh_mla_is_unconfigured() {
        let p = create(MLA_TYPE).unwrap();
        let input = MagnitudeInput {
            amplitude: 1.0,
            period: None,
            snr: None,
            delta: 1.0,
            depth: 10.0,
            hypocenter: GeoPoint::new(120.0, -30.0),
            receiver: None,
        };
        assert_eq!(p.compute_magnitude(&input), Err(MagnitudeError::NotConfigured));
    }
}
