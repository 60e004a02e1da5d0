//! MLa magnitude engine.
//!
//! Picks one of several regional attenuation formulas depending on which
//! boundary polygon contains the hypocenter. The engine only becomes usable
//! after `setup` has loaded the boundary file; there is no default region set.

use std::path::Path;

use tracing::{debug, error, info, instrument};

use crate::boundary::BoundaryDataset;
use crate::classifier::RegionClassifier;
use crate::config::{MLA_REGION_FILE_KEY, Settings, require_string};
use crate::errors::{MagnitudeError, SeismagError};
use crate::formulas::{FormulaRegistry, hypocentral_distance};
use crate::models::{GeoPoint, MagnitudeInput};
use crate::processor::MagnitudeProcessor;

/// Magnitude type produced by this engine.
pub const MLA_TYPE: &str = "MLa";

/// Amplitude type consumed by this engine.
pub const MLA_AMPLITUDE_TYPE: &str = "MLa";

#[derive(Debug, Clone)]
enum EngineState {
    Unconfigured,
    Ready(RegionClassifier),
}

/// Region-dependent local magnitude processor.
#[derive(Debug, Clone)]
pub struct MagnitudeEngine {
    state: EngineState,
    registry: FormulaRegistry,
}

impl MagnitudeEngine {
    /// Unconfigured engine with the three-region MLa formulas.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(FormulaRegistry::mla())
    }

    /// Unconfigured engine with a custom formula table.
    #[must_use]
    pub fn with_registry(registry: FormulaRegistry) -> Self {
        Self {
            state: EngineState::Unconfigured,
            registry,
        }
    }

    /// Ready engine over an already loaded dataset.
    #[must_use]
    pub fn with_dataset(dataset: BoundaryDataset) -> Self {
        let mut engine = Self::new();
        engine.activate(dataset);
        engine
    }

    /// Read the boundary file path from settings and load it.
    ///
    /// On failure the engine stays unconfigured and rejects every event.
    ///
    /// # Errors
    ///
    /// Returns an error if the setting is missing or the file cannot be loaded.
    #[instrument(skip_all)]
    pub fn setup(&mut self, settings: &dyn Settings) -> Result<(), SeismagError> {
        self.state = EngineState::Unconfigured;

        let path = require_string(settings, MLA_REGION_FILE_KEY).inspect_err(|e| {
            error!("{MLA_TYPE} can not read region file path from configuration: {e}");
        })?;

        self.load_regions(&path)
    }

    /// Load the boundary file directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_regions<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SeismagError> {
        self.state = EngineState::Unconfigured;

        let dataset = BoundaryDataset::load(path.as_ref()).inspect_err(|e| {
            error!(
                "can not read the bna region file at {}: {e}",
                path.as_ref().display()
            );
        })?;

        info!(
            "{MLA_TYPE} loaded {} regions from {}",
            dataset.len(),
            path.as_ref().display()
        );
        self.activate(dataset);
        Ok(())
    }

    fn activate(&mut self, dataset: BoundaryDataset) {
        for zone in dataset.zones() {
            if self.registry.resolve(zone.name()).is_none() {
                debug!("region '{}' has no registered formula", zone.name());
            }
        }
        self.state = EngineState::Ready(RegionClassifier::new(dataset));
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// Loaded regions, if configured.
    #[must_use]
    pub fn dataset(&self) -> Option<&BoundaryDataset> {
        match &self.state {
            EngineState::Ready(c) => Some(c.dataset()),
            EngineState::Unconfigured => None,
        }
    }

    /// Region containing a point, if configured and covered.
    #[must_use]
    pub fn classify(&self, point: GeoPoint) -> Option<&str> {
        match &self.state {
            EngineState::Ready(c) => c.classify(point),
            EngineState::Unconfigured => None,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &FormulaRegistry {
        &self.registry
    }

    /// Compute MLa for one station amplitude.
    ///
    /// `amplitude` is zero-to-peak in millimetres, `delta` in degrees,
    /// `depth` in kilometres.
    ///
    /// # Errors
    ///
    /// - [`MagnitudeError::NotConfigured`] before a successful setup
    /// - [`MagnitudeError::DistanceOutOfRange`] if no region or no formula
    ///   covers the hypocenter, or the distance is unusable
    /// - [`MagnitudeError::AmplitudeOutOfRange`] for non-positive amplitudes
    pub fn compute_magnitude(
        &self,
        amplitude: f64,
        period: Option<f64>,
        delta: f64,
        depth: f64,
        hypocenter: GeoPoint,
    ) -> Result<f64, MagnitudeError> {
        let EngineState::Ready(classifier) = &self.state else {
            error!("{MLA_TYPE} magnitude requested before setup");
            return Err(MagnitudeError::NotConfigured);
        };

        let Some(region) = classifier.classify(hypocenter) else {
            debug!(
                "hypocenter ({}, {}) outside all regions",
                hypocenter.longitude, hypocenter.latitude
            );
            return Err(MagnitudeError::DistanceOutOfRange);
        };

        let Some(formula) = self.registry.resolve(region) else {
            debug!("no formula registered for region '{region}'");
            return Err(MagnitudeError::DistanceOutOfRange);
        };

        if !amplitude.is_finite() || amplitude <= 0.0 {
            debug!("rejecting amplitude {amplitude}");
            return Err(MagnitudeError::AmplitudeOutOfRange { amplitude });
        }

        if !(delta.is_finite() && depth.is_finite() && delta >= 0.0 && depth >= 0.0) {
            debug!("rejecting distance delta={delta} depth={depth}");
            return Err(MagnitudeError::DistanceOutOfRange);
        }
        if hypocentral_distance(delta, depth) <= 0.0 {
            return Err(MagnitudeError::DistanceOutOfRange);
        }

        let magnitude = formula(amplitude, period, delta, depth);
        debug!("{MLA_TYPE} = {magnitude:.2} in region {region}");
        Ok(magnitude)
    }
}

impl Default for MagnitudeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MagnitudeProcessor for MagnitudeEngine {
    fn magnitude_type(&self) -> &'static str {
        MLA_TYPE
    }

    fn amplitude_type(&self) -> &'static str {
        MLA_AMPLITUDE_TYPE
    }

    fn setup(&mut self, settings: &dyn Settings) -> Result<(), SeismagError> {
        Self::setup(self, settings)
    }

    fn compute_magnitude(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeError> {
        Self::compute_magnitude(
            self,
            input.amplitude,
            input.period,
            input.delta,
            input.depth,
            input.hypocenter,
        )
    }

    fn region(&self, point: GeoPoint) -> Option<&str> {
        self.classify(point)
    }
}
