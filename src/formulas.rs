//! Region magnitude formulas and the registry that maps region names to them.

use std::collections::HashMap;
use std::f64::consts::PI;

/// Earth radius in kilometers (same value as the haversine filters use).
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of arc on the Earth's surface.
pub const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * PI / 180.0;

/// A magnitude formula: (amplitude mm, period s, delta deg, depth km) -> magnitude.
pub type Formula = fn(amplitude: f64, period: Option<f64>, delta: f64, depth: f64) -> f64;

/// Convert an arc length in degrees to kilometres.
#[must_use]
pub fn deg2km(delta: f64) -> f64 {
    delta * KM_PER_DEGREE
}

/// Hypocentral distance R in km: straight line from epicentral distance and depth.
#[must_use]
pub fn hypocentral_distance(delta: f64, depth: f64) -> f64 {
    depth.hypot(deg2km(delta))
}

/// Western Australia: `log10(A) + 1.137 log10(R) + 0.000657 R + 0.66`
#[must_use]
pub fn west(amplitude: f64, _period: Option<f64>, delta: f64, depth: f64) -> f64 {
    let r = hypocentral_distance(delta, depth);
    amplitude.log10() + 1.137 * r.log10() + 0.000_657 * r + 0.66
}

/// Eastern Australia: `log10(A) + 1.34 log10(R/100) + 0.00055 (R - 100) + 3.13`
#[must_use]
pub fn east(amplitude: f64, _period: Option<f64>, delta: f64, depth: f64) -> f64 {
    let r = hypocentral_distance(delta, depth);
    amplitude.log10() + 1.34 * (r / 100.0).log10() + 0.000_55 * (r - 100.0) + 3.13
}

/// Flinders Ranges: `log10(A) + 1.1 log10(R) + 0.0013 R + 0.7`
#[must_use]
pub fn south(amplitude: f64, _period: Option<f64>, delta: f64, depth: f64) -> f64 {
    let r = hypocentral_distance(delta, depth);
    amplitude.log10() + 1.1 * r.log10() + 0.0013 * r + 0.7
}

/// Region formulas of the MLa magnitude.
pub const MLA_FORMULAS: [(&str, Formula); 3] = [("West", west), ("East", east), ("South", south)];

/// Immutable map from region name to formula.
#[derive(Debug, Clone)]
pub struct FormulaRegistry {
    formulas: HashMap<String, Formula>,
}

impl FormulaRegistry {
    /// Build a registry from `(region, formula)` pairs. Later duplicates win.
    #[must_use]
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Formula)>) -> Self {
        Self {
            formulas: entries
                .into_iter()
                .map(|(name, f)| (name.to_string(), f))
                .collect(),
        }
    }

    /// The three-region MLa registry.
    #[must_use]
    pub fn mla() -> Self {
        Self::new(MLA_FORMULAS)
    }

    /// Formula for a region, if one is registered.
    #[must_use]
    pub fn resolve(&self, region: &str) -> Option<Formula> {
        self.formulas.get(region).copied()
    }

    /// Registered region names, sorted.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formulas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self::mla()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deg2km() {
        assert!((deg2km(1.0) - 111.195).abs() < 0.001);
    }

    #[test]
    fn test_distance_degenerate_cases() {
        assert!((hypocentral_distance(0.0, 33.0) - 33.0).abs() < 1e-9);
        assert!((hypocentral_distance(2.5, 0.0) - deg2km(2.5)).abs() < 1e-9);
        // 3-4-5 triangle
        let delta = 40.0 / KM_PER_DEGREE;
        assert!((hypocentral_distance(delta, 30.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_west_example() {
        let m = west(10.0, None, 1.0, 0.0);
        let r = deg2km(1.0);
        let expected = 1.0 + 1.137 * r.log10() + 0.000_657 * r + 0.66;
        assert!((m - expected).abs() < 1e-12);
        assert!((m - 4.06).abs() < 0.01, "got {m}");
    }

    #[test]
    fn test_east_example() {
        let m = east(1.0, None, 0.0, 150.0);
        assert!((m - 3.39).abs() < 0.01, "got {m}");
    }

    #[test]
    fn test_east_reference_distance() {
        // At R = 100 km both distance terms vanish
        let m = east(1.0, None, 0.0, 100.0);
        assert!((m - 3.13).abs() < 1e-12);
    }

    #[test]
    fn test_south_example() {
        let m = south(1.0, None, 0.0, 100.0);
        assert!((m - (2.2 + 0.13 + 0.7)).abs() < 1e-12);
    }

    #[test]
    fn test_period_is_ignored() {
        assert!((west(5.0, Some(0.3), 2.0, 10.0) - west(5.0, None, 2.0, 10.0)).abs() < 1e-15);
    }

    #[test]
    fn test_registry_resolve() {
        let registry = FormulaRegistry::mla();
        assert_eq!(registry.regions(), vec!["East", "South", "West"]);
        let f = registry.resolve("East").unwrap();
        assert!((f(1.0, None, 0.0, 100.0) - 3.13).abs() < 1e-12);
        assert!(registry.resolve("North").is_none());
        assert!(registry.resolve("west").is_none());
    }
}
