//! Region classification of hypocenters.

use crate::boundary::BoundaryDataset;
use crate::models::GeoPoint;

/// Resolves a point to the name of the region containing it.
///
/// Overlapping polygons resolve to whichever was loaded first.
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    dataset: BoundaryDataset,
}

impl RegionClassifier {
    #[must_use]
    pub fn new(dataset: BoundaryDataset) -> Self {
        Self { dataset }
    }

    /// Name of the region containing `point`, if any.
    #[must_use]
    pub fn classify(&self, point: GeoPoint) -> Option<&str> {
        self.dataset.containing_zone(point).map(|z| z.name())
    }

    #[must_use]
    pub fn dataset(&self) -> &BoundaryDataset {
        &self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two squares overlapping on [1,2]x[0,2]
    const OVERLAP: &str = r#""First","",4
0,0
2,0
2,2
0,2
"Second","",4
1,0
3,0
3,2
1,2
"#;

    #[test]
    fn test_overlap_resolves_to_first_loaded() {
        let classifier = RegionClassifier::new(BoundaryDataset::parse(OVERLAP).unwrap());
        for _ in 0..10 {
            assert_eq!(classifier.classify(GeoPoint::new(1.5, 1.0)), Some("First"));
        }
        assert_eq!(classifier.classify(GeoPoint::new(2.5, 1.0)), Some("Second"));
        assert_eq!(classifier.classify(GeoPoint::new(0.5, 1.0)), Some("First"));
    }

    #[test]
    fn test_load_order_swapped() {
        let swapped = OVERLAP
            .replace("First", "Tmp")
            .replace("Second", "First")
            .replace("Tmp", "Second");
        // Same geometry, names swapped: the overlap follows the first record
        let classifier = RegionClassifier::new(BoundaryDataset::parse(&swapped).unwrap());
        assert_eq!(classifier.classify(GeoPoint::new(1.5, 1.0)), Some("Second"));
    }

    #[test]
    fn test_outside_all_zones() {
        let classifier = RegionClassifier::new(BoundaryDataset::parse(OVERLAP).unwrap());
        assert_eq!(classifier.classify(GeoPoint::new(10.0, 10.0)), None);
        assert_eq!(classifier.classify(GeoPoint::new(1.5, -0.5)), None);
    }
}
