//! Named polygon regions loaded from BNA boundary files.
//!
//! A BNA file is a sequence of records, each a quoted header followed by
//! the vertices of one polygon:
//!
//! ```text
//! "West","rank 1",4
//! 113.0,-35.0
//! 129.0,-35.0
//! 129.0,-13.0
//! 113.0,-13.0
//! ```
//!
//! Containment is tested in raw degree coordinates. This is fine for
//! regional polygons but wrong for polygons spanning the antimeridian or a
//! pole.

use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use crate::errors::SeismagError;
use crate::models::GeoPoint;

/// Minimum vertex count for a closed polygon.
const MIN_POLYGON_VERTICES: usize = 3;

/// A named polygonal region.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    name: String,
    attribute: Option<String>,
    vertices: Vec<GeoPoint>,
    bounds: Bounds,
}

/// Axis-aligned bounds of a polygon, used to skip the ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl Bounds {
    fn of(vertices: &[GeoPoint]) -> Self {
        vertices.iter().fold(
            Self {
                min_lon: f64::INFINITY,
                min_lat: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
                max_lat: f64::NEG_INFINITY,
            },
            |b, v| Self {
                min_lon: b.min_lon.min(v.longitude),
                min_lat: b.min_lat.min(v.latitude),
                max_lon: b.max_lon.max(v.longitude),
                max_lat: b.max_lat.max(v.latitude),
            },
        )
    }

    fn contains(&self, p: GeoPoint) -> bool {
        p.longitude >= self.min_lon
            && p.longitude <= self.max_lon
            && p.latitude >= self.min_lat
            && p.latitude <= self.max_lat
    }
}

impl Zone {
    /// Create a zone from its boundary vertices.
    ///
    /// A trailing vertex that repeats the first one is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three distinct vertices remain.
    pub fn new(
        name: impl Into<String>,
        attribute: Option<String>,
        mut vertices: Vec<GeoPoint>,
    ) -> Result<Self, String> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < MIN_POLYGON_VERTICES {
            return Err(format!(
                "polygon needs at least {MIN_POLYGON_VERTICES} vertices, got {}",
                vertices.len()
            ));
        }
        let bounds = Bounds::of(&vertices);
        Ok(Self {
            name: name.into(),
            attribute,
            vertices,
            bounds,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Second header field of the BNA record, if present.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    #[must_use]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    /// Even-odd ray casting test.
    #[must_use]
    pub fn contains(&self, p: GeoPoint) -> bool {
        if !self.bounds.contains(p) {
            return false;
        }

        let v = &self.vertices;
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (xi, yi) = (v[i].longitude, v[i].latitude);
            let (xj, yj) = (v[j].longitude, v[j].latitude);
            if (yi > p.latitude) != (yj > p.latitude)
                && p.longitude < (xj - xi) * (p.latitude - yi) / (yj - yi) + xi
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Ordered set of zones loaded from one boundary file.
#[derive(Debug, Clone, Default)]
pub struct BoundaryDataset {
    zones: Vec<Zone>,
}

impl BoundaryDataset {
    /// Load a BNA file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// no polygons.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SeismagError> {
        let text = fs::read_to_string(path.as_ref())?;
        let dataset = Self::parse(&text)?;
        debug!("loaded {} zones", dataset.len());
        Ok(dataset)
    }

    /// Parse BNA text.
    ///
    /// # Errors
    ///
    /// Returns [`SeismagError::BoundaryFormat`] with the offending line.
    pub fn parse(text: &str) -> Result<Self, SeismagError> {
        let mut zones = Vec::new();
        let mut pending: Option<PendingRecord> = None;
        let mut last_line = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match pending.as_mut() {
                None => pending = Some(parse_header(line, line_no)?),
                Some(record) => {
                    record.push_vertices(line, line_no)?;
                    if record.is_complete() {
                        if let Some(done) = pending.take() {
                            zones.push(done.finish()?);
                        }
                    }
                }
            }
        }

        if let Some(record) = pending {
            return Err(format_error(
                last_line,
                format!(
                    "zone '{}' ends after {} of {} vertices",
                    record.name,
                    record.vertices.len(),
                    record.expected
                ),
            ));
        }
        if zones.is_empty() {
            return Err(format_error(last_line, "no polygons found".into()));
        }

        Ok(Self { zones })
    }

    /// Zones in load order.
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone, in load order, whose polygon contains the point.
    #[must_use]
    pub fn containing_zone(&self, point: GeoPoint) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(point))
    }
}

/// A record whose header has been read but whose vertices are still arriving.
struct PendingRecord {
    name: String,
    attribute: Option<String>,
    expected: usize,
    vertices: Vec<GeoPoint>,
    header_line: usize,
}

impl PendingRecord {
    fn is_complete(&self) -> bool {
        self.vertices.len() == self.expected
    }

    fn push_vertices(&mut self, line: &str, line_no: usize) -> Result<(), SeismagError> {
        let numbers: Result<Vec<f64>, _> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect();
        let numbers =
            numbers.map_err(|e| format_error(line_no, format!("invalid coordinate: {e}")))?;

        if numbers.len() % 2 != 0 {
            return Err(format_error(
                line_no,
                "coordinates must come in lon,lat pairs".into(),
            ));
        }

        for pair in numbers.chunks_exact(2) {
            if self.is_complete() {
                return Err(format_error(
                    line_no,
                    format!("zone '{}' has more than {} vertices", self.name, self.expected),
                ));
            }
            let vertex = GeoPoint::new(pair[0], pair[1]);
            vertex.validate().map_err(|e| format_error(line_no, e))?;
            self.vertices.push(vertex);
        }
        Ok(())
    }

    fn finish(self) -> Result<Zone, SeismagError> {
        let line = self.header_line;
        Zone::new(self.name, self.attribute, self.vertices).map_err(|e| format_error(line, e))
    }
}

/// Parse `"name","attribute",count` (attribute optional).
fn parse_header(line: &str, line_no: usize) -> Result<PendingRecord, SeismagError> {
    let fields = split_quoted(line);
    if fields.len() < 2 || fields.len() > 3 {
        return Err(format_error(
            line_no,
            format!("expected header \"name\",\"attribute\",count, got '{line}'"),
        ));
    }

    let name = fields[0].clone();
    if name.is_empty() {
        return Err(format_error(line_no, "empty zone name".into()));
    }

    let count_field = &fields[fields.len() - 1];
    let count: i64 = count_field
        .parse()
        .map_err(|_| format_error(line_no, format!("invalid vertex count '{count_field}'")))?;
    let expected = usize::try_from(count)
        .ok()
        .filter(|&n| n >= MIN_POLYGON_VERTICES)
        .ok_or_else(|| {
            format_error(
                line_no,
                format!("zone '{name}' is not a closed polygon (vertex count {count})"),
            )
        })?;

    let attribute = (fields.len() == 3).then(|| fields[1].clone());

    Ok(PendingRecord {
        name,
        attribute,
        expected,
        vertices: Vec::new(),
        header_line: line_no,
    })
}

/// Split on commas outside double quotes, stripping the quotes.
fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn format_error(line: usize, message: String) -> SeismagError {
    SeismagError::BoundaryFormat { line, message }
}
