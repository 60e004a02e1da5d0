//! Output formatters for magnitude results.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use crate::models::{MagnitudeRecord, Status};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude-based colors
const RED: &str = "\x1b[91m"; // mag >= 6.0
const YELLOW: &str = "\x1b[93m"; // mag >= 4.5
const GREEN: &str = "\x1b[92m"; // mag >= 3.0
const WHITE: &str = "\x1b[97m"; // mag < 3.0

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

fn magnitude_color(mag: f64) -> &'static str {
    match mag {
        m if m >= 6.0 => RED,
        m if m >= 4.5 => YELLOW,
        m if m >= 3.0 => GREEN,
        _ => WHITE,
    }
}

/// Write results in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, records: &[MagnitudeRecord]) -> io::Result<()> {
    for rec in records {
        let region = rec.region.as_deref().unwrap_or("-");
        let location = format!("({:.2}, {:.2})", rec.longitude, rec.latitude);

        match (rec.status, rec.magnitude) {
            (Status::Ok, Some(m)) => {
                let color = magnitude_color(m);
                writeln!(
                    writer,
                    "{color}{BOLD}{}{m:>6.2}{RESET} │ {region:<8} │ \
                     {DIM}Δ{:>6.2}° {:>5.0}km{RESET} │ {location}",
                    rec.magnitude_type, rec.delta, rec.depth_km
                )?;
            }
            (status, _) => {
                writeln!(
                    writer,
                    "{DIM}{}{:>7}{RESET} │ {region:<8} │ \
                     {DIM}Δ{:>6.2}° {:>5.0}km{RESET} │ {location} │ {}",
                    rec.magnitude_type,
                    "-",
                    rec.delta,
                    rec.depth_km,
                    status.as_str()
                )?;
            }
        }
    }
    Ok(())
}

/// Write results as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, records: &[MagnitudeRecord]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write results as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, records: &[MagnitudeRecord]) -> io::Result<()> {
    for rec in records {
        let json = serde_json::to_string(rec)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write results in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_records<W: Write>(
    writer: &mut W,
    records: &[MagnitudeRecord],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, records),
        Format::Json => write_json(writer, records),
        Format::Ndjson => write_ndjson(writer, records),
    }
}
