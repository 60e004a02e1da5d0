//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::GeoPoint;
use crate::output::Format;

/// Region-dependent local magnitude from waveform amplitudes.
#[derive(Parser, Debug)]
#[command(name = "seismag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the regions of a boundary file
    Regions(RegionsArgs),

    /// Show which region contains a point
    Classify(ClassifyArgs),

    /// Compute one magnitude
    Magnitude(MagnitudeArgs),

    /// Compute magnitudes for NDJSON inputs, one per line
    Batch(BatchArgs),

    /// Pick the MSmax amplitude from a waveform and compute the magnitude
    Surface(SurfaceArgs),
}

/// Where the processor settings come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// BNA region file (overrides mla.regionfilepath)
    #[arg(long, short = 'r')]
    pub regions: Option<PathBuf>,
}

/// Arguments for the `regions` command.
#[derive(Parser, Debug)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the `classify` command.
#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Point to classify: lon,lat
    #[arg(long, short = 'p', value_parser = parse_point, allow_hyphen_values = true)]
    pub point: GeoPoint,
}

/// Arguments for the `magnitude` command.
#[derive(Parser, Debug)]
pub struct MagnitudeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Magnitude type (MLa, MSmax)
    #[arg(long = "type", short = 't', default_value = "MLa")]
    pub magnitude_type: String,

    /// Amplitude in millimetres
    #[arg(long, short = 'a')]
    pub amplitude: f64,

    /// Period in seconds
    #[arg(long)]
    pub period: Option<f64>,

    /// Signal-to-noise ratio
    #[arg(long)]
    pub snr: Option<f64>,

    /// Epicentral distance in degrees
    #[arg(long, short = 'd')]
    pub delta: f64,

    /// Hypocenter depth in kilometres
    #[arg(long, default_value = "0")]
    pub depth: f64,

    /// Hypocenter location: lon,lat
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub hypocenter: GeoPoint,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `batch` command.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Magnitude type (MLa, MSmax)
    #[arg(long = "type", short = 't', default_value = "MLa")]
    pub magnitude_type: String,

    /// NDJSON input file ("-" for stdin)
    #[arg(long, short = 'i', default_value = "-")]
    pub input: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "ndjson", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `surface` command.
#[derive(Parser, Debug)]
pub struct SurfaceArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Waveform samples in millimetres, whitespace separated ("-" for stdin)
    #[arg(long, short = 'i', default_value = "-")]
    pub input: String,

    /// Sampling rate in Hz
    #[arg(long, short = 's')]
    pub sampling_rate: f64,

    /// Seconds from the first sample to the signal onset (noise before)
    #[arg(long, default_value = "0")]
    pub signal_start: f64,

    /// Epicentral distance in degrees
    #[arg(long, short = 'd')]
    pub delta: f64,

    /// Hypocenter depth in kilometres
    #[arg(long, default_value = "0")]
    pub depth: f64,

    /// Hypocenter location: lon,lat
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub hypocenter: GeoPoint,

    /// Trial period step in seconds (overrides msmax.period_step)
    #[arg(long)]
    pub period_step: Option<u32>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a point from string.
fn parse_point(s: &str) -> Result<GeoPoint, String> {
    s.parse()
}
