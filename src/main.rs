//! seismag - region-dependent local earthquake magnitude.
//!
//! Classifies hypocenters against BNA region polygons and applies the
//! matching attenuation formula to station amplitudes.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info};

use seismag::amplitude::{AmplitudeMeasure, SignalWindow};
use seismag::cli::{self, Cli, Command};
use seismag::config::{Config, MLA_REGION_FILE_KEY};
use seismag::engine::MagnitudeEngine;
use seismag::models::{MagnitudeInput, MagnitudeRecord};
use seismag::output;
use seismag::processor::{self, MagnitudeProcessor};
use seismag::surface::{MsMaxAmplitude, MsMaxMagnitude};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Regions(args) => cmd_regions(&args),
        Command::Classify(args) => cmd_classify(&args),
        Command::Magnitude(args) => cmd_magnitude(&args),
        Command::Batch(args) => cmd_batch(&args),
        Command::Surface(args) => cmd_surface(&args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Merge the config file and the `--regions` override.
fn load_settings(source: &cli::SourceArgs) -> Result<Config> {
    let mut config = match &source.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(regions) = &source.regions {
        config = config.with_string(MLA_REGION_FILE_KEY, regions.display().to_string());
    }
    Ok(config)
}

fn mla_engine(source: &cli::SourceArgs) -> Result<MagnitudeEngine> {
    let config = load_settings(source)?;
    let mut engine = MagnitudeEngine::new();
    engine
        .setup(&config)
        .context("failed to set up MLa regions")?;
    Ok(engine)
}

fn build_processor(
    magnitude_type: &str,
    source: &cli::SourceArgs,
) -> Result<Box<dyn MagnitudeProcessor>> {
    let mut processor = processor::create(magnitude_type).with_context(|| {
        format!(
            "unknown magnitude type '{magnitude_type}' (expected: {})",
            processor::magnitude_types().join(", ")
        )
    })?;

    let config = load_settings(source)?;
    processor
        .setup(&config)
        .with_context(|| format!("failed to set up {magnitude_type} processor"))?;
    Ok(processor)
}

/// File path or "-" for stdin.
fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("failed to open input {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn compute(processor: &dyn MagnitudeProcessor, input: &MagnitudeInput) -> MagnitudeRecord {
    let result = processor.compute_magnitude(input);
    MagnitudeRecord::new(
        processor.magnitude_type(),
        input,
        processor.region(input.hypocenter),
        result,
    )
}

/// Execute the `regions` command - list zones and formula coverage.
fn cmd_regions(args: &cli::RegionsArgs) -> Result<()> {
    let engine = mla_engine(&args.source)?;
    let dataset = engine
        .dataset()
        .context("region dataset missing after setup")?;

    for zone in dataset.zones() {
        let formula = if engine.registry().resolve(zone.name()).is_some() {
            "formula"
        } else {
            "no formula"
        };
        println!(
            "{:<12} {:>5} vertices  {:<10} {}",
            zone.name(),
            zone.vertices().len(),
            formula,
            zone.attribute().unwrap_or("")
        );
    }
    Ok(())
}

/// Execute the `classify` command - region lookup for one point.
fn cmd_classify(args: &cli::ClassifyArgs) -> Result<()> {
    let engine = mla_engine(&args.source)?;
    match engine.classify(args.point) {
        Some(region) => println!("{region}"),
        None => println!("none"),
    }
    Ok(())
}

/// Execute the `magnitude` command - one station amplitude.
fn cmd_magnitude(args: &cli::MagnitudeArgs) -> Result<()> {
    let processor = build_processor(&args.magnitude_type, &args.source)?;

    let input = MagnitudeInput {
        amplitude: args.amplitude,
        period: args.period,
        snr: args.snr,
        delta: args.delta,
        depth: args.depth,
        hypocenter: args.hypocenter,
        receiver: None,
    };
    let record = compute(processor.as_ref(), &input);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_records(&mut handle, &[record], args.format)?;
    Ok(())
}

/// Execute the `batch` command - NDJSON inputs from a file or stdin.
fn cmd_batch(args: &cli::BatchArgs) -> Result<()> {
    let processor = build_processor(&args.magnitude_type, &args.source)?;

    let reader = open_input(&args.input)?;

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let input: MagnitudeInput = serde_json::from_str(&line)
            .with_context(|| format!("invalid input on line {}", idx + 1))?;
        records.push(compute(processor.as_ref(), &input));
    }

    let ok = records.iter().filter(|r| r.magnitude.is_some()).count();
    info!("computed {ok} of {} magnitudes", records.len());

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_records(&mut handle, &records, args.format)?;
    Ok(())
}

/// Execute the `surface` command - MSmax from a waveform.
fn cmd_surface(args: &cli::SurfaceArgs) -> Result<()> {
    if !(args.sampling_rate.is_finite() && args.sampling_rate > 0.0) {
        bail!("sampling rate must be positive, got {}", args.sampling_rate);
    }
    if !(args.signal_start.is_finite() && args.signal_start >= 0.0) {
        bail!("signal start must be non-negative, got {}", args.signal_start);
    }

    let config = load_settings(&args.source)?;
    let mut amplitude =
        MsMaxAmplitude::from_settings(&config).context("invalid MSmax settings")?;
    if let Some(step) = args.period_step {
        amplitude = amplitude.with_period_step(step);
    }
    amplitude.set_distance_hint(args.delta);

    let mut text = String::new();
    open_input(&args.input)?
        .read_to_string(&mut text)
        .context("failed to read waveform")?;
    let data = text
        .split_whitespace()
        .enumerate()
        .map(|(i, v)| {
            v.parse::<f64>()
                .with_context(|| format!("invalid sample {} '{v}'", i + 1))
        })
        .collect::<Result<Vec<f64>>>()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let onset = ((args.signal_start * args.sampling_rate).round() as usize).min(data.len());
    let window = SignalWindow {
        data: &data,
        sampling_hz: args.sampling_rate,
        start: DateTime::<Utc>::default(),
        noise: 0..onset,
        signal: onset..data.len(),
    };

    let pick = amplitude
        .measure(&window)
        .context("MSmax amplitude measurement failed")?;
    info!(
        "picked {:.3} at period {:?} s (snr {:.1}, window {} to {})",
        pick.value,
        pick.period,
        pick.snr,
        pick.window.start_time(),
        pick.window.end_time()
    );

    let input = MagnitudeInput {
        amplitude: pick.value,
        period: pick.period,
        snr: Some(pick.snr),
        delta: args.delta,
        depth: args.depth,
        hypocenter: args.hypocenter,
        receiver: None,
    };
    let record = compute(&MsMaxMagnitude::new(), &input);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_records(&mut handle, &[record], args.format)?;
    Ok(())
}
