//! MSmax surface-wave magnitude.
//!
//! The amplitude side band-passes the waveform around a series of trial
//! periods and keeps the period giving the largest filtered amplitude. The
//! magnitude side evaluates
//!
//! ```text
//! Ms = log10(A) + 0.5 log10(sin D) + 0.0031 (20/T)^1.8 D
//!      - 0.66 log10(20/T) - log10(fc) - 0.43
//! ```
//!
//! with `D` the epicentral distance in degrees, `T` the period in seconds and
//! `fc = 0.6 / (T sqrt(D))` the corner frequency. Only periods between 8 s
//! and 25 s are accepted.

use std::ops::RangeInclusive;

use tracing::debug;

use crate::amplitude::{AmplitudeMeasure, SignalWindow};
use crate::config::{MSMAX_PERIOD_STEP_KEY, Settings};
use crate::errors::{AmplitudeError, MagnitudeError, SeismagError};
use crate::filter::{BandpassFilter, ButterworthBandpass};
use crate::models::{AmplitudeMeasurement, MagnitudeInput, TimeWindow};
use crate::processor::MagnitudeProcessor;

/// Magnitude and amplitude type name.
pub const MSMAX_TYPE: &str = "MSmax";

/// Valid period band in seconds.
pub const PERIOD_RANGE: RangeInclusive<f64> = 8.0..=25.0;

/// Default trial period step in seconds.
pub const DEFAULT_PERIOD_STEP: u32 = 3;

const FIRST_TRIAL_PERIOD: u32 = 8;
const LAST_TRIAL_PERIOD: u32 = 25;

/// Corner frequency `0.6 / (T sqrt(D))`.
#[must_use]
pub fn corner_frequency(period: f64, delta: f64) -> f64 {
    0.6 / (period * delta.sqrt())
}

/// Corner frequency and the two band edges derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerBand {
    pub corner: f64,
    /// `1 / (T + fc)`
    pub high: f64,
    /// `1 / (T - fc)`
    pub low: f64,
}

impl CornerBand {
    #[must_use]
    pub fn new(period: f64, delta: f64) -> Self {
        let corner = corner_frequency(period, delta);
        Self {
            corner,
            high: 1.0 / (period + corner),
            low: 1.0 / (period - corner),
        }
    }

    /// Lower band edge in Hz.
    #[must_use]
    pub fn lower_hz(&self) -> f64 {
        self.high.min(self.low)
    }

    /// Upper band edge in Hz.
    #[must_use]
    pub fn upper_hz(&self) -> f64 {
        self.high.max(self.low)
    }
}

/// Trial periods 8, 8+step, ... up to 25 s inclusive.
pub fn trial_periods(step: u32) -> impl Iterator<Item = f64> {
    (FIRST_TRIAL_PERIOD..=LAST_TRIAL_PERIOD)
        .step_by(step.max(1) as usize)
        .map(f64::from)
}

/// Reject periods outside [`PERIOD_RANGE`].
///
/// # Errors
///
/// Returns [`MagnitudeError::PeriodOutOfRange`].
pub fn check_period(period: f64) -> Result<(), MagnitudeError> {
    if PERIOD_RANGE.contains(&period) {
        Ok(())
    } else {
        debug!(
            "{MSMAX_TYPE} magnitude: period of {period} s outside {} to {} s",
            PERIOD_RANGE.start(),
            PERIOD_RANGE.end()
        );
        Err(MagnitudeError::PeriodOutOfRange { period })
    }
}

/// Evaluate the MSmax formula.
///
/// # Errors
///
/// Returns a rejection for periods outside 8 to 25 s, non-positive amplitudes,
/// or distances outside (0, 180) degrees.
pub fn ms_magnitude(amplitude: f64, period: f64, delta: f64) -> Result<f64, MagnitudeError> {
    check_period(period)?;
    if !(amplitude.is_finite() && amplitude > 0.0) {
        return Err(MagnitudeError::AmplitudeOutOfRange { amplitude });
    }
    if !(delta > 0.0 && delta < 180.0) {
        return Err(MagnitudeError::DistanceOutOfRange);
    }

    let corner = corner_frequency(period, delta);
    let ratio = 20.0 / period;
    Ok(amplitude.log10() + 0.5 * delta.to_radians().sin().log10()
        + 0.0031 * ratio.powf(1.8) * delta
        - 0.66 * ratio.log10()
        - corner.log10()
        - 0.43)
}

/// Trial period that produced the largest filtered amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodPick {
    pub period: f64,
    pub amplitude: f64,
    pub band: CornerBand,
    /// Largest filtered absolute value in the noise window
    pub noise: f64,
}

/// Scan trial periods and keep the one with the maximum filtered amplitude.
///
/// Each trial filters a fresh copy of the trace. Ties keep the earlier period.
///
/// # Errors
///
/// Propagates window and filter errors.
pub fn select_max_period<F: BandpassFilter + ?Sized>(
    filter: &F,
    window: &SignalWindow<'_>,
    delta: f64,
    step: u32,
) -> Result<PeriodPick, AmplitudeError> {
    window.checked(&window.signal, "signal")?;
    window.bounded(&window.noise)?;

    let mut best: Option<PeriodPick> = None;
    for period in trial_periods(step) {
        let band = CornerBand::new(period, delta);
        let mut copy = window.data.to_vec();
        filter.apply(&mut copy, window.sampling_hz, band.lower_hz(), band.upper_hz())?;

        let amplitude = peak_abs(&copy[window.signal.clone()]);
        debug!("trial period {period} s: amplitude {amplitude}");
        if best.is_none_or(|b| amplitude > b.amplitude) {
            best = Some(PeriodPick {
                period,
                amplitude,
                band,
                noise: peak_abs(&copy[window.noise.clone()]),
            });
        }
    }

    best.filter(|b| b.amplitude > 0.0)
        .ok_or(AmplitudeError::NoSignal)
}

fn peak_abs(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

/// MSmax amplitude processor.
///
/// Needs the epicentral distance before it can measure.
#[derive(Debug, Clone)]
pub struct MsMaxAmplitude<F = ButterworthBandpass> {
    filter: F,
    period_step: u32,
    distance: Option<f64>,
}

impl MsMaxAmplitude<ButterworthBandpass> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_filter(ButterworthBandpass::default())
    }

    /// Build from settings, reading the optional trial period step.
    ///
    /// # Errors
    ///
    /// Returns [`SeismagError::Config`] for a step that is not a positive
    /// integer.
    pub fn from_settings(settings: &dyn Settings) -> Result<Self, SeismagError> {
        let mut amp = Self::new();
        if let Some(step) = settings.get_integer(MSMAX_PERIOD_STEP_KEY) {
            amp.period_step = u32::try_from(step)
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    SeismagError::Config(format!(
                        "'{MSMAX_PERIOD_STEP_KEY}' must be a positive integer, got {step}"
                    ))
                })?;
        }
        Ok(amp)
    }
}

impl Default for MsMaxAmplitude<ButterworthBandpass> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: BandpassFilter> MsMaxAmplitude<F> {
    #[must_use]
    pub fn with_filter(filter: F) -> Self {
        Self {
            filter,
            period_step: DEFAULT_PERIOD_STEP,
            distance: None,
        }
    }

    #[must_use]
    pub fn with_period_step(mut self, step: u32) -> Self {
        self.period_step = step.max(1);
        self
    }

    #[must_use]
    pub fn period_step(&self) -> u32 {
        self.period_step
    }

    /// Record the epicentral distance in degrees.
    pub fn set_distance_hint(&mut self, delta: f64) {
        self.distance = Some(delta);
    }
}

impl<F: BandpassFilter> AmplitudeMeasure for MsMaxAmplitude<F> {
    fn measure(&self, window: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError> {
        let delta = self.distance.ok_or(AmplitudeError::MissingDistance)?;
        if !(delta > 0.0 && delta < 180.0) {
            return Err(AmplitudeError::DistanceOutOfRange { delta, max: 180.0 });
        }

        let pick = select_max_period(&self.filter, window, delta, self.period_step)?;
        #[allow(clippy::cast_precision_loss)]
        let length = (window.signal.end - window.signal.start) as f64 / window.sampling_hz;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let offset_us = (window.signal.start as f64 / window.sampling_hz * 1e6).round() as i64;

        Ok(AmplitudeMeasurement {
            value: pick.amplitude,
            period: Some(pick.period),
            snr: if pick.noise > 0.0 {
                pick.amplitude / pick.noise
            } else {
                f64::INFINITY
            },
            window: TimeWindow {
                reference: window.start + chrono::Duration::microseconds(offset_us),
                begin: 0.0,
                end: length,
            },
        })
    }
}

/// MSmax magnitude processor. Needs no settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsMaxMagnitude;

impl MsMaxMagnitude {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MagnitudeProcessor for MsMaxMagnitude {
    fn magnitude_type(&self) -> &'static str {
        MSMAX_TYPE
    }

    fn amplitude_type(&self) -> &'static str {
        MSMAX_TYPE
    }

    fn setup(&mut self, _settings: &dyn Settings) -> Result<(), SeismagError> {
        Ok(())
    }

    fn compute_magnitude(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeError> {
        let Some(period) = input.period else {
            debug!("{MSMAX_TYPE} magnitude: no period measured");
            return Err(MagnitudeError::PeriodOutOfRange { period: f64::NAN });
        };
        ms_magnitude(input.amplitude, period, input.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::config::Config;
    use crate::models::GeoPoint;

    #[test]
    fn test_trial_periods() {
        let periods: Vec<f64> = trial_periods(3).collect();
        assert_eq!(periods, vec![8.0, 11.0, 14.0, 17.0, 20.0, 23.0]);
        assert_eq!(trial_periods(1).count(), 18);
        assert_eq!(trial_periods(0).count(), 18);
        assert_eq!(trial_periods(17).collect::<Vec<_>>(), vec![8.0, 25.0]);
    }

    #[test]
    fn test_corner_band() {
        let band = CornerBand::new(20.0, 4.0);
        assert!((band.corner - 0.015).abs() < 1e-12);
        assert!((band.high - 1.0 / 20.015).abs() < 1e-12);
        assert!((band.low - 1.0 / 19.985).abs() < 1e-12);
        assert!(band.lower_hz() < band.upper_hz());
    }

    #[test]
    fn test_period_gate() {
        for period in [7.99, 25.01, -1.0, f64::NAN] {
            assert!(matches!(
                ms_magnitude(1.0, period, 30.0),
                Err(MagnitudeError::PeriodOutOfRange { .. })
            ));
        }
        assert!(ms_magnitude(1.0, 8.0, 30.0).is_ok());
        assert!(ms_magnitude(1.0, 25.0, 30.0).is_ok());
    }

    #[test]
    fn test_ms_formula_at_reference_period() {
        // T = 20 s: the (20/T) terms reduce to 0.0031 D and 0
        let delta: f64 = 30.0;
        let m = ms_magnitude(1.0, 20.0, delta).unwrap();
        let fc = 0.6 / (20.0 * delta.sqrt());
        let expected = 0.5 * 0.5f64.log10() + 0.0031 * delta - fc.log10() - 0.43;
        assert!((m - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ms_rejects_bad_inputs() {
        assert!(matches!(
            ms_magnitude(0.0, 20.0, 30.0),
            Err(MagnitudeError::AmplitudeOutOfRange { .. })
        ));
        assert_eq!(
            ms_magnitude(1.0, 20.0, 0.0),
            Err(MagnitudeError::DistanceOutOfRange)
        );
    }

    /// Scales the trace by a gain peaking for bands centred near 17 s.
    struct PeakAt17;

    impl BandpassFilter for PeakAt17 {
        fn apply(
            &self,
            data: &mut [f64],
            _sampling_hz: f64,
            low_hz: f64,
            high_hz: f64,
        ) -> Result<(), AmplitudeError> {
            let period = 2.0 / (low_hz + high_hz);
            let gain = 1.0 / (1.0 + (period - 17.0).abs());
            data.iter_mut().for_each(|x| *x *= gain);
            Ok(())
        }
    }

    /// Same gain for every band.
    struct Flat;

    impl BandpassFilter for Flat {
        fn apply(&self, _: &mut [f64], _: f64, _: f64, _: f64) -> Result<(), AmplitudeError> {
            Ok(())
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn window(data: &[f64]) -> SignalWindow<'_> {
        SignalWindow {
            data,
            sampling_hz: 1.0,
            start: start(),
            noise: 0..100,
            signal: 100..400,
        }
    }

    fn trace() -> Vec<f64> {
        let mut data = vec![0.1; 400];
        data[250] = 2.0;
        data
    }

    #[test]
    fn test_select_max_period() {
        let data = trace();
        let pick = select_max_period(&PeakAt17, &window(&data), 30.0, 3).unwrap();
        assert!((pick.period - 17.0).abs() < 1e-9);
        assert!((pick.amplitude - 2.0 * (1.0 / (1.0 + (pick.period - 17.0).abs()))).abs() < 0.01);
    }

    #[test]
    fn test_select_ties_keep_first() {
        let data = trace();
        let pick = select_max_period(&Flat, &window(&data), 30.0, 3).unwrap();
        assert!((pick.period - 8.0).abs() < 1e-12);
        assert!((pick.amplitude - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_select_no_signal() {
        let data = vec![0.0; 400];
        assert_eq!(
            select_max_period(&Flat, &window(&data), 30.0, 3),
            Err(AmplitudeError::NoSignal)
        );
    }

    #[test]
    fn test_select_rejects_bad_windows() {
        let data = trace();
        let mut w = window(&data);
        w.noise = 80..20;
        assert_eq!(
            select_max_period(&Flat, &w, 30.0, 3),
            Err(AmplitudeError::WindowOutOfBounds {
                begin: 80,
                end: 20,
                len: 400
            })
        );

        let mut w = window(&data);
        w.signal = 300..500;
        assert!(matches!(
            select_max_period(&Flat, &w, 30.0, 3),
            Err(AmplitudeError::WindowOutOfBounds { .. })
        ));

        let mut w = window(&data);
        w.signal = 200..200;
        assert_eq!(
            select_max_period(&Flat, &w, 30.0, 3),
            Err(AmplitudeError::EmptyWindow("signal"))
        );

        // No noise samples is allowed
        let mut w = window(&data);
        w.noise = 0..0;
        let pick = select_max_period(&Flat, &w, 30.0, 3).unwrap();
        assert!(pick.noise.abs() < f64::EPSILON);
    }

    #[test]
    fn test_amplitude_needs_distance() {
        let data = trace();
        let amp = MsMaxAmplitude::with_filter(Flat);
        assert_eq!(
            amp.measure(&window(&data)),
            Err(AmplitudeError::MissingDistance)
        );
    }

    #[test]
    fn test_amplitude_measurement() {
        let data = trace();
        let mut amp = MsMaxAmplitude::with_filter(PeakAt17).with_period_step(1);
        amp.set_distance_hint(30.0);
        let m = amp.measure(&window(&data)).unwrap();
        assert_eq!(m.period, Some(17.0));
        assert!((m.snr - 20.0).abs() < 0.5);
        assert_eq!((m.window.reference - start()).num_seconds(), 100);
        assert!((m.window.end - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_butterworth_scan_keeps_sine_amplitude() {
        // 20 s period sine sampled at 1 Hz
        let data: Vec<f64> = (0..2000)
            .map(|i| (2.0 * std::f64::consts::PI * f64::from(i) / 20.0).sin())
            .collect();
        let w = SignalWindow {
            data: &data,
            sampling_hz: 1.0,
            start: start(),
            noise: 0..200,
            signal: 1000..2000,
        };
        let pick = select_max_period(&ButterworthBandpass::default(), &w, 30.0, 3).unwrap();
        assert!((pick.period - 20.0).abs() < 1e-9);
        assert!(
            (pick.amplitude - 1.0).abs() < 0.05,
            "unit sine picked with amplitude {}",
            pick.amplitude
        );
    }

    #[test]
    fn test_period_step_from_settings() {
        let config = Config::from_toml_str("[msmax]\nperiod_step = 2\n").unwrap();
        assert_eq!(MsMaxAmplitude::from_settings(&config).unwrap().period_step(), 2);

        let config = Config::from_toml_str("[msmax]\nperiod_step = 0\n").unwrap();
        assert!(MsMaxAmplitude::from_settings(&config).is_err());

        assert_eq!(
            MsMaxAmplitude::from_settings(&Config::default())
                .unwrap()
                .period_step(),
            DEFAULT_PERIOD_STEP
        );
    }

    #[test]
    fn test_processor_requires_period() {
        let input = MagnitudeInput {
            amplitude: 1.0,
            period: None,
            snr: None,
            delta: 30.0,
            depth: 10.0,
            hypocenter: GeoPoint::new(0.0, 0.0),
            receiver: None,
        };
        let p = MsMaxMagnitude::new();
        assert!(matches!(
            p.compute_magnitude(&input),
            Err(MagnitudeError::PeriodOutOfRange { .. })
        ));
        let input = MagnitudeInput {
            period: Some(20.0),
            ..input
        };
        assert!(p.compute_magnitude(&input).is_ok());
    }
}
