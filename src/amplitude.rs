//! Amplitude measurement primitives and the MLa amplitude adapter.
//!
//! [`PeakAmplitude`] measures a peak-to-peak style amplitude and can be
//! switched between measurement modes. [`ZeroToPeakAdapter`] wraps it in the
//! absolute-maximum mode, halves the result, and refuses any attempt to
//! reconfigure it.

use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::errors::AmplitudeError;
use crate::models::{AmplitudeMeasurement, TimeWindow};

/// Furthest station, in degrees, the MLa amplitude is measured for.
pub const MLA_MAX_DISTANCE_DEG: f64 = 11.0;

/// A slice of waveform with its noise and signal windows.
#[derive(Debug, Clone)]
pub struct SignalWindow<'a> {
    /// Samples (already instrument corrected and filtered)
    pub data: &'a [f64],
    /// Sampling rate in Hz
    pub sampling_hz: f64,
    /// Time of `data[0]`
    pub start: DateTime<Utc>,
    /// Sample range used to estimate the noise offset and level
    pub noise: Range<usize>,
    /// Sample range searched for the amplitude
    pub signal: Range<usize>,
}

impl SignalWindow<'_> {
    /// Samples of a non-empty range.
    pub(crate) fn checked(
        &self,
        range: &Range<usize>,
        what: &'static str,
    ) -> Result<&[f64], AmplitudeError> {
        if range.start >= range.end {
            return Err(AmplitudeError::EmptyWindow(what));
        }
        self.bounded(range)
    }

    /// Samples of a range that may be empty but must not be reversed or past the end.
    pub(crate) fn bounded(&self, range: &Range<usize>) -> Result<&[f64], AmplitudeError> {
        self.data
            .get(range.clone())
            .ok_or(AmplitudeError::WindowOutOfBounds {
                begin: range.start,
                end: range.end,
                len: self.data.len(),
            })
    }

    #[allow(clippy::cast_precision_loss)]
    fn seconds(&self, samples: isize) -> f64 {
        samples as f64 / self.sampling_hz
    }

    #[allow(clippy::cast_possible_truncation)]
    fn time_of(&self, sample: isize) -> DateTime<Utc> {
        let micros = (self.seconds(sample) * 1e6).round() as i64;
        self.start + chrono::Duration::microseconds(micros)
    }
}

/// Measures an amplitude from a signal window.
pub trait AmplitudeMeasure {
    /// # Errors
    ///
    /// Returns an error if the window is unusable or holds no signal.
    fn measure(&self, window: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError>;
}

/// How [`PeakAmplitude`] turns the signal window into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmplitudeMode {
    /// Twice the largest absolute deviation from the noise offset
    #[default]
    AbsMax,
    /// Largest minus smallest sample
    MinMax,
}

impl AmplitudeMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbsMax => "AbsMax",
            Self::MinMax => "MinMax",
        }
    }
}

impl std::str::FromStr for AmplitudeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absmax" => Ok(Self::AbsMax),
            "minmax" => Ok(Self::MinMax),
            _ => Err(format!("unknown amplitude mode: {s} (expected: AbsMax, MinMax)")),
        }
    }
}

/// Configurable aspects of an amplitude processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Selects the [`AmplitudeMode`]
    MeasureType,
}

/// Peak-to-peak amplitude primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakAmplitude {
    mode: AmplitudeMode,
}

impl PeakAmplitude {
    #[must_use]
    pub fn new(mode: AmplitudeMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> AmplitudeMode {
        self.mode
    }

    /// Capabilities callers may configure.
    #[must_use]
    pub fn capabilities(&self) -> &'static [Capability] {
        &[Capability::MeasureType]
    }

    /// Accepted values for a capability.
    #[must_use]
    pub fn capability_parameters(&self, cap: Capability) -> Vec<&'static str> {
        match cap {
            Capability::MeasureType => vec![
                AmplitudeMode::AbsMax.as_str(),
                AmplitudeMode::MinMax.as_str(),
            ],
        }
    }

    /// Set a capability. Returns whether the value was accepted.
    pub fn set_parameter(&mut self, cap: Capability, value: &str) -> bool {
        match cap {
            Capability::MeasureType => match value.parse() {
                Ok(mode) => {
                    self.mode = mode;
                    true
                }
                Err(_) => false,
            },
        }
    }

    /// (amplitude, index of the extremum within `samples`)
    fn extent(&self, samples: &[f64], offset: f64) -> (f64, usize) {
        match self.mode {
            AmplitudeMode::AbsMax => {
                let (idx, dev) = samples
                    .iter()
                    .map(|x| (x - offset).abs())
                    .enumerate()
                    .fold((0, 0.0f64), |best, (i, d)| if d > best.1 { (i, d) } else { best });
                (2.0 * dev, idx)
            }
            AmplitudeMode::MinMax => {
                let (mut imin, mut imax) = (0, 0);
                for (i, x) in samples.iter().enumerate() {
                    if *x < samples[imin] {
                        imin = i;
                    }
                    if *x > samples[imax] {
                        imax = i;
                    }
                }
                let pick = if (samples[imax] - offset).abs() >= (samples[imin] - offset).abs() {
                    imax
                } else {
                    imin
                };
                (samples[imax] - samples[imin], pick)
            }
        }
    }
}

impl AmplitudeMeasure for PeakAmplitude {
    fn measure(&self, window: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError> {
        if !(window.sampling_hz.is_finite() && window.sampling_hz > 0.0) {
            return Err(AmplitudeError::InvalidSamplingRate(window.sampling_hz));
        }
        let noise = window.checked(&window.noise, "noise")?;
        let signal = window.checked(&window.signal, "signal")?;

        #[allow(clippy::cast_precision_loss)]
        let offset = noise.iter().sum::<f64>() / noise.len() as f64;

        let (value, idx) = self.extent(signal, offset);
        if !(value.is_finite() && value > 0.0) {
            return Err(AmplitudeError::NoSignal);
        }
        let (noise_level, _) = self.extent(noise, offset);
        let snr = if noise_level > 0.0 {
            value / noise_level
        } else {
            f64::INFINITY
        };

        let pick = window.signal.start + idx;
        let pick_isize = isize::try_from(pick).unwrap_or(isize::MAX);
        let begin = isize::try_from(window.signal.start).unwrap_or(isize::MAX);
        let end = isize::try_from(window.signal.end).unwrap_or(isize::MAX);

        Ok(AmplitudeMeasurement {
            value,
            period: None,
            snr,
            window: TimeWindow {
                reference: window.time_of(pick_isize),
                begin: window.seconds(begin - pick_isize),
                end: window.seconds(end - pick_isize),
            },
        })
    }
}

/// MLa amplitude: absolute-maximum peak-to-peak halved to zero-to-peak.
///
/// Exposes only measuring. Capability negotiation always reports nothing
/// and never changes the measurement.
#[derive(Debug, Clone)]
pub struct ZeroToPeakAdapter<P = PeakAmplitude> {
    inner: P,
    max_distance: f64,
}

impl ZeroToPeakAdapter<PeakAmplitude> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PeakAmplitude::new(AmplitudeMode::AbsMax),
            max_distance: MLA_MAX_DISTANCE_DEG,
        }
    }
}

impl Default for ZeroToPeakAdapter<PeakAmplitude> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: AmplitudeMeasure> ZeroToPeakAdapter<P> {
    #[cfg(test)]
    pub(crate) fn with_primitive(inner: P) -> Self {
        Self {
            inner,
            max_distance: MLA_MAX_DISTANCE_DEG,
        }
    }

    /// Peak-to-peak to zero-to-peak. Only `value` changes.
    #[must_use]
    pub fn adjust(measurement: AmplitudeMeasurement) -> AmplitudeMeasurement {
        AmplitudeMeasurement {
            value: measurement.value * 0.5,
            ..measurement
        }
    }

    /// Measure and adjust. Primitive failures pass through unscaled.
    ///
    /// # Errors
    ///
    /// Returns the primitive's error unchanged.
    pub fn measure(&self, window: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError> {
        self.inner.measure(window).map(Self::adjust)
    }

    /// Measure for a station at `delta` degrees from the epicenter.
    ///
    /// # Errors
    ///
    /// Returns [`AmplitudeError::DistanceOutOfRange`] beyond the maximum
    /// distance, otherwise as [`Self::measure`].
    pub fn measure_station(
        &self,
        window: &SignalWindow<'_>,
        delta: f64,
    ) -> Result<AmplitudeMeasurement, AmplitudeError> {
        if !(0.0..=self.max_distance).contains(&delta) {
            return Err(AmplitudeError::DistanceOutOfRange {
                delta,
                max: self.max_distance,
            });
        }
        self.measure(window)
    }

    #[must_use]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Always empty: the measurement mode is fixed.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Always empty.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn capability_parameters(&self, _cap: Capability) -> Vec<&'static str> {
        Vec::new()
    }

    /// Always rejected.
    #[allow(clippy::unused_self)]
    pub fn set_parameter(&self, _cap: Capability, _value: &str) -> bool {
        false
    }
}

impl<P: AmplitudeMeasure> AmplitudeMeasure for ZeroToPeakAdapter<P> {
    fn measure(&self, window: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError> {
        Self::measure(self, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Noise offset 1.0, then a spike of +5 and a trough of -2 around it.
    fn trace() -> Vec<f64> {
        let mut data = vec![1.0; 100];
        data[60] = 6.0;
        data[70] = -1.0;
        data
    }

    fn window(data: &[f64]) -> SignalWindow<'_> {
        SignalWindow {
            data,
            sampling_hz: 10.0,
            start: start(),
            noise: 0..50,
            signal: 50..100,
        }
    }

    struct Fixed(Result<AmplitudeMeasurement, AmplitudeError>);

    impl AmplitudeMeasure for Fixed {
        fn measure(&self, _: &SignalWindow<'_>) -> Result<AmplitudeMeasurement, AmplitudeError> {
            self.0.clone()
        }
    }

    fn measurement(value: f64) -> AmplitudeMeasurement {
        AmplitudeMeasurement {
            value,
            period: Some(0.4),
            snr: 12.0,
            window: TimeWindow {
                reference: start(),
                begin: -1.0,
                end: 3.0,
            },
        }
    }

    #[test]
    fn test_abs_max() {
        let data = trace();
        let m = PeakAmplitude::new(AmplitudeMode::AbsMax)
            .measure(&window(&data))
            .unwrap();
        assert!((m.value - 10.0).abs() < 1e-12);
        assert_eq!(m.period, None);
        assert!(m.snr.is_infinite());
        assert!((m.window.begin + 1.0).abs() < 1e-12);
        assert!((m.window.end - 4.0).abs() < 1e-12);
        assert_eq!((m.window.reference - start()).num_milliseconds(), 6000);
    }

    #[test]
    fn test_min_max() {
        let data = trace();
        let m = PeakAmplitude::new(AmplitudeMode::MinMax)
            .measure(&window(&data))
            .unwrap();
        assert!((m.value - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_snr() {
        let mut data = trace();
        data[10] = 1.5;
        let m = PeakAmplitude::default().measure(&window(&data)).unwrap();
        // Offset is ~1.01; signal dev ~4.99, noise dev ~0.49
        assert!(m.snr > 9.0 && m.snr < 11.0, "snr {}", m.snr);
    }

    #[test]
    fn test_window_errors() {
        let data = trace();
        let mut w = window(&data);
        w.signal = 50..50;
        assert_eq!(
            PeakAmplitude::default().measure(&w),
            Err(AmplitudeError::EmptyWindow("signal"))
        );
        w.signal = 50..200;
        assert!(matches!(
            PeakAmplitude::default().measure(&w),
            Err(AmplitudeError::WindowOutOfBounds { .. })
        ));

        let flat = vec![1.0; 100];
        assert_eq!(
            PeakAmplitude::default().measure(&window(&flat)),
            Err(AmplitudeError::NoSignal)
        );
    }

    #[test]
    fn test_primitive_capabilities() {
        let mut p = PeakAmplitude::default();
        assert_eq!(p.capabilities(), &[Capability::MeasureType]);
        assert!(p.set_parameter(Capability::MeasureType, "MinMax"));
        assert_eq!(p.mode(), AmplitudeMode::MinMax);
        assert!(!p.set_parameter(Capability::MeasureType, "RMS"));
        assert_eq!(p.mode(), AmplitudeMode::MinMax);
    }

    #[test]
    fn test_adapter_halves() {
        let adapter = ZeroToPeakAdapter::with_primitive(Fixed(Ok(measurement(8.0))));
        let m = adapter.measure(&window(&trace())).unwrap();
        assert_eq!(m.value, 4.0);
        assert_eq!(m.period, Some(0.4));
        assert_eq!(m.snr, 12.0);
        assert_eq!(m.window, measurement(8.0).window);
    }

    #[test]
    fn test_adapter_propagates_failure() {
        let adapter = ZeroToPeakAdapter::with_primitive(Fixed(Err(AmplitudeError::NoSignal)));
        assert_eq!(
            adapter.measure(&window(&trace())),
            Err(AmplitudeError::NoSignal)
        );
    }

    #[test]
    fn test_adapter_uses_abs_max() {
        let data = trace();
        let m = ZeroToPeakAdapter::new().measure(&window(&data)).unwrap();
        assert!((m.value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_adapter_capabilities_locked() {
        let adapter = ZeroToPeakAdapter::new();
        let data = trace();
        let before = adapter.measure(&window(&data)).unwrap();

        assert!(adapter.capabilities().is_empty());
        assert!(adapter.capability_parameters(Capability::MeasureType).is_empty());
        for value in ["MinMax", "AbsMax", "", "garbage"] {
            assert!(!adapter.set_parameter(Capability::MeasureType, value));
        }

        assert_eq!(adapter.measure(&window(&data)).unwrap(), before);
    }

    #[test]
    fn test_adapter_max_distance() {
        let adapter = ZeroToPeakAdapter::new();
        let data = trace();
        assert!(adapter.measure_station(&window(&data), 10.9).is_ok());
        assert!(matches!(
            adapter.measure_station(&window(&data), 11.5),
            Err(AmplitudeError::DistanceOutOfRange { .. })
        ));
    }
}
