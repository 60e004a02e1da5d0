//! Band-pass filtering of waveform samples.
//!
//! The surface-wave amplitude only depends on the [`BandpassFilter`] trait.
//! [`ButterworthBandpass`] is the stock implementation: a Butterworth
//! high-pass at the lower corner cascaded with a Butterworth low-pass at the
//! upper corner, both built from second-order sections. The cascade is scaled
//! to unit gain at the geometric band centre.

use std::f64::consts::PI;

use crate::errors::AmplitudeError;

/// Default Butterworth order.
pub const DEFAULT_ORDER: usize = 3;

/// Filters a trace in place to a frequency band.
pub trait BandpassFilter {
    /// Restrict `data` to `low_hz..high_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`AmplitudeError::InvalidBand`] if the band is empty or not
    /// below Nyquist.
    fn apply(
        &self,
        data: &mut [f64],
        sampling_hz: f64,
        low_hz: f64,
        high_hz: f64,
    ) -> Result<(), AmplitudeError>;
}

/// Causal Butterworth band-pass.
#[derive(Debug, Clone, Copy)]
pub struct ButterworthBandpass {
    order: usize,
}

impl ButterworthBandpass {
    /// Create a filter of the given order (at least 1).
    #[must_use]
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
        }
    }

    fn sections(&self, sampling_hz: f64, low_hz: f64, high_hz: f64) -> Vec<Biquad> {
        let mut sections = Vec::with_capacity(self.order + 1);
        for q in butterworth_q(self.order) {
            sections.push(Biquad::highpass(low_hz, sampling_hz, q));
            sections.push(Biquad::lowpass(high_hz, sampling_hz, q));
        }
        if self.order % 2 == 1 {
            sections.push(Biquad::first_order_highpass(low_hz, sampling_hz));
            sections.push(Biquad::first_order_lowpass(high_hz, sampling_hz));
        }
        sections
    }
}

impl Default for ButterworthBandpass {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}

impl BandpassFilter for ButterworthBandpass {
    fn apply(
        &self,
        data: &mut [f64],
        sampling_hz: f64,
        low_hz: f64,
        high_hz: f64,
    ) -> Result<(), AmplitudeError> {
        let nyquist = sampling_hz / 2.0;
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(AmplitudeError::InvalidBand {
                low: low_hz,
                high: high_hz,
                nyquist,
            });
        }

        let sections = self.sections(sampling_hz, low_hz, high_hz);
        let centre = (low_hz * high_hz).sqrt();
        let gain: f64 = sections
            .iter()
            .map(|s| s.gain_at(centre, sampling_hz))
            .product();

        for mut section in sections {
            section.process(data);
        }
        if gain.is_finite() && gain > 0.0 {
            data.iter_mut().for_each(|x| *x /= gain);
        }
        Ok(())
    }
}

/// Q factors of the conjugate pole pairs of an order-`n` Butterworth filter.
fn butterworth_q(order: usize) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let n = order as f64;
    let odd = (order % 2) as f64;
    (1..=order / 2)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let psi = PI * (2.0 * k as f64 - 1.0 + odd) / (2.0 * n);
            1.0 / (2.0 * psi.cos())
        })
        .collect()
}

/// Second-order IIR section, transposed direct form II.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn lowpass(cutoff: f64, fs: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalized(
            [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    fn highpass(cutoff: f64, fs: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalized(
            [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    fn first_order_lowpass(cutoff: f64, fs: f64) -> Self {
        let k = (PI * cutoff / fs).tan();
        Self::normalized([k, k, 0.0], [1.0 + k, k - 1.0, 0.0])
    }

    fn first_order_highpass(cutoff: f64, fs: f64) -> Self {
        let k = (PI * cutoff / fs).tan();
        Self::normalized([1.0, -1.0, 0.0], [1.0 + k, k - 1.0, 0.0])
    }

    /// Magnitude response at `freq` Hz.
    fn gain_at(&self, freq: f64, fs: f64) -> f64 {
        let w = 2.0 * PI * freq / fs;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();
        let num = (self.b0 + self.b1 * c1 + self.b2 * c2).hypot(self.b1 * s1 + self.b2 * s2);
        let den = (1.0 + self.a1 * c1 + self.a2 * c2).hypot(self.a1 * s1 + self.a2 * s2);
        num / den
    }

    fn process(&mut self, data: &mut [f64]) {
        for x in data.iter_mut() {
            let input = *x;
            let y = self.b0 * input + self.z1;
            self.z1 = self.b1 * input - self.a1 * y + self.z2;
            self.z2 = self.b2 * input - self.a2 * y;
            *x = y;
        }
    }
}
