//! Quadrature Oscillator
//!
//! Recursive complex rotator used for fine-tune frequency translation and
//! for synthetic test tones.

use core::f32::consts::PI;
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

/// Quadrature oscillator (I/Q generation)
///
/// Generates cosine and sine together by rotating a unit phasor once per
/// sample. Negative frequencies rotate clockwise.
#[derive(Clone, Copy, Debug)]
pub struct QuadratureOscillator {
    /// Sine state (imaginary part)
    sin_state: f32,
    /// Cosine state (real part)
    cos_state: f32,
    /// Rotation coefficient (sine of phase increment)
    sin_inc: f32,
    /// Rotation coefficient (cosine of phase increment)
    cos_inc: f32,
}

impl QuadratureOscillator {
    /// Create a stopped oscillator (0 Hz)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sin_state: 0.0,
            cos_state: 1.0,
            sin_inc: 0.0,
            cos_inc: 1.0,
        }
    }

    /// Create an oscillator at `freq_hz`
    #[must_use]
    pub fn with_frequency(freq_hz: f32, sample_rate: f32) -> Self {
        let mut osc = Self::new();
        osc.set_frequency(freq_hz, sample_rate);
        osc
    }

    /// Set frequency; keeps the current phase
    pub fn set_frequency(&mut self, freq_hz: f32, sample_rate: f32) {
        let phase_inc = 2.0 * PI * freq_hz / sample_rate;
        self.sin_inc = phase_inc.sin();
        self.cos_inc = phase_inc.cos();
    }

    /// Generate next (cos, sin) pair
    pub fn next(&mut self) -> (f32, f32) {
        let i = self.cos_state;
        let q = self.sin_state;

        let new_cos = self.cos_state * self.cos_inc - self.sin_state * self.sin_inc;
        let new_sin = self.sin_state * self.cos_inc + self.cos_state * self.sin_inc;
        self.cos_state = new_cos;
        self.sin_state = new_sin;

        // Renormalize to stop amplitude drift
        let mag_sq = new_cos * new_cos + new_sin * new_sin;
        if (mag_sq - 1.0).abs() > 0.0001 {
            let mag = mag_sq.sqrt();
            self.cos_state /= mag;
            self.sin_state /= mag;
        }

        (i, q)
    }

    /// Reset phase to zero
    pub fn reset(&mut self) {
        self.sin_state = 0.0;
        self.cos_state = 1.0;
    }
}

impl Default for QuadratureOscillator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_hz_is_constant_phasor() {
        let mut osc = QuadratureOscillator::new();
        for _ in 0..100 {
            assert_eq!(osc.next(), (1.0, 0.0));
        }
    }

    #[test]
    fn quarter_rate_steps_by_ninety_degrees() {
        let mut osc = QuadratureOscillator::with_frequency(12_000.0, 48_000.0);
        let expected = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
        for (c, s) in expected {
            let (i, q) = osc.next();
            assert_abs_diff_eq!(i, c, epsilon = 1e-5);
            assert_abs_diff_eq!(q, s, epsilon = 1e-5);
        }
    }

    #[test]
    fn amplitude_stays_unity() {
        let mut osc = QuadratureOscillator::with_frequency(-1234.5, 24_000.0);
        for _ in 0..100_000 {
            let (i, q) = osc.next();
            assert_abs_diff_eq!(i * i + q * q, 1.0, epsilon = 1e-3);
        }
    }
}
