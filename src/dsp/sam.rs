//! Synchronous AM Demodulator
//!
//! A second-order digital PLL locks a local oscillator to the AM carrier.
//! The input is mixed down by the tracked phase, so the audio comes out
//! of a coherent product detector instead of an envelope detector and
//! survives selective fading much better.

use core::f32::consts::{FRAC_PI_2, PI, TAU};
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use super::block::SampleBlock;
use crate::config::{
    DECIMATED_BLOCK_SIZE, DECIMATED_SAMPLE_RATE, SAM_OMEGA_N, SAM_PLL_FMAX_HZ, SAM_TAU_I,
    SAM_TAU_R, SAM_ZETA,
};
use crate::diag::diag_warn;

/// Polynomial arctangent for `|z| <= 1`
fn approx_atan(z: f32) -> f32 {
    const N1: f32 = 0.972_394_1;
    const N2: f32 = -0.191_947_95;
    (N1 + N2 * z * z) * z
}

/// Fast four-quadrant arctangent
///
/// Folds the argument into `|z| <= 1` and evaluates a two-term
/// polynomial. Maximum error is about 0.28 degrees. `(0, 0)` gives 0.
#[must_use]
pub fn approx_atan2(y: f32, x: f32) -> f32 {
    if x != 0.0 {
        if x.abs() > y.abs() {
            let z = y / x;
            if x > 0.0 {
                approx_atan(z)
            } else if y >= 0.0 {
                approx_atan(z) + PI
            } else {
                approx_atan(z) - PI
            }
        } else {
            let z = x / y;
            if y > 0.0 {
                FRAC_PI_2 - approx_atan(z)
            } else {
                -FRAC_PI_2 - approx_atan(z)
            }
        }
    } else if y > 0.0 {
        FRAC_PI_2
    } else if y < 0.0 {
        -FRAC_PI_2
    } else {
        0.0
    }
}

/// Wrap a phase into `[0, 2π)`
///
/// Phase steps are always less than one turn, so repeated subtraction
/// terminates after one or two iterations.
fn wrap_phase(mut phase: f32) -> f32 {
    while phase >= TAU {
        phase -= TAU;
    }
    while phase < 0.0 {
        phase += TAU;
    }
    // -tiny + 2π can round up to exactly 2π
    if phase >= TAU {
        0.0
    } else {
        phase
    }
}

/// Synchronous AM demodulator with carrier-tracking PLL
#[derive(Clone, Copy, Debug)]
pub struct SamDemodulator {
    sample_rate: u32,
    /// Proportional loop gain
    g1: f32,
    /// Integral loop gain
    g2: f32,
    omega_min: f32,
    omega_max: f32,
    /// Audio DC tracker pole
    mtau_r: f32,
    /// Carrier DC tracker pole
    mtau_i: f32,
    fade_leveler: bool,

    /// Tracked carrier phase in `[0, 2π)`
    phase: f32,
    /// Loop integrator (carrier frequency in radians per sample)
    omega2: f32,
    /// Loop filter output applied on the next sample
    fil_out: f32,
    dc: f32,
    dc_insert: f32,
    /// Smoothed carrier offset in Hz
    carrier_offset_hz: f32,
}

impl SamDemodulator {
    /// Create a demodulator for the decimated audio rate
    #[must_use]
    pub fn new() -> Self {
        Self::with_sample_rate(DECIMATED_SAMPLE_RATE)
    }

    /// Create a demodulator for an arbitrary sample rate
    #[must_use]
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        let fs = sample_rate.max(1) as f32;
        let g1 = 1.0 - (-2.0 * SAM_OMEGA_N * SAM_ZETA / fs).exp();
        let g2 = -g1
            + 2.0
                * (1.0
                    - (-SAM_OMEGA_N * SAM_ZETA / fs).exp()
                        * (SAM_OMEGA_N / fs * (1.0 - SAM_ZETA * SAM_ZETA).sqrt()).cos());
        let omega_max = TAU * SAM_PLL_FMAX_HZ / fs;

        Self {
            sample_rate,
            g1,
            g2,
            omega_min: -omega_max,
            omega_max,
            mtau_r: (-1.0 / (fs * SAM_TAU_R)).exp(),
            mtau_i: (-1.0 / (fs * SAM_TAU_I)).exp(),
            fade_leveler: true,
            phase: 0.0,
            omega2: 0.0,
            fil_out: 0.0,
            dc: 0.0,
            dc_insert: 0.0,
            carrier_offset_hz: 0.0,
        }
    }

    /// Enable or disable the fade leveler
    pub fn set_fade_leveler(&mut self, enabled: bool) {
        self.fade_leveler = enabled;
    }

    /// Demodulate a block in place; audio is written to both channels
    pub fn process(&mut self, block: &mut SampleBlock) {
        if block.len() != DECIMATED_BLOCK_SIZE || block.sample_rate() != self.sample_rate {
            diag_warn!(
                "SAM expects {} samples at {} Hz, got {} at {} Hz",
                DECIMATED_BLOCK_SIZE,
                self.sample_rate,
                block.len(),
                block.sample_rate()
            );
        }

        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let audio = self.step(*si, *sq);
            *si = audio;
            *sq = audio;
        }

        let carrier = self.omega2 * self.sample_rate as f32 / TAU;
        self.carrier_offset_hz = 0.95 * self.carrier_offset_hz + 0.05 * carrier;
    }

    fn step(&mut self, i: f32, q: f32) -> f32 {
        // A NaN sample contributes nothing to the trackers
        let (i, q) = if i.is_nan() || q.is_nan() {
            (0.0, 0.0)
        } else {
            (i, q)
        };

        let (sin, cos) = (self.phase.sin(), self.phase.cos());
        let ai = cos * i;
        let bi = sin * i;
        let aq = cos * q;
        let bq = sin * q;

        let corr0 = ai + bq;
        let corr1 = aq - bi;

        let mut audio = (ai - bi) + (aq + bq);
        if self.fade_leveler {
            self.dc = self.mtau_r * self.dc + (1.0 - self.mtau_r) * audio;
            self.dc_insert = self.mtau_i * self.dc_insert + (1.0 - self.mtau_i) * corr0;
            audio += self.dc_insert - self.dc;
        }

        let det = approx_atan2(corr1, corr0);
        let del_out = self.fil_out;
        self.omega2 = (self.omega2 + self.g2 * det).clamp(self.omega_min, self.omega_max);
        self.fil_out = self.g1 * det + self.omega2;
        self.phase = wrap_phase(self.phase + del_out);

        audio
    }

    /// Smoothed carrier offset in Hz (for calibration displays)
    #[must_use]
    pub const fn carrier_offset_hz(&self) -> f32 {
        self.carrier_offset_hz
    }

    /// Current tracked phase in radians
    #[must_use]
    pub const fn phase(&self) -> f32 {
        self.phase
    }

    /// Clear loop state (on re-entering SAM mode)
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.omega2 = 0.0;
        self.fil_out = 0.0;
        self.dc = 0.0;
        self.dc_insert = 0.0;
        self.carrier_offset_hz = 0.0;
    }
}

impl Default for SamDemodulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn atan2_matches_reference() {
        let tolerance = 0.3f32.to_radians();
        for step in 0..3600 {
            let angle = (step as f32 * 0.1 - 179.95).to_radians();
            let (y, x) = (angle.sin() * 0.7, angle.cos() * 0.7);
            let mut err = approx_atan2(y, x) - y.atan2(x);
            if err > PI {
                err -= TAU;
            } else if err < -PI {
                err += TAU;
            }
            assert!(err.abs() < tolerance, "error {err} at {angle}");
        }
    }

    #[test]
    fn atan2_axes() {
        assert_eq!(approx_atan2(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(approx_atan2(1.0, 0.0), FRAC_PI_2);
        assert_abs_diff_eq!(approx_atan2(-1.0, 0.0), -FRAC_PI_2);
        assert_abs_diff_eq!(approx_atan2(0.0, 1.0), 0.0);
        assert_abs_diff_eq!(approx_atan2(0.0, -1.0), PI);
    }

    #[test]
    fn wrap_stays_in_range() {
        assert_eq!(wrap_phase(TAU), 0.0);
        assert!(wrap_phase(-1e-9) < TAU);
        assert_abs_diff_eq!(wrap_phase(TAU + 1.0), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(wrap_phase(-1.0), TAU - 1.0, epsilon = 1e-5);
    }

    #[test]
    fn nan_sample_is_ignored() {
        let mut sam = SamDemodulator::new();
        let mut block = SampleBlock::from_iq(&[0.5; 256], &[0.0; 256], DECIMATED_SAMPLE_RATE);
        block.i_mut()[10] = f32::NAN;
        sam.process(&mut block);
        assert!(block.i().iter().all(|s| s.is_finite()));
        assert!(sam.phase().is_finite());
    }

    #[test]
    fn reset_clears_loop() {
        let mut sam = SamDemodulator::new();
        let mut block = SampleBlock::from_iq(&[0.3; 256], &[0.4; 256], DECIMATED_SAMPLE_RATE);
        sam.process(&mut block);
        sam.reset();
        assert_eq!(sam.phase(), 0.0);
        assert_eq!(sam.carrier_offset_hz(), 0.0);
    }
}
