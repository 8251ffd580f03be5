//! Gain and IQ Correction
//!
//! RF/band gain scaling and the per-band amplitude/phase imbalance
//! correction applied straight after capture.

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use super::block::SampleBlock;

/// Convert a gain in dB to a linear amplitude multiplier
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Scale both channels by the all-bands RF gain and the band gain
///
/// Each dB value is converted separately; both channels get the product.
pub fn apply_rf_gain(block: &mut SampleBlock, all_bands_db: f32, band_gain_db: f32) {
    let gain = db_to_linear(all_bands_db) * db_to_linear(band_gain_db);
    block.scale(gain);
}

/// Correct amplitude and phase imbalance between I and Q
///
/// Only I is amplitude corrected. A negative phase factor mixes I into Q,
/// otherwise Q is mixed into I.
pub fn apply_iq_correction(block: &mut SampleBlock, amp_factor: f32, phase_factor: f32) {
    let (i, q) = block.channels_mut();
    for si in i.iter_mut() {
        *si *= amp_factor;
    }
    if phase_factor < 0.0 {
        for (sq, &si) in q.iter_mut().zip(i.iter()) {
            *sq += phase_factor * si;
        }
    } else {
        for (si, &sq) in i.iter_mut().zip(q.iter()) {
            *si += phase_factor * sq;
        }
    }
}

/// Amplitude/phase correction pair for one band and direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IqCorrection {
    /// Multiplier for the I channel
    pub amplitude: f32,
    /// Cross-channel mixing factor
    pub phase: f32,
}

impl IqCorrection {
    /// No correction
    pub const IDENTITY: Self = Self {
        amplitude: 1.0,
        phase: 0.0,
    };

    /// Create a correction pair
    #[must_use]
    pub const fn new(amplitude: f32, phase: f32) -> Self {
        Self { amplitude, phase }
    }

    /// Apply to a block
    pub fn apply(&self, block: &mut SampleBlock) {
        apply_iq_correction(block, self.amplitude, self.phase);
    }
}

impl Default for IqCorrection {
    fn default() -> Self {
        Self::IDENTITY
    }
}
