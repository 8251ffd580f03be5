//! Demodulation
//!
//! Mode-dependent detection on decimated audio. Sideband selection has
//! already happened in the passband filter, so SSB only copies the real
//! part into both channels. AM uses an envelope detector with DC removal,
//! SAM the carrier-tracking PLL in [`super::sam`].

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use super::block::SampleBlock;
use super::sam::SamDemodulator;
use crate::config::AM_DC_POLE;
use crate::types::DemodMode;

/// AM envelope detector followed by a one-pole DC remover
#[derive(Clone, Copy, Debug, Default)]
pub struct AmDetector {
    w_old: f32,
}

impl AmDetector {
    /// Create a detector with a cleared DC remover
    #[must_use]
    pub const fn new() -> Self {
        Self { w_old: 0.0 }
    }

    /// Detect one sample pair
    pub fn detect(&mut self, i: f32, q: f32) -> f32 {
        let mut envelope = (i * i + q * q).sqrt();
        // Keep a NaN out of the DC remover state
        if envelope.is_nan() {
            envelope = 0.0;
        }
        let w = envelope + AM_DC_POLE * self.w_old;
        let out = w - self.w_old;
        self.w_old = w;
        out
    }

    /// Detect a block in place; audio is written to both channels
    pub fn process(&mut self, block: &mut SampleBlock) {
        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let audio = self.detect(*si, *sq);
            *si = audio;
            *sq = audio;
        }
    }

    /// Clear the DC remover
    pub fn reset(&mut self) {
        self.w_old = 0.0;
    }
}

/// Demodulator for all receive modes
#[derive(Clone, Copy, Debug, Default)]
pub struct Demodulator {
    am: AmDetector,
    sam: SamDemodulator,
    last_mode: Option<DemodMode>,
}

impl Demodulator {
    /// Create a demodulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Demodulate a block in place
    ///
    /// Entering AM or SAM from another mode clears that detector's state.
    pub fn process(&mut self, mode: DemodMode, block: &mut SampleBlock) {
        if self.last_mode != Some(mode) {
            match mode {
                DemodMode::Am => self.am.reset(),
                DemodMode::Sam => self.sam.reset(),
                DemodMode::Usb | DemodMode::Lsb => {}
            }
            self.last_mode = Some(mode);
        }

        match mode {
            DemodMode::Usb | DemodMode::Lsb => block.copy_i_to_q(),
            DemodMode::Am => self.am.process(block),
            DemodMode::Sam => self.sam.process(block),
        }
    }

    /// Smoothed SAM carrier offset in Hz
    #[must_use]
    pub const fn sam_carrier_offset_hz(&self) -> f32 {
        self.sam.carrier_offset_hz()
    }

    /// Enable or disable the SAM fade leveler
    pub fn set_sam_fade_leveler(&mut self, enabled: bool) {
        self.sam.set_fade_leveler(enabled);
    }

    /// SAM loop, for inspection
    #[must_use]
    pub const fn sam(&self) -> &SamDemodulator {
        &self.sam
    }
}
