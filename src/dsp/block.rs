//! Sample Block
//!
//! The unit of work for one pipeline pass: paired I/Q channels with a
//! shared length and the sample rate they are currently at.

use heapless::Vec;
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use crate::config::READ_BUFFER_SIZE;

/// One pass worth of I/Q samples
///
/// Both channels always have the same length. The length and the sample
/// rate only change together, through [`SampleBlock::resize_with_rate`].
#[derive(Clone, Debug)]
pub struct SampleBlock {
    i: Vec<f32, READ_BUFFER_SIZE>,
    q: Vec<f32, READ_BUFFER_SIZE>,
    sample_rate: u32,
}

impl SampleBlock {
    /// Maximum samples per channel
    pub const CAPACITY: usize = READ_BUFFER_SIZE;

    /// Create an empty block at the given sample rate
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            i: Vec::new(),
            q: Vec::new(),
            sample_rate,
        }
    }

    /// Create a block from channel slices
    ///
    /// Takes the shorter of the two slices, limited to [`Self::CAPACITY`].
    #[must_use]
    pub fn from_iq(i: &[f32], q: &[f32], sample_rate: u32) -> Self {
        let mut block = Self::new(sample_rate);
        for (&si, &sq) in i.iter().zip(q) {
            if !block.push(si, sq) {
                break;
            }
        }
        block
    }

    /// Samples per channel
    #[must_use]
    pub fn len(&self) -> usize {
        self.i.len()
    }

    /// Check if the block holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    /// Current sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// In-phase channel
    #[must_use]
    pub fn i(&self) -> &[f32] {
        &self.i
    }

    /// Quadrature channel
    #[must_use]
    pub fn q(&self) -> &[f32] {
        &self.q
    }

    /// Mutable in-phase channel
    pub fn i_mut(&mut self) -> &mut [f32] {
        &mut self.i
    }

    /// Mutable quadrature channel
    pub fn q_mut(&mut self) -> &mut [f32] {
        &mut self.q
    }

    /// Both channels, mutably
    pub fn channels_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.i, &mut self.q)
    }

    /// Append one I/Q pair; returns false when the block is full
    pub fn push(&mut self, i: f32, q: f32) -> bool {
        if self.i.is_full() {
            return false;
        }
        // Both vectors share a length, so neither push can fail here
        let _ = self.i.push(i);
        let _ = self.q.push(q);
        true
    }

    /// Drop all samples and set the rate for the next fill
    pub fn clear_with_rate(&mut self, sample_rate: u32) {
        self.i.clear();
        self.q.clear();
        self.sample_rate = sample_rate;
    }

    /// Change length and sample rate together
    ///
    /// New samples are zero. The length is limited to [`Self::CAPACITY`].
    /// Only decimation and interpolation stages should call this.
    pub fn resize_with_rate(&mut self, len: usize, sample_rate: u32) {
        let len = len.min(Self::CAPACITY);
        // `len` is within capacity, so resizing cannot fail
        let _ = self.i.resize(len, 0.0);
        let _ = self.q.resize(len, 0.0);
        self.sample_rate = sample_rate;
    }

    /// Multiply both channels by a gain
    pub fn scale(&mut self, gain: f32) {
        for (i, q) in self.i.iter_mut().zip(self.q.iter_mut()) {
            *i *= gain;
            *q *= gain;
        }
    }

    /// Copy the in-phase channel over the quadrature channel
    pub fn copy_i_to_q(&mut self) {
        self.q.copy_from_slice(&self.i);
    }

    /// Largest absolute sample value across both channels
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.i
            .iter()
            .chain(self.q.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }
}

impl Default for SampleBlock {
    fn default() -> Self {
        Self::new(crate::config::NATIVE_SAMPLE_RATE)
    }
}
