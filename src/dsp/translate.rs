//! Frequency Translation
//!
//! Moves the received spectrum before decimation: a multiplication-free
//! quarter-sample-rate shift, then an arbitrary fine-tune rotation.

use super::block::SampleBlock;
use super::oscillator::QuadratureOscillator;

/// Direction of the quarter-rate shift
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShiftDirection {
    /// Multiply by `e^{-jπn/2}` (spectrum moves down by fs/4)
    #[default]
    Down,
    /// Multiply by `e^{+jπn/2}` (spectrum moves up by fs/4)
    Up,
}

/// Quarter-sample-rate shifter
///
/// Every fourth sample needs only sign changes and an I/Q swap. The
/// rotation step is carried across calls so any block length stays
/// phase continuous.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuarterRateShifter {
    direction: ShiftDirection,
    step: u8,
}

impl QuarterRateShifter {
    /// Create a shifter starting at rotation step 0
    #[must_use]
    pub const fn new(direction: ShiftDirection) -> Self {
        Self { direction, step: 0 }
    }

    /// Shift direction
    #[must_use]
    pub const fn direction(&self) -> ShiftDirection {
        self.direction
    }

    /// Shift the block in place
    pub fn process(&mut self, block: &mut SampleBlock) {
        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (a, b) = (*si, *sq);
            let (ni, nq) = match (self.step, self.direction) {
                (0, _) => (a, b),
                (2, _) => (-a, -b),
                (1, ShiftDirection::Down) | (3, ShiftDirection::Up) => (b, -a),
                _ => (-b, a),
            };
            *si = ni;
            *sq = nq;
            self.step = (self.step + 1) & 3;
        }
    }

    /// Restart the rotation at step 0
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

/// Fine-tune shifter: per-sample complex rotation by an arbitrary offset
#[derive(Clone, Copy, Debug)]
pub struct FineTuneShifter {
    osc: QuadratureOscillator,
    offset_hz: f32,
    sample_rate: u32,
}

impl FineTuneShifter {
    /// Create a shifter with no offset
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            osc: QuadratureOscillator::new(),
            offset_hz: 0.0,
            sample_rate,
        }
    }

    /// Set the offset; positive values move the spectrum up
    pub fn set_offset(&mut self, offset_hz: f32, sample_rate: u32) {
        if offset_hz == self.offset_hz && sample_rate == self.sample_rate {
            return;
        }
        self.offset_hz = offset_hz;
        self.sample_rate = sample_rate;
        self.osc.set_frequency(offset_hz, sample_rate as f32);
    }

    /// Rotate the block in place; a zero offset leaves it untouched
    pub fn process(&mut self, block: &mut SampleBlock) {
        if self.offset_hz == 0.0 {
            return;
        }
        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (c, s) = self.osc.next();
            let (a, b) = (*si, *sq);
            *si = a * c - b * s;
            *sq = a * s + b * c;
        }
    }
}
