//! Sample Source/Sink Adapter
//!
//! Moves 16-bit codec blocks between the interrupt-driven sample queues and
//! the floating-point [`SampleBlock`]. Availability is reported, never
//! waited on: a pass that finds too few blocks is simply skipped.

use fixed::types::I1F15;
use heapless::spsc::{Consumer, Producer, Queue};

use super::block::SampleBlock;
use crate::config::{BLOCKS_PER_PASS, CAPTURE_BLOCK_SIZE, SAMPLE_QUEUE_DEPTH};
use crate::diag::{diag_debug, diag_warn};

/// Codec sample in Q1.15
pub type Sample = I1F15;

/// Convert a raw Q1.15 codec sample to a normalized float
#[must_use]
pub fn sample_to_f32(raw: i16) -> f32 {
    Sample::from_bits(raw).to_num::<f32>()
}

/// Convert a normalized float to a raw Q1.15 codec sample
///
/// Out-of-range values saturate; NaN becomes silence.
#[must_use]
pub fn f32_to_sample(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    Sample::saturating_from_num(value).to_bits()
}

/// One queue block of raw codec samples
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawBlock {
    /// In-phase (left) samples
    pub i: [i16; CAPTURE_BLOCK_SIZE],
    /// Quadrature (right) samples
    pub q: [i16; CAPTURE_BLOCK_SIZE],
}

impl RawBlock {
    /// Silent block
    pub const ZERO: Self = Self {
        i: [0; CAPTURE_BLOCK_SIZE],
        q: [0; CAPTURE_BLOCK_SIZE],
    };

    /// Block with constant channel values
    #[must_use]
    pub const fn filled(i: i16, q: i16) -> Self {
        Self {
            i: [i; CAPTURE_BLOCK_SIZE],
            q: [q; CAPTURE_BLOCK_SIZE],
        }
    }
}

impl Default for RawBlock {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Producer side of the capture path, as seen by the DSP core
pub trait CaptureSource {
    /// Number of complete blocks ready to read
    fn available(&self) -> usize;

    /// Read one block, or `None` if nothing is buffered
    fn read_block(&mut self) -> Option<RawBlock>;

    /// Drop everything buffered (overflow recovery)
    fn clear(&mut self) {
        while self.read_block().is_some() {}
    }
}

/// Consumer side of the playback path, as seen by the DSP core
pub trait PlaybackSink {
    /// Queue one block; returns false if the sink was full and it was dropped
    fn write_block(&mut self, block: RawBlock) -> bool;
}

/// Fixed-capacity SPSC queue of raw blocks shared with an ISR or DMA task
pub type SampleQueue = Queue<RawBlock, SAMPLE_QUEUE_DEPTH>;

/// [`CaptureSource`] over the consumer half of a [`SampleQueue`]
pub struct QueueCapture<'q> {
    consumer: Consumer<'q, RawBlock, SAMPLE_QUEUE_DEPTH>,
}

impl<'q> QueueCapture<'q> {
    /// Wrap a queue consumer
    #[must_use]
    pub fn new(consumer: Consumer<'q, RawBlock, SAMPLE_QUEUE_DEPTH>) -> Self {
        Self { consumer }
    }
}

impl CaptureSource for QueueCapture<'_> {
    fn available(&self) -> usize {
        self.consumer.len()
    }

    fn read_block(&mut self) -> Option<RawBlock> {
        self.consumer.dequeue()
    }
}

/// [`PlaybackSink`] over the producer half of a [`SampleQueue`]
pub struct QueueSink<'q> {
    producer: Producer<'q, RawBlock, SAMPLE_QUEUE_DEPTH>,
}

impl<'q> QueueSink<'q> {
    /// Wrap a queue producer
    #[must_use]
    pub fn new(producer: Producer<'q, RawBlock, SAMPLE_QUEUE_DEPTH>) -> Self {
        Self { producer }
    }
}

impl PlaybackSink for QueueSink<'_> {
    fn write_block(&mut self, block: RawBlock) -> bool {
        self.producer.enqueue(block).is_ok()
    }
}

/// Fill `block` with one pass worth of samples from `source`
///
/// Returns false, leaving the source untouched, when fewer than
/// [`BLOCKS_PER_PASS`] blocks are buffered.
pub fn pull_pass<S: CaptureSource + ?Sized>(
    source: &mut S,
    block: &mut SampleBlock,
    sample_rate: u32,
) -> bool {
    if source.available() < BLOCKS_PER_PASS {
        return false;
    }

    block.clear_with_rate(sample_rate);
    for _ in 0..BLOCKS_PER_PASS {
        let Some(raw) = source.read_block() else {
            diag_warn!("capture source under-delivered after reporting availability");
            return false;
        };
        for (&i, &q) in raw.i.iter().zip(raw.q.iter()) {
            block.push(sample_to_f32(i), sample_to_f32(q));
        }
    }
    true
}

/// Write `block` to `sink` in queue-sized chunks
///
/// A trailing partial chunk is zero padded. Returns the number of chunks
/// the sink dropped.
pub fn push_pass<K: PlaybackSink + ?Sized>(sink: &mut K, block: &SampleBlock) -> usize {
    let mut dropped = 0;
    for (ci, cq) in block
        .i()
        .chunks(CAPTURE_BLOCK_SIZE)
        .zip(block.q().chunks(CAPTURE_BLOCK_SIZE))
    {
        let mut raw = RawBlock::ZERO;
        for (dst, &src) in raw.i.iter_mut().zip(ci) {
            *dst = f32_to_sample(src);
        }
        for (dst, &src) in raw.q.iter_mut().zip(cq) {
            *dst = f32_to_sample(src);
        }
        if !sink.write_block(raw) {
            dropped += 1;
        }
    }
    if dropped > 0 {
        diag_debug!("playback sink full, dropped {} blocks", dropped);
    }
    dropped
}
