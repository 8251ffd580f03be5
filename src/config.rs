//! System configuration and DSP constants
//!
//! Compile-time constants for the transceiver DSP core. Sample rates,
//! block framing, decimation factors and the fixed time constants of the
//! AGC and SAM loops are centralized here.

use crate::types::{Band, DemodMode};

/// Front-end I/Q sample rate (codec native rate)
pub const NATIVE_SAMPLE_RATE: u32 = 192_000;

/// Samples per capture/playback queue block
pub const CAPTURE_BLOCK_SIZE: usize = 128;

/// Queue blocks consumed by one pipeline pass
pub const BLOCKS_PER_PASS: usize = 16;

/// Samples per channel in one pipeline pass at the native rate
pub const READ_BUFFER_SIZE: usize = CAPTURE_BLOCK_SIZE * BLOCKS_PER_PASS;

/// First decimation stage factor (192 kHz -> 48 kHz)
pub const DECIMATION_STAGE_1: usize = 4;

/// Second decimation stage factor (48 kHz -> 24 kHz)
pub const DECIMATION_STAGE_2: usize = 2;

/// Overall decimation factor
pub const DECIMATION_FACTOR: usize = DECIMATION_STAGE_1 * DECIMATION_STAGE_2;

/// Sample rate after both decimation stages
pub const DECIMATED_SAMPLE_RATE: u32 = NATIVE_SAMPLE_RATE / DECIMATION_FACTOR as u32;

/// Samples per channel after both decimation stages
pub const DECIMATED_BLOCK_SIZE: usize = READ_BUFFER_SIZE / DECIMATION_FACTOR;

/// Capacity of each single-producer/single-consumer sample queue.
///
/// heapless queues hold `N - 1` items, so this buffers two full passes.
pub const SAMPLE_QUEUE_DEPTH: usize = 2 * BLOCKS_PER_PASS + 1;

/// Pass period in microseconds (one read buffer at the native rate)
pub const PASS_PERIOD_US: u64 = READ_BUFFER_SIZE as u64 * 1_000_000 / NATIVE_SAMPLE_RATE as u64;

/// AGC delay-ring capacity in sample pairs.
///
/// Covers the attack window at the native rate (192 kHz x 4 x 1 ms = 768).
pub const AGC_RING_CAPACITY: usize = 1024;

/// AGC fixed gain used when the engine is off
pub const AGC_FIXED_GAIN: f32 = 20.0;

/// SAM loop natural frequency in Hz
pub const SAM_OMEGA_N: f32 = 200.0;

/// SAM loop damping factor
pub const SAM_ZETA: f32 = 0.65;

/// SAM loop frequency pull-in range in Hz
pub const SAM_PLL_FMAX_HZ: f32 = 4000.0;

/// SAM fade-leveler audio DC time constant in seconds
pub const SAM_TAU_R: f32 = 0.02;

/// SAM fade-leveler carrier DC time constant in seconds
pub const SAM_TAU_I: f32 = 1.4;

/// AM envelope DC remover pole
pub const AM_DC_POLE: f32 = 0.9999;

/// Output scale applied after the LMS noise reducer
pub const LMS_OUTPUT_SCALE: f32 = 1.5;

/// Audio volume range covered by the 0..=100 volume control, in dB
pub const VOLUME_RANGE_DB: f32 = 40.0;

/// Default receive pre-scale applied after decimation, in dB
pub const DEFAULT_RX_PRESCALE_DB: f32 = 0.0;

/// Default audio volume (0..=100)
pub const DEFAULT_VOLUME: u8 = 50;

/// Default CW sidetone / receive pitch in Hz
pub const DEFAULT_CW_PITCH_HZ: f32 = 700.0;

/// Transmit microphone audio band (low, high) in Hz
pub const TX_AUDIO_BAND_HZ: (f32, f32) = (200.0, 3000.0);

/// Default microphone gain in dB
pub const DEFAULT_MIC_GAIN_DB: f32 = 0.0;

/// PTT debounce interval in milliseconds
pub const PTT_DEBOUNCE_MS: u32 = 20;

/// Number of VFOs held by the radio context
pub const NUM_VFOS: usize = 2;

/// Default receive passband (low, high) in Hz for a demodulation mode
#[must_use]
pub const fn default_passband(mode: DemodMode) -> (f32, f32) {
    match mode {
        DemodMode::Usb => (200.0, 3000.0),
        DemodMode::Lsb => (-3000.0, -200.0),
        DemodMode::Am | DemodMode::Sam => (-5000.0, 5000.0),
    }
}

/// Default AGC threshold for a band in dB
#[must_use]
pub const fn default_agc_threshold_db(band: Band) -> f32 {
    match band {
        Band::M80 | Band::M40 => 30.0,
        Band::M30 | Band::M20 => 35.0,
        Band::M17 | Band::M15 => 40.0,
    }
}
