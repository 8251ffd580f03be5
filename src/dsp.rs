//! Digital Signal Processing
//!
//! Building blocks for the receive and transmit passes:
//! - Sample blocks and the codec queue adapter
//! - RF gain, IQ correction and frequency translation
//! - Multirate framing around the filter bank
//! - Five-state AGC
//! - SSB, AM and synchronous AM demodulation
//! - Noise reduction, notch and CW dispatch

pub mod block;
pub mod io;
pub mod correction;
pub mod oscillator;
pub mod translate;
pub mod filter;
pub mod multirate;
pub mod ring;
pub mod agc;
pub mod sam;
pub mod demod;
pub mod dispatch;
pub mod noise_reduction;
pub mod cw;
