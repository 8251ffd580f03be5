//! SDR Transceiver DSP Core
//!
//! Receive and transmit signal processing for an STM32G474-based software
//! defined radio. Samples arrive from the codec in fixed blocks; each pass
//! corrects the front end, demodulates and hands audio back to playback,
//! or turns microphone audio into an SSB I/Q block on transmit.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PIPELINE                               │
//! │  receive pass  │  transmit pass  │  mode dispatch            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      DSP LAYER                               │
//! │  IQ correction │ fs/4 + fine tune │ multirate │ AGC │ AM/SAM │
//! │  noise / notch / CW dispatch                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RADIO CONTEXT                             │
//! │  band profiles │ VFOs │ user settings │ PTT latch            │
//! ├─────────────────────────────────────────────────────────────┤
//! │              SAMPLE QUEUES / COLLABORATORS                   │
//! │  capture │ playback │ filter bank │ noise reducer │ CW       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **No globals**: every pass reads an explicit [`radio::context::RadioContext`]
//! - **Closed enums**: modes and options are matched exhaustively
//! - **Never block, never fail**: missing input skips a pass, anomalies
//!   are logged and processing continues
//! - **Fixed memory**: `heapless` storage sized at compile time

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Diagnostics macros (defmt on target, `log` on host)
pub(crate) mod diag;

/// Digital Signal Processing
///
/// Sample blocks, correction, translation, multirate framing, AGC,
/// demodulation and the collaborator dispatch.
pub mod dsp;

/// Radio Control
///
/// Radio context and the PTT hand-off.
pub mod radio;

/// Receive/transmit orchestration
pub mod pipeline;

/// Configuration errors
pub mod error;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;
