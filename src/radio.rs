//! Radio Control
//!
//! Configuration and mode state read by the DSP passes, and the PTT
//! hand-off from interrupt to main loop.

pub mod context;
pub mod ptt;
