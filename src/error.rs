//! Configuration errors
//!
//! Nothing on the real-time path returns an error. These only come out of
//! raw-value conversions at the configuration boundary, where the setters
//! log them and leave the previous configuration in place.

use core::fmt;

/// Invalid raw configuration value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// AGC mode outside 0..=4
    InvalidAgcMode(u8),
    /// Noise reduction selection outside 0..=3
    InvalidNoiseReduction(u8),
    /// Demodulation mode outside 0..=3
    InvalidDemodMode(u8),
    /// Band index outside the band table
    InvalidBand(u8),
    /// VFO index outside the VFO table
    InvalidVfo(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAgcMode(v) => write!(f, "invalid AGC mode {v}"),
            Self::InvalidNoiseReduction(v) => write!(f, "invalid noise reduction option {v}"),
            Self::InvalidDemodMode(v) => write!(f, "invalid demodulation mode {v}"),
            Self::InvalidBand(v) => write!(f, "invalid band index {v}"),
            Self::InvalidVfo(v) => write!(f, "invalid VFO index {v}"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidAgcMode(v) => defmt::write!(f, "invalid AGC mode {}", v),
            Self::InvalidNoiseReduction(v) => {
                defmt::write!(f, "invalid noise reduction option {}", v);
            }
            Self::InvalidDemodMode(v) => defmt::write!(f, "invalid demodulation mode {}", v),
            Self::InvalidBand(v) => defmt::write!(f, "invalid band index {}", v),
            Self::InvalidVfo(v) => defmt::write!(f, "invalid VFO index {}", v),
        }
    }
}
