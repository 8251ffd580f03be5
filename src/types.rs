//! Shared types used across the DSP core
//!
//! Closed enums for the externally-owned mode state, the demodulation
//! mode and the amateur band table index.

use crate::error::ConfigError;

/// Demodulation mode selected for the active VFO
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DemodMode {
    /// Upper sideband
    #[default]
    Usb,
    /// Lower sideband
    Lsb,
    /// AM, envelope detector
    Am,
    /// Synchronous AM (carrier-tracking PLL)
    Sam,
}

impl TryFrom<u8> for DemodMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Usb),
            1 => Ok(Self::Lsb),
            2 => Ok(Self::Am),
            3 => Ok(Self::Sam),
            other => Err(ConfigError::InvalidDemodMode(other)),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DemodMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Usb => defmt::write!(f, "USB"),
            Self::Lsb => defmt::write!(f, "LSB"),
            Self::Am => defmt::write!(f, "AM"),
            Self::Sam => defmt::write!(f, "SAM"),
        }
    }
}

/// Amateur radio band (index into the band profile table)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    /// 80 meters (3.5 - 4.0 MHz)
    M80,
    /// 40 meters (7.0 - 7.3 MHz)
    M40,
    /// 30 meters (10.1 - 10.15 MHz)
    M30,
    /// 20 meters (14.0 - 14.35 MHz)
    M20,
    /// 17 meters (18.068 - 18.168 MHz)
    M17,
    /// 15 meters (21.0 - 21.45 MHz)
    M15,
}

impl Band {
    /// Number of bands in the table
    pub const COUNT: usize = 6;

    /// All bands in table order
    pub const ALL: [Self; Self::COUNT] = [
        Self::M80,
        Self::M40,
        Self::M30,
        Self::M20,
        Self::M17,
        Self::M15,
    ];

    /// Position of this band in the profile table
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::M80 => 0,
            Self::M40 => 1,
            Self::M30 => 2,
            Self::M20 => 3,
            Self::M17 => 4,
            Self::M15 => 5,
        }
    }

    /// Find the band containing `hz`, if any
    #[must_use]
    pub fn from_frequency_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|band| {
            let (low, high) = band.edges_hz();
            (low..=high).contains(&hz)
        })
    }

    /// Band edges in Hz (inclusive)
    #[must_use]
    pub const fn edges_hz(self) -> (u32, u32) {
        match self {
            Self::M80 => (3_500_000, 4_000_000),
            Self::M40 => (7_000_000, 7_300_000),
            Self::M30 => (10_100_000, 10_150_000),
            Self::M20 => (14_000_000, 14_350_000),
            Self::M17 => (18_068_000, 18_168_000),
            Self::M15 => (21_000_000, 21_450_000),
        }
    }

    /// Get the default demodulation mode for this band
    #[must_use]
    pub const fn default_mode(self) -> DemodMode {
        match self {
            Self::M80 | Self::M40 => DemodMode::Lsb,
            Self::M30 | Self::M20 | Self::M17 | Self::M15 => DemodMode::Usb,
        }
    }
}

impl TryFrom<u8> for Band {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(ConfigError::InvalidBand(value))
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Band {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::M80 => defmt::write!(f, "80m"),
            Self::M40 => defmt::write!(f, "40m"),
            Self::M30 => defmt::write!(f, "30m"),
            Self::M20 => defmt::write!(f, "20m"),
            Self::M17 => defmt::write!(f, "17m"),
            Self::M15 => defmt::write!(f, "15m"),
        }
    }
}

/// Externally-owned radio mode state that selects the pipeline branch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RadioState {
    /// Voice receive
    #[default]
    SsbReceive,
    /// Voice transmit
    SsbTransmit,
    /// CW receive (adds the narrow filter and decoder)
    CwReceive,
    /// CW transmit, straight key
    CwTransmitStraight,
    /// CW transmit, iambic keyer
    CwTransmitKeyer,
}

impl RadioState {
    /// Check if this state runs the receive pipeline
    #[must_use]
    pub const fn is_receive(self) -> bool {
        matches!(self, Self::SsbReceive | Self::CwReceive)
    }

    /// Check if CW-specific receive processing applies
    #[must_use]
    pub const fn is_cw(self) -> bool {
        matches!(
            self,
            Self::CwReceive | Self::CwTransmitStraight | Self::CwTransmitKeyer
        )
    }

    /// Receive state to return to when PTT is released
    #[must_use]
    pub const fn to_receive(self) -> Self {
        if self.is_cw() {
            Self::CwReceive
        } else {
            Self::SsbReceive
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::SsbReceive => defmt::write!(f, "SSB RX"),
            Self::SsbTransmit => defmt::write!(f, "SSB TX"),
            Self::CwReceive => defmt::write!(f, "CW RX"),
            Self::CwTransmitStraight => defmt::write!(f, "CW TX straight"),
            Self::CwTransmitKeyer => defmt::write!(f, "CW TX keyer"),
        }
    }
}
