//! Noise, Notch and CW Dispatch
//!
//! Routes demodulated audio to the noise-reduction and CW collaborators.
//! The selection is a closed enum matched exhaustively, so every option
//! is handled at compile time.

use super::block::SampleBlock;
use crate::config::LMS_OUTPUT_SCALE;
use crate::error::ConfigError;

/// Noise reduction algorithm selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoiseReduction {
    /// No noise reduction
    #[default]
    Off,
    /// Kim spectral-weighting reducer
    Kim,
    /// Spectral subtraction reducer
    Spectral,
    /// LMS adaptive reducer
    Lms,
}

impl TryFrom<u8> for NoiseReduction {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Kim),
            2 => Ok(Self::Spectral),
            3 => Ok(Self::Lms),
            other => Err(ConfigError::InvalidNoiseReduction(other)),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for NoiseReduction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "NR off"),
            Self::Kim => defmt::write!(f, "NR Kim"),
            Self::Spectral => defmt::write!(f, "NR spectral"),
            Self::Lms => defmt::write!(f, "NR LMS"),
        }
    }
}

/// Noise reduction collaborator, one entry point per algorithm
///
/// Each call mutates the demodulated audio block in place.
pub trait NoiseReducer {
    /// Kim spectral-weighting noise reduction
    fn kim(&mut self, block: &mut SampleBlock);

    /// Spectral subtraction noise reduction
    fn spectral(&mut self, block: &mut SampleBlock);

    /// LMS adaptive noise reduction (output needs [`LMS_OUTPUT_SCALE`])
    fn lms(&mut self, block: &mut SampleBlock);

    /// Automatic notch for carriers and heterodynes
    fn notch(&mut self, block: &mut SampleBlock);
}

/// CW receive collaborator
pub trait CwProcessor {
    /// Narrow band-pass around the CW pitch
    fn narrow_filter(&mut self, block: &mut SampleBlock);

    /// Envelope to Morse decoding
    fn decode(&mut self, block: &SampleBlock);

    /// Follow the configured CW pitch; called before every CW pass
    fn set_pitch(&mut self, _pitch_hz: f32) {}
}

/// Run the selected noise reduction on `block`
///
/// The LMS option's output is scaled by [`LMS_OUTPUT_SCALE`].
pub fn reduce_noise<N: NoiseReducer + ?Sized>(
    reducer: &mut N,
    option: NoiseReduction,
    block: &mut SampleBlock,
) {
    match option {
        NoiseReduction::Off => {}
        NoiseReduction::Kim => reducer.kim(block),
        NoiseReduction::Spectral => reducer.spectral(block),
        NoiseReduction::Lms => {
            reducer.lms(block);
            block.scale(LMS_OUTPUT_SCALE);
        }
    }
}

/// Run the automatic notch when enabled
pub fn auto_notch<N: NoiseReducer + ?Sized>(reducer: &mut N, enabled: bool, block: &mut SampleBlock) {
    if enabled {
        reducer.notch(block);
    }
}

/// CW receive processing: narrow filter, then decode the filtered audio
pub fn cw_receive<C: CwProcessor + ?Sized>(cw: &mut C, block: &mut SampleBlock) {
    cw.narrow_filter(block);
    cw.decode(block);
}
