//! Receive/Transmit Pipeline
//!
//! One pass per audio block period. The receive pass turns a block of
//! native-rate I/Q into playback audio; the transmit pass turns microphone
//! audio into an SSB I/Q block. Which one runs is decided by the radio
//! state in [`RadioContext`].
//!
//! ```text
//! RX: capture → RF gain → IQ corr → [full tap] → fs/4 shift → [zoom tap]
//!     → fine tune → ↓4 ↓2 → pre-scale → passband → AGC → demod → EQ
//!     → NR → notch → [CW] → ↑2 ↑4 → volume → playback
//! TX: mic → gain → ↓4 ↓2 → EQ → Hilbert → sideband → ↑2 ↑4 → IQ corr → out
//! ```

use crate::config::{DECIMATED_SAMPLE_RATE, NATIVE_SAMPLE_RATE, TX_AUDIO_BAND_HZ};
use crate::diag::{diag_info, diag_warn};
use crate::dsp::agc::{AgcEngine, AgcMode, AgcParams};
use crate::dsp::block::SampleBlock;
use crate::dsp::correction::{apply_rf_gain, db_to_linear};
use crate::dsp::demod::Demodulator;
use crate::dsp::dispatch::{auto_notch, cw_receive, reduce_noise, CwProcessor, NoiseReducer};
use crate::dsp::io::{pull_pass, push_pass, CaptureSource, PlaybackSink};
use crate::dsp::multirate::{
    decimate, interpolate, FilterBank, FilterConfig, FilterStage, RX_DECIMATE, RX_INTERPOLATE,
    TX_DECIMATE, TX_INTERPOLATE,
};
use crate::dsp::translate::{FineTuneShifter, QuarterRateShifter};
use crate::radio::context::RadioContext;
use crate::types::{DemodMode, RadioState};

/// Spectrum display taps
pub trait SpectrumTap {
    /// Native-rate block after IQ correction
    fn full(&mut self, block: &SampleBlock);

    /// Native-rate block after the quarter-rate shift
    fn zoomed(&mut self, block: &SampleBlock);
}

/// Spectrum tap that only records block peaks
#[derive(Clone, Copy, Debug, Default)]
pub struct LevelTap {
    full_peak: f32,
    zoomed_peak: f32,
}

impl LevelTap {
    /// Peak of the last full-spectrum block
    #[must_use]
    pub const fn full_peak(&self) -> f32 {
        self.full_peak
    }

    /// Peak of the last zoomed block
    #[must_use]
    pub const fn zoomed_peak(&self) -> f32 {
        self.zoomed_peak
    }
}

impl SpectrumTap for LevelTap {
    fn full(&mut self, block: &SampleBlock) {
        self.full_peak = block.peak();
    }

    fn zoomed(&mut self, block: &SampleBlock) {
        self.zoomed_peak = block.peak();
    }
}

/// What a call to [`Pipeline::process`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// A receive block went to the playback sink
    Received,
    /// A transmit block went to the transmit sink
    Transmitted,
    /// The selected pass found too little input and was skipped
    Skipped,
    /// Nothing to do in this radio state
    Idle,
}

#[cfg(feature = "embedded")]
impl defmt::Format for PassOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Received => defmt::write!(f, "RX"),
            Self::Transmitted => defmt::write!(f, "TX"),
            Self::Skipped => defmt::write!(f, "skipped"),
            Self::Idle => defmt::write!(f, "idle"),
        }
    }
}

/// External collaborators the pipeline drives
pub struct Collaborators<'a> {
    /// Receive I/Q capture
    pub rx_source: &'a mut dyn CaptureSource,
    /// Receive audio playback
    pub rx_sink: &'a mut dyn PlaybackSink,
    /// Microphone capture
    pub tx_source: &'a mut dyn CaptureSource,
    /// Transmit I/Q output
    pub tx_sink: &'a mut dyn PlaybackSink,
    /// Decimation, interpolation, EQ, Hilbert and passband filters
    pub filters: &'a mut dyn FilterBank,
    /// Noise reduction and notch
    pub noise: &'a mut dyn NoiseReducer,
    /// CW narrow filter and decoder
    pub cw: &'a mut dyn CwProcessor,
    /// Optional spectrum display
    pub spectrum: Option<&'a mut dyn SpectrumTap>,
}

/// Receive/transmit DSP pipeline
pub struct Pipeline<'a> {
    io: Collaborators<'a>,
    block: SampleBlock,
    quarter: QuarterRateShifter,
    fine_tune: FineTuneShifter,
    agc: AgcEngine,
    agc_rate: u32,
    agc_threshold_db: f32,
    agc_mode_setting: AgcMode,
    demod: Demodulator,
}

impl<'a> Pipeline<'a> {
    /// Build a pipeline with the AGC set up from `ctx`
    #[must_use]
    pub fn new(io: Collaborators<'a>, ctx: &RadioContext) -> Self {
        let settings = ctx.settings();
        let threshold = ctx.active_profile().agc_threshold_db;
        Self {
            io,
            block: SampleBlock::new(NATIVE_SAMPLE_RATE),
            quarter: QuarterRateShifter::new(settings.quarter_shift),
            fine_tune: FineTuneShifter::new(NATIVE_SAMPLE_RATE),
            agc: AgcEngine::new(
                AgcParams::default(),
                settings.agc_mode,
                DECIMATED_SAMPLE_RATE,
                threshold,
            ),
            agc_rate: DECIMATED_SAMPLE_RATE,
            agc_threshold_db: threshold,
            agc_mode_setting: settings.agc_mode,
            demod: Demodulator::new(),
        }
    }

    /// Run the pass selected by the radio state
    pub fn process(&mut self, ctx: &RadioContext) -> PassOutcome {
        match ctx.radio_state() {
            RadioState::SsbReceive | RadioState::CwReceive => self
                .receive_pass(ctx)
                .map_or(PassOutcome::Skipped, |_| PassOutcome::Received),
            RadioState::SsbTransmit => self
                .transmit_pass(ctx)
                .map_or(PassOutcome::Skipped, |_| PassOutcome::Transmitted),
            // CW keying is generated outside the DSP core
            RadioState::CwTransmitStraight | RadioState::CwTransmitKeyer => PassOutcome::Idle,
        }
    }

    /// Receive one block
    ///
    /// Returns `None`, touching nothing, when the capture source has less
    /// than a pass worth of blocks.
    pub fn receive_pass(&mut self, ctx: &RadioContext) -> Option<&SampleBlock> {
        if !pull_pass(&mut *self.io.rx_source, &mut self.block, NATIVE_SAMPLE_RATE) {
            return None;
        }
        let settings = ctx.settings();
        let profile = ctx.active_profile();

        apply_rf_gain(
            &mut self.block,
            settings.rf_gain_all_bands_db,
            profile.rf_gain_db,
        );
        profile.rx_iq.apply(&mut self.block);
        if let Some(tap) = self.io.spectrum.as_deref_mut() {
            tap.full(&self.block);
        }

        if self.quarter.direction() != settings.quarter_shift {
            self.quarter = QuarterRateShifter::new(settings.quarter_shift);
        }
        self.quarter.process(&mut self.block);
        if let Some(tap) = self.io.spectrum.as_deref_mut() {
            tap.zoomed(&self.block);
        }
        self.fine_tune
            .set_offset(settings.fine_tune_hz, self.block.sample_rate());
        self.fine_tune.process(&mut self.block);

        decimate(&mut *self.io.filters, &RX_DECIMATE, &mut self.block);
        self.block.scale(settings.prescale_gain(profile));
        self.io.filters.convolve(
            &FilterConfig::band(
                FilterStage::RxPassband,
                profile.filter_low_hz,
                profile.filter_high_hz,
            ),
            &mut self.block,
        );

        // An explicit configure_agc holds until the mode setting itself changes
        let mode_changed = settings.agc_mode != self.agc_mode_setting;
        if mode_changed || profile.agc_threshold_db != self.agc_threshold_db {
            let mode = if mode_changed {
                settings.agc_mode
            } else {
                self.agc.mode()
            };
            self.agc.configure(mode, self.agc_rate, profile.agc_threshold_db);
            self.agc_mode_setting = settings.agc_mode;
            self.agc_threshold_db = profile.agc_threshold_db;
        }
        self.agc.process(&mut self.block);

        self.demod.set_sam_fade_leveler(settings.sam_fade_leveler);
        self.demod.process(profile.mode, &mut self.block);
        self.io.filters.equalize(
            &FilterConfig::plain(FilterStage::RxEqualizer),
            &mut self.block,
        );

        reduce_noise(&mut *self.io.noise, settings.noise_reduction, &mut self.block);
        auto_notch(&mut *self.io.noise, settings.auto_notch, &mut self.block);
        if ctx.radio_state() == RadioState::CwReceive {
            self.io.cw.set_pitch(settings.cw_pitch_hz);
            cw_receive(&mut *self.io.cw, &mut self.block);
        }

        interpolate(&mut *self.io.filters, &RX_INTERPOLATE, &mut self.block);
        self.block.scale(settings.volume_gain());
        push_pass(&mut *self.io.rx_sink, &self.block);
        Some(&self.block)
    }

    /// Transmit one block
    ///
    /// Microphone audio arrives in the I channel. Returns `None` when the
    /// microphone source has less than a pass worth of blocks.
    pub fn transmit_pass(&mut self, ctx: &RadioContext) -> Option<&SampleBlock> {
        if !pull_pass(&mut *self.io.tx_source, &mut self.block, NATIVE_SAMPLE_RATE) {
            return None;
        }
        let settings = ctx.settings();
        let profile = ctx.active_profile();

        self.block.scale(db_to_linear(settings.mic_gain_db));
        decimate(&mut *self.io.filters, &TX_DECIMATE, &mut self.block);

        let (low, high) = TX_AUDIO_BAND_HZ;
        self.io.filters.equalize(
            &FilterConfig::band(FilterStage::TxEqualizer, low, high),
            &mut self.block,
        );
        self.io.filters.hilbert(
            &FilterConfig::plain(FilterStage::TxHilbert),
            &mut self.block,
        );
        if profile.mode == DemodMode::Lsb {
            for q in self.block.q_mut() {
                *q = -*q;
            }
        }

        interpolate(&mut *self.io.filters, &TX_INTERPOLATE, &mut self.block);
        profile.tx_iq.apply(&mut self.block);
        push_pass(&mut *self.io.tx_sink, &self.block);
        Some(&self.block)
    }

    /// Rebuild the AGC for `mode` at `sample_rate`
    ///
    /// The maximum gain comes from the active band's AGC threshold.
    pub fn configure_agc(&mut self, ctx: &RadioContext, mode: AgcMode, sample_rate: u32) {
        let threshold = ctx.active_profile().agc_threshold_db;
        self.agc.configure(mode, sample_rate, threshold);
        self.agc_rate = sample_rate;
        self.agc_threshold_db = threshold;
        if sample_rate != DECIMATED_SAMPLE_RATE {
            diag_info!(
                "AGC configured at {} Hz, receive audio runs at {} Hz",
                sample_rate,
                DECIMATED_SAMPLE_RATE
            );
        }
    }

    /// [`Self::configure_agc`] from a raw mode; invalid values are logged
    /// and leave the AGC as it was
    pub fn configure_agc_raw(&mut self, ctx: &RadioContext, mode: u8, sample_rate: u32) {
        match AgcMode::try_from(mode) {
            Ok(mode) => self.configure_agc(ctx, mode, sample_rate),
            Err(e) => diag_warn!("ignoring AGC setting: {:?}", e),
        }
    }

    /// AGC is currently reducing gain
    #[must_use]
    pub const fn agc_action(&self) -> bool {
        self.agc.agc_action()
    }

    /// Smoothed SAM carrier offset in Hz
    #[must_use]
    pub const fn sam_carrier_offset_hz(&self) -> f32 {
        self.demod.sam_carrier_offset_hz()
    }

    /// AGC engine, for inspection
    #[must_use]
    pub const fn agc(&self) -> &AgcEngine {
        &self.agc
    }

    /// Last processed block
    #[must_use]
    pub const fn block(&self) -> &SampleBlock {
        &self.block
    }
}
