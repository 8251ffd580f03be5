//! Radio Context
//!
//! Everything the DSP stages read about the radio: the per-band profile
//! table, the VFOs, user settings and the mode state. One value, owned by
//! the caller and passed by reference into each pass.

use crate::config::{
    default_agc_threshold_db, default_passband, DEFAULT_CW_PITCH_HZ, DEFAULT_MIC_GAIN_DB,
    DEFAULT_RX_PRESCALE_DB, DEFAULT_VOLUME, NUM_VFOS, VOLUME_RANGE_DB,
};
use crate::diag::{diag_info, diag_warn};
use crate::dsp::agc::AgcMode;
use crate::dsp::correction::{db_to_linear, IqCorrection};
use crate::dsp::dispatch::NoiseReduction;
use crate::dsp::translate::ShiftDirection;
use crate::error::ConfigError;
use crate::types::{Band, DemodMode, RadioState};

/// Per-band calibration and receive settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandProfile {
    /// Receive passband low edge in Hz (negative for LSB)
    pub filter_low_hz: f32,
    /// Receive passband high edge in Hz
    pub filter_high_hz: f32,
    /// Receive IQ amplitude/phase correction
    pub rx_iq: IqCorrection,
    /// Transmit IQ amplitude/phase correction
    pub tx_iq: IqCorrection,
    /// Audio gain applied after decimation, in dB
    pub band_gain_db: f32,
    /// AGC maximum gain in dB
    pub agc_threshold_db: f32,
    /// RF gain trim for this band, in dB
    pub rf_gain_db: f32,
    /// Demodulation mode
    pub mode: DemodMode,
}

impl BandProfile {
    /// Factory profile for a band
    #[must_use]
    pub const fn for_band(band: Band) -> Self {
        let mode = band.default_mode();
        let (filter_low_hz, filter_high_hz) = default_passband(mode);
        Self {
            filter_low_hz,
            filter_high_hz,
            rx_iq: IqCorrection::IDENTITY,
            tx_iq: IqCorrection::IDENTITY,
            band_gain_db: 0.0,
            agc_threshold_db: default_agc_threshold_db(band),
            rf_gain_db: 0.0,
            mode,
        }
    }

    /// Change mode and reset the passband to that mode's default
    pub fn set_mode(&mut self, mode: DemodMode) {
        let (low, high) = default_passband(mode);
        self.mode = mode;
        self.filter_low_hz = low;
        self.filter_high_hz = high;
    }
}

/// User-facing receive and transmit settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserSettings {
    /// RF gain applied on every band, in dB
    pub rf_gain_all_bands_db: f32,
    /// Receive pre-scale after decimation, in dB
    pub rx_prescale_db: f32,
    /// Audio volume, 0..=100
    pub volume: u8,
    /// Microphone gain in dB
    pub mic_gain_db: f32,
    /// AGC mode applied when a pipeline is built
    pub agc_mode: AgcMode,
    /// Noise reduction selection
    pub noise_reduction: NoiseReduction,
    /// Automatic notch enabled
    pub auto_notch: bool,
    /// SAM fade leveler enabled
    pub sam_fade_leveler: bool,
    /// Fine-tune offset in Hz
    pub fine_tune_hz: f32,
    /// Quarter-rate shift direction
    pub quarter_shift: ShiftDirection,
    /// CW receive pitch in Hz
    pub cw_pitch_hz: f32,
}

impl UserSettings {
    /// Linear output gain for the current volume
    ///
    /// 100 is unity, each step below takes off `VOLUME_RANGE_DB / 100` dB
    /// and 0 mutes.
    #[must_use]
    pub fn volume_gain(&self) -> f32 {
        let volume = self.volume.min(100);
        if volume == 0 {
            return 0.0;
        }
        db_to_linear((f32::from(volume) - 100.0) / 100.0 * VOLUME_RANGE_DB)
    }

    /// Linear post-decimation pre-scale including the band's gain
    #[must_use]
    pub fn prescale_gain(&self, profile: &BandProfile) -> f32 {
        db_to_linear(self.rx_prescale_db + profile.band_gain_db)
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            rf_gain_all_bands_db: 0.0,
            rx_prescale_db: DEFAULT_RX_PRESCALE_DB,
            volume: DEFAULT_VOLUME,
            mic_gain_db: DEFAULT_MIC_GAIN_DB,
            agc_mode: AgcMode::default(),
            noise_reduction: NoiseReduction::default(),
            auto_notch: false,
            sam_fade_leveler: true,
            fine_tune_hz: 0.0,
            quarter_shift: ShiftDirection::default(),
            cw_pitch_hz: DEFAULT_CW_PITCH_HZ,
        }
    }
}

/// One VFO: dial frequency and the band it selects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vfo {
    /// Dial frequency in Hz
    pub frequency_hz: u32,
    /// Band profile in use
    pub band: Band,
}

impl Vfo {
    /// VFO parked at the low edge of `band`
    #[must_use]
    pub const fn on_band(band: Band) -> Self {
        Self {
            frequency_hz: band.edges_hz().0,
            band,
        }
    }
}

/// Radio configuration and mode state read by every pass
#[derive(Clone, Debug)]
pub struct RadioContext {
    bands: [BandProfile; Band::COUNT],
    vfos: [Vfo; NUM_VFOS],
    active_vfo: usize,
    settings: UserSettings,
    radio_state: RadioState,
}

impl RadioContext {
    /// Factory band table, VFO A on 40 m and VFO B on 20 m
    #[must_use]
    pub fn new() -> Self {
        Self {
            bands: Band::ALL.map(BandProfile::for_band),
            vfos: [Vfo::on_band(Band::M40), Vfo::on_band(Band::M20)],
            active_vfo: 0,
            settings: UserSettings::default(),
            radio_state: RadioState::default(),
        }
    }

    // =========================================================================
    // Band table
    // =========================================================================

    /// Profile for `band`
    #[must_use]
    pub fn band_profile(&self, band: Band) -> &BandProfile {
        &self.bands[band.index()]
    }

    /// Mutable profile for `band`
    pub fn band_profile_mut(&mut self, band: Band) -> &mut BandProfile {
        &mut self.bands[band.index()]
    }

    /// Band of the active VFO
    #[must_use]
    pub fn active_band(&self) -> Band {
        self.vfos[self.active_vfo].band
    }

    /// Profile of the active band
    #[must_use]
    pub fn active_profile(&self) -> &BandProfile {
        self.band_profile(self.active_band())
    }

    /// Demodulation mode of the active band
    #[must_use]
    pub fn demod_mode(&self) -> DemodMode {
        self.active_profile().mode
    }

    /// Change the active band's mode (resets its passband)
    pub fn set_demod_mode(&mut self, mode: DemodMode) {
        let band = self.active_band();
        self.band_profile_mut(band).set_mode(mode);
        diag_info!("demodulation mode {:?}", mode);
    }

    /// Receive IQ correction for `band`
    #[must_use]
    pub fn iq_correction(&self, band: Band) -> IqCorrection {
        self.band_profile(band).rx_iq
    }

    /// Transmit IQ correction for `band`
    #[must_use]
    pub fn tx_iq_correction(&self, band: Band) -> IqCorrection {
        self.band_profile(band).tx_iq
    }

    /// Store receive IQ correction factors for `band`
    pub fn set_iq_correction(&mut self, band: Band, amplitude: f32, phase: f32) {
        self.band_profile_mut(band).rx_iq = IqCorrection::new(amplitude, phase);
    }

    /// Store transmit IQ correction factors for `band`
    pub fn set_tx_iq_correction(&mut self, band: Band, amplitude: f32, phase: f32) {
        self.band_profile_mut(band).tx_iq = IqCorrection::new(amplitude, phase);
    }

    // =========================================================================
    // VFOs
    // =========================================================================

    /// Index of the active VFO
    #[must_use]
    pub const fn active_vfo(&self) -> usize {
        self.active_vfo
    }

    /// VFO by index
    #[must_use]
    pub fn vfo(&self, index: usize) -> Option<&Vfo> {
        self.vfos.get(index)
    }

    /// Make VFO `index` active
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVfo`] if there is no such VFO.
    pub fn select_vfo(&mut self, index: u8) -> Result<(), ConfigError> {
        let index_usize = usize::from(index);
        if index_usize >= NUM_VFOS {
            return Err(ConfigError::InvalidVfo(index));
        }
        self.active_vfo = index_usize;
        Ok(())
    }

    /// [`Self::select_vfo`] for the configuration boundary: invalid input
    /// is logged and ignored
    pub fn select_vfo_raw(&mut self, index: u8) {
        if let Err(e) = self.select_vfo(index) {
            diag_warn!("ignoring VFO selection: {:?}", e);
        }
    }

    /// Tune the active VFO
    ///
    /// The band follows the frequency when it lands inside a band;
    /// out-of-band frequencies keep the current band profile.
    pub fn tune(&mut self, frequency_hz: u32) {
        let vfo = &mut self.vfos[self.active_vfo];
        vfo.frequency_hz = frequency_hz;
        if let Some(band) = Band::from_frequency_hz(frequency_hz) {
            vfo.band = band;
        }
    }

    // =========================================================================
    // Settings and mode state
    // =========================================================================

    /// User settings
    #[must_use]
    pub const fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Mutable user settings
    pub fn settings_mut(&mut self) -> &mut UserSettings {
        &mut self.settings
    }

    /// Select the noise reduction algorithm
    pub fn configure_noise_reduction(&mut self, option: NoiseReduction) {
        self.settings.noise_reduction = option;
        diag_info!("noise reduction {:?}", option);
    }

    /// [`Self::configure_noise_reduction`] from a raw selector; invalid
    /// values are logged and leave the selection unchanged
    pub fn configure_noise_reduction_raw(&mut self, option: u8) {
        match NoiseReduction::try_from(option) {
            Ok(option) => self.configure_noise_reduction(option),
            Err(e) => diag_warn!("ignoring noise reduction setting: {:?}", e),
        }
    }

    /// Current mode state
    #[must_use]
    pub const fn radio_state(&self) -> RadioState {
        self.radio_state
    }

    /// Set the mode state
    pub fn set_radio_state(&mut self, state: RadioState) {
        if state != self.radio_state {
            diag_info!("radio state {:?}", state);
        }
        self.radio_state = state;
    }

    /// Apply a debounced PTT level
    ///
    /// Pressing moves a receive state to its transmit state; releasing
    /// returns to receive. Keyer transmit is left alone on press.
    pub fn apply_ptt(&mut self, pressed: bool) {
        let next = match (pressed, self.radio_state) {
            (true, RadioState::SsbReceive) => RadioState::SsbTransmit,
            (true, RadioState::CwReceive) => RadioState::CwTransmitStraight,
            (true, state) => state,
            (false, state) => state.to_receive(),
        };
        self.set_radio_state(next);
    }
}

impl Default for RadioContext {
    fn default() -> Self {
        Self::new()
    }
}
