//! Automatic Gain Control
//!
//! Five-state look-ahead AGC operating sample by sample on decimated
//! audio. Incoming samples enter a delay ring sized to the attack window;
//! the envelope tracks the peak of everything still inside the window, so
//! the gain has already come down by the time a loud sample leaves the
//! ring. The output is therefore delayed by the attack window length.
//!
//! States:
//! - `Attack`: envelope climbs toward the window peak
//! - `FastDecay`: a short pop is fading; decay quickly back to the level
//!   saved before it
//! - `Hang`: hold the envelope for the hang time
//! - `Decay` / `HangDecay`: slow release until the signal grows again

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use super::block::SampleBlock;
use super::ring::{DelayRing, RingIndex};
use crate::config::{AGC_FIXED_GAIN, AGC_RING_CAPACITY};
use crate::diag::{diag_info, diag_warn};
use crate::error::ConfigError;

/// AGC speed preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AgcMode {
    /// Fixed gain, no gain control
    Off,
    /// 2 s decay with 2 s hang
    Long,
    /// 500 ms decay with 1 s hang
    Slow,
    /// 250 ms decay, no hang
    #[default]
    Medium,
    /// 50 ms decay, no hang
    Fast,
}

impl AgcMode {
    /// Decay time constant in seconds
    #[must_use]
    pub const fn tau_decay(self) -> f32 {
        match self {
            Self::Long => 2.0,
            Self::Slow => 0.5,
            Self::Off | Self::Medium => 0.25,
            Self::Fast => 0.05,
        }
    }

    /// Hang time in seconds
    #[must_use]
    pub const fn hang_time(self) -> f32 {
        match self {
            Self::Long => 2.0,
            Self::Slow => 1.0,
            Self::Off | Self::Medium | Self::Fast => 0.0,
        }
    }

    /// Check if the hang state can be entered
    #[must_use]
    pub const fn hang_enabled(self) -> bool {
        matches!(self, Self::Long | Self::Slow)
    }
}

impl TryFrom<u8> for AgcMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Long),
            2 => Ok(Self::Slow),
            3 => Ok(Self::Medium),
            4 => Ok(Self::Fast),
            other => Err(ConfigError::InvalidAgcMode(other)),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AgcMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::Long => defmt::write!(f, "LONG"),
            Self::Slow => defmt::write!(f, "SLOW"),
            Self::Medium => defmt::write!(f, "MED"),
            Self::Fast => defmt::write!(f, "FAST"),
        }
    }
}

/// Envelope detector applied to each sample pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Magnitude {
    /// `max(|I|, |Q|)`
    #[default]
    MaxAbs,
    /// `sqrt(I² + Q²)`
    Euclidean,
}

impl Magnitude {
    fn of(self, i: f32, q: f32) -> f32 {
        match self {
            Self::MaxAbs => i.abs().max(q.abs()),
            Self::Euclidean => (i * i + q * q).sqrt(),
        }
    }
}

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AgcState {
    /// Envelope rising toward the window peak
    #[default]
    Attack = 0,
    /// Fast recovery after a short pop
    FastDecay = 1,
    /// Envelope held
    Hang = 2,
    /// Normal release
    Decay = 3,
    /// Release after hang
    HangDecay = 4,
}

#[cfg(feature = "embedded")]
impl defmt::Format for AgcState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", *self as u8);
    }
}

/// Which release follows the fast decay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum DecayType {
    #[default]
    Normal,
    Hang,
}

/// Tunable AGC parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgcParams {
    /// Attack time constant in seconds
    pub tau_attack: f32,
    /// Attack window length in attack time constants
    pub n_tau: f32,
    /// Slope of the output level above threshold (gain compression ratio)
    pub var_gain: f32,
    /// Linear gain when the AGC is off
    pub fixed_gain: f32,
    /// Full-scale input magnitude
    pub max_input: f32,
    /// Nominal output level before the attack-window correction
    pub out_target: f32,
    /// Fast back-average time constant in seconds
    pub tau_fast_backaverage: f32,
    /// Fast decay time constant in seconds
    pub tau_fast_decay: f32,
    /// Envelope over back-average ratio that counts as a pop
    pub pop_ratio: f32,
    /// Hang back-average time constant in seconds
    pub tau_hang_backmult: f32,
    /// Hang threshold (0.0 to 1.0)
    pub hang_threshold: f32,
    /// Hang decay time constant in seconds
    pub tau_hang_decay: f32,
    /// Envelope detector
    pub magnitude: Magnitude,
}

impl Default for AgcParams {
    fn default() -> Self {
        Self {
            tau_attack: 0.001,
            n_tau: 4.0,
            var_gain: 1.5,
            fixed_gain: AGC_FIXED_GAIN,
            max_input: 1.0,
            out_target: 1.0,
            tau_fast_backaverage: 0.25,
            tau_fast_decay: 0.005,
            pop_ratio: 5.0,
            tau_hang_backmult: 0.5,
            hang_threshold: 0.25,
            tau_hang_decay: 0.1,
            magnitude: Magnitude::MaxAbs,
        }
    }
}

/// One delayed sample pair and its magnitude
#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    i: f32,
    q: f32,
    magnitude: f32,
}

/// One-pole smoothing multiplier for time constant `tau` at `sample_rate`
fn one_pole(tau: f32, sample_rate: f32) -> f32 {
    1.0 - (-1.0 / (sample_rate * tau)).exp()
}

/// Five-state AGC engine
#[derive(Clone, Debug)]
pub struct AgcEngine {
    params: AgcParams,
    mode: AgcMode,
    sample_rate: u32,
    max_gain: f32,

    ring: DelayRing<Slot, AGC_RING_CAPACITY>,
    out_index: RingIndex,
    in_index: RingIndex,
    attack_buffsize: usize,

    attack_mult: f32,
    decay_mult: f32,
    fast_decay_mult: f32,
    hang_decay_mult: f32,
    fast_backmult: f32,
    hang_backmult: f32,
    out_target: f32,
    min_volts: f32,
    slope_constant: f32,
    hang_level: f32,
    hang_samples: u32,

    state: AgcState,
    decay_type: DecayType,
    volts: f32,
    save_volts: f32,
    ring_max: f32,
    fast_backaverage: f32,
    hang_backaverage: f32,
    hang_counter: u32,
    agc_action: bool,
}

impl AgcEngine {
    /// Create an engine for `mode` at `sample_rate`
    ///
    /// `agc_threshold_db` is the maximum gain, normally taken from the
    /// band profile.
    #[must_use]
    pub fn new(params: AgcParams, mode: AgcMode, sample_rate: u32, agc_threshold_db: f32) -> Self {
        let ring = DelayRing::new(1);
        let start = ring.index(0);
        let mut agc = Self {
            params,
            mode,
            sample_rate,
            max_gain: 1.0,
            ring,
            out_index: start,
            in_index: start,
            attack_buffsize: 0,
            attack_mult: 0.0,
            decay_mult: 0.0,
            fast_decay_mult: 0.0,
            hang_decay_mult: 0.0,
            fast_backmult: 0.0,
            hang_backmult: 0.0,
            out_target: 0.0,
            min_volts: 0.0,
            slope_constant: 0.0,
            hang_level: 0.0,
            hang_samples: 0,
            state: AgcState::Attack,
            decay_type: DecayType::Normal,
            volts: 0.0,
            save_volts: 0.0,
            ring_max: 0.0,
            fast_backaverage: 0.0,
            hang_backaverage: 0.0,
            hang_counter: 0,
            agc_action: false,
        };
        agc.configure(mode, sample_rate, agc_threshold_db);
        agc
    }

    /// Rebuild the engine for a new mode, sample rate or threshold
    ///
    /// Recomputes every derived multiplier and clears the delay ring and
    /// all loop state. The envelope restarts at `min_volts`.
    pub fn configure(&mut self, mode: AgcMode, sample_rate: u32, agc_threshold_db: f32) {
        let p = self.params;
        let fs = sample_rate.max(1) as f32;

        self.mode = mode;
        self.sample_rate = sample_rate;
        self.max_gain = 10.0f32.powf(agc_threshold_db / 20.0);

        // Keep an exact product like 96.000008 from rounding up a sample
        let window = fs * p.n_tau * p.tau_attack;
        let wanted = (window - window * 4.0 * f32::EPSILON).ceil() as usize;
        if wanted + 1 > AGC_RING_CAPACITY {
            diag_warn!(
                "AGC attack window {} exceeds ring capacity {}",
                wanted,
                AGC_RING_CAPACITY
            );
        }
        self.ring = DelayRing::new(wanted + 1);
        self.attack_buffsize = self.ring.len() - 1;
        self.out_index = self.ring.index(0);
        self.in_index = self.ring.offset(self.out_index, self.attack_buffsize);

        self.attack_mult = one_pole(p.tau_attack, fs);
        self.decay_mult = one_pole(mode.tau_decay(), fs);
        self.fast_decay_mult = one_pole(p.tau_fast_decay, fs);
        self.hang_decay_mult = one_pole(p.tau_hang_decay, fs);
        self.fast_backmult = one_pole(p.tau_fast_backaverage, fs);
        self.hang_backmult = one_pole(p.tau_hang_backmult, fs);

        self.out_target = p.out_target * (1.0 - (-p.n_tau).exp()) * 0.9999;
        self.min_volts = self.out_target / (p.var_gain * self.max_gain);

        let mut denom = (self.out_target / (p.max_input * p.var_gain * self.max_gain)).log10();
        if denom == 0.0 {
            denom = 1e-16;
        }
        self.slope_constant = self.out_target * (1.0 - 1.0 / p.var_gain) / denom;

        let blend = 10.0f32.powf((p.hang_threshold - 1.0) / 0.125);
        self.hang_level = (p.max_input * blend
            + (self.out_target / (p.var_gain * self.max_gain)) * (1.0 - blend))
            * 0.637;
        self.hang_samples = (mode.hang_time() * fs) as u32;

        self.state = AgcState::Attack;
        self.decay_type = DecayType::Normal;
        self.volts = self.min_volts;
        self.save_volts = self.min_volts;
        self.ring_max = 0.0;
        self.fast_backaverage = 0.0;
        self.hang_backaverage = 0.0;
        self.hang_counter = 0;
        self.agc_action = false;

        diag_info!(
            "AGC configured: {:?} at {} Hz, max gain {}",
            mode,
            sample_rate,
            self.max_gain
        );
    }

    /// Process a block in place
    pub fn process(&mut self, block: &mut SampleBlock) {
        if self.mode == AgcMode::Off {
            block.scale(self.params.fixed_gain);
            return;
        }
        if block.sample_rate() != self.sample_rate {
            diag_warn!(
                "AGC configured for {} Hz, block is {} Hz",
                self.sample_rate,
                block.sample_rate()
            );
        }

        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (oi, oq) = self.step(*si, *sq);
            *si = oi;
            *sq = oq;
        }
    }

    /// Push one sample pair through the delay line; returns the delayed,
    /// gain-controlled pair
    fn step(&mut self, i: f32, q: f32) -> (f32, f32) {
        self.out_index = self.ring.next(self.out_index);
        self.in_index = self.ring.next(self.in_index);

        let leaving = self.ring.get(self.out_index);
        // A NaN would stick in the back-averages; treat the pair as silence
        let (i, q) = if i.is_nan() || q.is_nan() {
            (0.0, 0.0)
        } else {
            (i, q)
        };
        let arriving = Slot {
            i,
            q,
            magnitude: self.params.magnitude.of(i, q),
        };
        self.ring.set(self.in_index, arriving);

        let abs_out = leaving.magnitude;
        self.fast_backaverage =
            self.fast_backmult * abs_out + (1.0 - self.fast_backmult) * self.fast_backaverage;
        self.hang_backaverage =
            self.hang_backmult * abs_out + (1.0 - self.hang_backmult) * self.hang_backaverage;

        // The old peak just left the window
        if abs_out >= self.ring_max && abs_out > 0.0 {
            self.ring_max = self
                .ring
                .window(self.out_index, self.attack_buffsize)
                .fold(0.0, |acc, slot| acc.max(slot.magnitude));
        }
        if arriving.magnitude > self.ring_max {
            self.ring_max = arriving.magnitude;
        }

        self.hang_counter = self.hang_counter.saturating_sub(1);
        self.update_state();

        if self.volts < self.min_volts {
            self.volts = self.min_volts;
            self.agc_action = false;
        } else {
            self.agc_action = true;
        }

        let mult = self.gain_for(self.volts);
        (leaving.i * mult, leaving.q * mult)
    }

    /// Output multiplier for an envelope value
    fn gain_for(&self, volts: f32) -> f32 {
        let log_level = (volts / self.params.max_input).log10().min(0.0);
        (self.out_target - self.slope_constant * log_level) / volts
    }

    fn attack(&mut self) {
        self.volts += (self.ring_max - self.volts) * self.attack_mult;
    }

    fn release(&mut self, mult: f32) {
        self.volts += (self.ring_max - self.volts) * mult;
    }

    /// Regrowth from a held or decaying state
    fn regrow(&mut self) {
        self.state = AgcState::Attack;
        self.save_volts = self.volts;
        self.attack();
    }

    fn update_state(&mut self) {
        let growing = self.ring_max >= self.volts;
        match self.state {
            AgcState::Attack => {
                if growing {
                    self.attack();
                } else if self.volts > self.params.pop_ratio * self.fast_backaverage {
                    self.state = AgcState::FastDecay;
                    self.release(self.fast_decay_mult);
                } else if self.mode.hang_enabled() && self.hang_backaverage > self.hang_level {
                    self.state = AgcState::Hang;
                    self.hang_counter = self.hang_samples;
                    self.decay_type = DecayType::Hang;
                } else {
                    self.state = AgcState::Decay;
                    self.release(self.decay_mult);
                    self.decay_type = DecayType::Normal;
                }
            }
            AgcState::FastDecay => {
                if growing {
                    self.state = AgcState::Attack;
                    self.attack();
                } else if self.volts > self.save_volts {
                    self.release(self.fast_decay_mult);
                } else if self.hang_counter > 0 {
                    self.state = AgcState::Hang;
                } else if self.decay_type == DecayType::Normal {
                    self.state = AgcState::Decay;
                    self.release(self.decay_mult);
                } else {
                    self.state = AgcState::HangDecay;
                    self.release(self.hang_decay_mult);
                }
            }
            AgcState::Hang => {
                if growing {
                    self.regrow();
                } else if self.hang_counter == 0 {
                    self.state = AgcState::HangDecay;
                    self.release(self.hang_decay_mult);
                }
            }
            AgcState::Decay => {
                if growing {
                    self.regrow();
                } else {
                    self.release(self.decay_mult);
                }
            }
            AgcState::HangDecay => {
                if growing {
                    self.regrow();
                } else {
                    self.release(self.hang_decay_mult);
                }
            }
        }
    }

    /// True while the envelope is above `min_volts` (gain being reduced)
    #[must_use]
    pub const fn agc_action(&self) -> bool {
        self.agc_action
    }

    /// Current envelope estimate
    #[must_use]
    pub const fn volts(&self) -> f32 {
        self.volts
    }

    /// Envelope floor (the level where maximum gain applies)
    #[must_use]
    pub const fn min_volts(&self) -> f32 {
        self.min_volts
    }

    /// Current controller state
    #[must_use]
    pub const fn state(&self) -> AgcState {
        self.state
    }

    /// Group delay of the engine in samples (zero when off)
    #[must_use]
    pub const fn delay_samples(&self) -> usize {
        match self.mode {
            AgcMode::Off => 0,
            _ => self.attack_buffsize,
        }
    }

    /// Configured mode
    #[must_use]
    pub const fn mode(&self) -> AgcMode {
        self.mode
    }

    /// Maximum linear gain
    #[must_use]
    pub const fn max_gain(&self) -> f32 {
        self.max_gain
    }

    /// Current linear gain (what the next leaving sample is multiplied by)
    #[must_use]
    pub fn current_gain(&self) -> f32 {
        match self.mode {
            AgcMode::Off => self.params.fixed_gain,
            _ => self.gain_for(self.volts.max(self.min_volts)),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FS: u32 = 24_000;

    fn engine(mode: AgcMode) -> AgcEngine {
        AgcEngine::new(AgcParams::default(), mode, FS, 30.0)
    }

    fn tone(len: usize, amplitude: f32, freq: f32) -> SampleBlock {
        let mut block = SampleBlock::new(FS);
        for n in 0..len {
            let phase = 2.0 * core::f32::consts::PI * freq * n as f32 / FS as f32;
            block.push(amplitude * phase.cos(), amplitude * phase.sin());
        }
        block
    }

    #[test]
    fn mode_from_u8() {
        assert_eq!(AgcMode::try_from(0), Ok(AgcMode::Off));
        assert_eq!(AgcMode::try_from(4), Ok(AgcMode::Fast));
        assert_eq!(AgcMode::try_from(5), Err(ConfigError::InvalidAgcMode(5)));
    }

    #[test]
    fn mode_time_constants() {
        assert!(AgcMode::Long.hang_enabled());
        assert!(AgcMode::Slow.hang_enabled());
        assert!(!AgcMode::Medium.hang_enabled());
        assert_relative_eq!(AgcMode::Slow.tau_decay(), 0.5);
        assert_relative_eq!(AgcMode::Long.hang_time(), 2.0);
        assert_relative_eq!(AgcMode::Fast.hang_time(), 0.0);
    }

    #[test]
    fn ring_is_attack_window_plus_one() {
        let agc = engine(AgcMode::Medium);
        // 24 kHz x 4 x 1 ms = 96
        assert_eq!(agc.delay_samples(), 96);
        assert_eq!(agc.ring.len(), 97);
    }

    #[test]
    fn minimum_envelope_gives_max_gain() {
        let agc = engine(AgcMode::Medium);
        assert_relative_eq!(agc.gain_for(agc.min_volts()), agc.max_gain(), max_relative = 1e-4);
    }

    #[test]
    fn magnitude_detectors() {
        assert_relative_eq!(Magnitude::MaxAbs.of(-0.3, 0.4), 0.4);
        assert_relative_eq!(Magnitude::Euclidean.of(-0.3, 0.4), 0.5);
    }

    #[test]
    fn off_is_fixed_gain() {
        let mut agc = engine(AgcMode::Off);
        let mut block = tone(64, 0.01, 1000.0);
        let input = block.clone();
        agc.process(&mut block);
        for (out, inp) in block.i().iter().zip(input.i()) {
            assert_relative_eq!(*out, inp * 20.0);
        }
        assert_eq!(agc.delay_samples(), 0);
    }

    #[test]
    fn strong_tone_triggers_attack() {
        let mut agc = engine(AgcMode::Fast);
        let mut block = tone(2048, 0.9, 1000.0);
        agc.process(&mut block);
        assert!(agc.agc_action());
        assert!(agc.volts() > 0.8);
        let tail_peak = block.i()[1024..]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(tail_peak < 1.1, "output should be levelled, got {tail_peak}");
        assert!(tail_peak > 0.5, "output should not be crushed, got {tail_peak}");
    }

    #[test]
    fn silence_after_tone_releases() {
        let mut agc = engine(AgcMode::Medium);
        let mut loud = tone(1024, 0.9, 1000.0);
        agc.process(&mut loud);
        let loud_volts = agc.volts();

        let mut quiet = SampleBlock::from_iq(&[0.0; 2048], &[0.0; 2048], FS);
        agc.process(&mut quiet);
        assert!(agc.volts() < loud_volts);
        assert_ne!(agc.state(), AgcState::Attack);
    }

    #[test]
    fn hang_mode_holds_envelope() {
        let mut agc = engine(AgcMode::Long);
        // Long enough for the hang back-average to exceed the hang level
        for _ in 0..8 {
            let mut block = tone(2048, 0.9, 500.0);
            agc.process(&mut block);
        }
        let mut quiet = SampleBlock::from_iq(&[0.0; 512], &[0.0; 512], FS);
        agc.process(&mut quiet);
        assert!(
            matches!(agc.state(), AgcState::Hang | AgcState::FastDecay),
            "unexpected state {:?}",
            agc.state()
        );
    }
}
