//! Multirate Framing
//!
//! The filter bank is an external collaborator: the pipeline only says
//! which stage to run through an opaque [`FilterConfig`] handle. This
//! module owns the framing around it. It sequences the two decimation and
//! interpolation stages and checks that every stage changed the sample
//! count and the sample rate together.
//!
//! [`BiquadFilterBank`] is a small reference bank built from biquad
//! sections, used by the firmware loopback build and the tests.

use super::block::SampleBlock;
use super::filter::{BiquadCoeffs, BiquadPair, HilbertFir};
use super::oscillator::QuadratureOscillator;
use crate::config::{DECIMATION_STAGE_1, DECIMATION_STAGE_2};
use crate::diag::diag_warn;

/// Filter stage identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStage {
    /// Receive decimation, first stage (192 kHz -> 48 kHz)
    RxDecimate1,
    /// Receive decimation, second stage (48 kHz -> 24 kHz)
    RxDecimate2,
    /// Receive passband (sideband-selecting) convolution
    RxPassband,
    /// Receive per-band audio equalizer
    RxEqualizer,
    /// Receive interpolation, first stage (24 kHz -> 48 kHz)
    RxInterpolate1,
    /// Receive interpolation, second stage (48 kHz -> 192 kHz)
    RxInterpolate2,
    /// Transmit decimation, first stage
    TxDecimate1,
    /// Transmit decimation, second stage
    TxDecimate2,
    /// Transmit microphone equalizer
    TxEqualizer,
    /// Transmit Hilbert transformer
    TxHilbert,
    /// Transmit interpolation, first stage
    TxInterpolate1,
    /// Transmit interpolation, second stage
    TxInterpolate2,
}

impl FilterStage {
    /// Number of distinct stages
    pub const COUNT: usize = 12;

    /// Stage slot for per-stage filter state
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Opaque filter-configuration handle passed to a [`FilterBank`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterConfig {
    stage: FilterStage,
    factor: usize,
    low_hz: f32,
    high_hz: f32,
}

impl FilterConfig {
    /// Rate-changing stage by an integer factor
    #[must_use]
    pub const fn rate_change(stage: FilterStage, factor: usize) -> Self {
        Self {
            stage,
            factor,
            low_hz: 0.0,
            high_hz: 0.0,
        }
    }

    /// Band-limiting stage between two edge frequencies
    ///
    /// Edges are signed for the complex passband: a USB passband is
    /// positive, an LSB passband negative.
    #[must_use]
    pub const fn band(stage: FilterStage, low_hz: f32, high_hz: f32) -> Self {
        Self {
            stage,
            factor: 1,
            low_hz,
            high_hz,
        }
    }

    /// Stage with no parameters
    #[must_use]
    pub const fn plain(stage: FilterStage) -> Self {
        Self::rate_change(stage, 1)
    }

    /// Stage identity
    #[must_use]
    pub const fn stage(&self) -> FilterStage {
        self.stage
    }

    /// Rate change factor (1 for non rate-changing stages)
    #[must_use]
    pub const fn factor(&self) -> usize {
        self.factor
    }

    /// Lower band edge in Hz
    #[must_use]
    pub const fn low_hz(&self) -> f32 {
        self.low_hz
    }

    /// Upper band edge in Hz
    #[must_use]
    pub const fn high_hz(&self) -> f32 {
        self.high_hz
    }
}

/// Receive decimation stages (x4 then x2)
pub const RX_DECIMATE: [FilterConfig; 2] = [
    FilterConfig::rate_change(FilterStage::RxDecimate1, DECIMATION_STAGE_1),
    FilterConfig::rate_change(FilterStage::RxDecimate2, DECIMATION_STAGE_2),
];

/// Receive interpolation stages (x2 then x4)
pub const RX_INTERPOLATE: [FilterConfig; 2] = [
    FilterConfig::rate_change(FilterStage::RxInterpolate1, DECIMATION_STAGE_2),
    FilterConfig::rate_change(FilterStage::RxInterpolate2, DECIMATION_STAGE_1),
];

/// Transmit decimation stages (x4 then x2)
pub const TX_DECIMATE: [FilterConfig; 2] = [
    FilterConfig::rate_change(FilterStage::TxDecimate1, DECIMATION_STAGE_1),
    FilterConfig::rate_change(FilterStage::TxDecimate2, DECIMATION_STAGE_2),
];

/// Transmit interpolation stages (x2 then x4)
pub const TX_INTERPOLATE: [FilterConfig; 2] = [
    FilterConfig::rate_change(FilterStage::TxInterpolate1, DECIMATION_STAGE_2),
    FilterConfig::rate_change(FilterStage::TxInterpolate2, DECIMATION_STAGE_1),
];

/// Decimation, interpolation and shaping filters
///
/// Implementations keep their own per-stage state, keyed by
/// [`FilterConfig::stage`]. Only `decimate` and `interpolate` may change
/// the block length and rate, and only through
/// [`SampleBlock::resize_with_rate`].
pub trait FilterBank {
    /// Anti-alias filter and keep every `factor`-th sample
    fn decimate(&mut self, config: &FilterConfig, block: &mut SampleBlock);

    /// Raise the rate by `factor` with anti-image filtering
    fn interpolate(&mut self, config: &FilterConfig, block: &mut SampleBlock);

    /// Audio equalizer (receive per band, transmit microphone)
    fn equalize(&mut self, config: &FilterConfig, block: &mut SampleBlock);

    /// Put the 90° shifted I channel into Q, with I delay matched
    fn hilbert(&mut self, config: &FilterConfig, block: &mut SampleBlock);

    /// Complex passband convolution (sideband selection)
    fn convolve(&mut self, config: &FilterConfig, block: &mut SampleBlock);
}

/// Check that a stage moved length and rate to the expected values
fn check_stage(block: &SampleBlock, expected_len: usize, expected_rate: u32) -> bool {
    if block.len() == expected_len && block.sample_rate() == expected_rate {
        return true;
    }
    diag_warn!(
        "multirate stage produced {} samples at {} Hz, expected {} at {} Hz",
        block.len(),
        block.sample_rate(),
        expected_len,
        expected_rate
    );
    false
}

/// Run decimation stages in order
///
/// Returns false if any stage left the block inconsistent. The block is
/// still processed by the remaining stages.
pub fn decimate<B: FilterBank + ?Sized>(
    bank: &mut B,
    stages: &[FilterConfig],
    block: &mut SampleBlock,
) -> bool {
    let mut consistent = true;
    for config in stages {
        let factor = config.factor().max(1);
        let expected_len = block.len() / factor;
        let expected_rate = block.sample_rate() / factor as u32;
        bank.decimate(config, block);
        consistent &= check_stage(block, expected_len, expected_rate);
    }
    consistent
}

/// Run interpolation stages in order
///
/// Returns false if any stage left the block inconsistent.
pub fn interpolate<B: FilterBank + ?Sized>(
    bank: &mut B,
    stages: &[FilterConfig],
    block: &mut SampleBlock,
) -> bool {
    let mut consistent = true;
    for config in stages {
        let factor = config.factor().max(1);
        let expected_len = (block.len() * factor).min(SampleBlock::CAPACITY);
        let expected_rate = block.sample_rate() * factor as u32;
        bank.interpolate(config, block);
        consistent &= check_stage(block, expected_len, expected_rate);
    }
    consistent
}

/// Per-stage filter state for both channels
#[derive(Clone, Copy, Debug, Default)]
struct StageFilters {
    i: BiquadPair,
    q: BiquadPair,
    /// Configuration and input rate the sections were designed for
    design: Option<(FilterConfig, u32)>,
}

impl StageFilters {
    /// Redesign (and clear) the sections when the configuration changes
    fn prepare(
        &mut self,
        config: &FilterConfig,
        sample_rate: u32,
        design: impl FnOnce(f32) -> (BiquadCoeffs, BiquadCoeffs),
    ) {
        if self.design == Some((*config, sample_rate)) {
            return;
        }
        let (first, second) = design(sample_rate.max(1) as f32);
        self.i = BiquadPair::new(first, second);
        self.q = BiquadPair::new(first, second);
        self.design = Some((*config, sample_rate));
    }

    fn process(&mut self, block: &mut SampleBlock) {
        let (i, q) = block.channels_mut();
        self.i.process_block(i);
        self.q.process_block(q);
    }
}

/// Butterworth-like Q for each half of a fourth-order cascade
const CASCADE_Q: f32 = 0.707;

/// Anti-alias / anti-image cutoff as a fraction of the low-rate Nyquist
const RATE_CHANGE_CUTOFF: f32 = 0.8;

/// Reference filter bank built from biquad cascades
#[derive(Clone, Debug)]
pub struct BiquadFilterBank {
    stages: [StageFilters; FilterStage::COUNT],
    passband_osc: QuadratureOscillator,
    passband_tuning: (f32, u32),
    hilbert: HilbertFir,
}

impl BiquadFilterBank {
    /// Create a bank with every stage unconfigured
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: [StageFilters::default(); FilterStage::COUNT],
            passband_osc: QuadratureOscillator::new(),
            passband_tuning: (0.0, 0),
            hilbert: HilbertFir::new(),
        }
    }

    fn stage(&mut self, config: &FilterConfig) -> &mut StageFilters {
        &mut self.stages[config.stage().index()]
    }

    /// Anti-alias / anti-image sections for a rate change by `factor`,
    /// normalized to the high rate
    fn rate_change_design(factor: usize) -> (BiquadCoeffs, BiquadCoeffs) {
        let coeffs = BiquadCoeffs::lowpass(RATE_CHANGE_CUTOFF * 0.5 / factor as f32, CASCADE_Q);
        (coeffs, coeffs)
    }
}

impl Default for BiquadFilterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBank for BiquadFilterBank {
    fn decimate(&mut self, config: &FilterConfig, block: &mut SampleBlock) {
        let factor = config.factor().max(1);
        let rate = block.sample_rate();
        let filters = self.stage(config);
        filters.prepare(config, rate, |_| Self::rate_change_design(factor));
        filters.process(block);

        let out_len = block.len() / factor;
        let (i, q) = block.channels_mut();
        for k in 0..out_len {
            i[k] = i[k * factor];
            q[k] = q[k * factor];
        }
        block.resize_with_rate(out_len, rate / factor as u32);
    }

    fn interpolate(&mut self, config: &FilterConfig, block: &mut SampleBlock) {
        let factor = config.factor().max(1);
        let in_len = block.len();
        let out_rate = block.sample_rate() * factor as u32;
        let out_len = (in_len * factor).min(SampleBlock::CAPACITY);
        block.resize_with_rate(out_len, out_rate);

        // Zero-stuff in place, back to front; the gain restores the level
        let gain = factor as f32;
        let (i, q) = block.channels_mut();
        for k in (0..in_len).rev() {
            let (si, sq) = (i[k], q[k]);
            for j in 0..factor {
                let idx = k * factor + j;
                if idx < out_len {
                    let (vi, vq) = if j == 0 { (si * gain, sq * gain) } else { (0.0, 0.0) };
                    i[idx] = vi;
                    q[idx] = vq;
                }
            }
        }

        let filters = self.stage(config);
        filters.prepare(config, out_rate, |_| Self::rate_change_design(factor));
        filters.process(block);
    }

    fn equalize(&mut self, config: &FilterConfig, block: &mut SampleBlock) {
        let (low, high) = (config.low_hz(), config.high_hz());
        if high <= low {
            return;
        }
        let filters = self.stage(config);
        filters.prepare(config, block.sample_rate(), |fs| {
            let highpass = if low > 0.0 {
                BiquadCoeffs::highpass(low / fs, CASCADE_Q)
            } else {
                BiquadCoeffs::IDENTITY
            };
            (highpass, BiquadCoeffs::lowpass(high / fs, CASCADE_Q))
        });
        filters.process(block);
    }

    fn hilbert(&mut self, _config: &FilterConfig, block: &mut SampleBlock) {
        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (delayed, shifted) = self.hilbert.process(*si);
            *si = delayed;
            *sq = shifted;
        }
    }

    fn convolve(&mut self, config: &FilterConfig, block: &mut SampleBlock) {
        let (low, high) = (config.low_hz(), config.high_hz());
        if high <= low {
            return;
        }
        let center = (low + high) / 2.0;
        let half_width = (high - low) / 2.0;
        let rate = block.sample_rate();

        if (center, rate) != self.passband_tuning {
            self.passband_tuning = (center, rate);
            self.passband_osc.set_frequency(center, rate as f32);
        }

        let filters = &mut self.stages[config.stage().index()];
        filters.prepare(config, rate, |fs| {
            let coeffs = BiquadCoeffs::lowpass(half_width / fs, CASCADE_Q);
            (coeffs, coeffs)
        });

        // Mix the passband center to DC, lowpass, mix back up
        let (i, q) = block.channels_mut();
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (c, s) = self.passband_osc.next();
            let down_i = *si * c + *sq * s;
            let down_q = *sq * c - *si * s;
            let fi = filters.i.process(down_i);
            let fq = filters.q.process(down_q);
            *si = fi * c - fq * s;
            *sq = fi * s + fq * c;
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::config::{
        DECIMATED_BLOCK_SIZE, DECIMATED_SAMPLE_RATE, NATIVE_SAMPLE_RATE, READ_BUFFER_SIZE,
    };
    use core::f32::consts::PI;

    fn complex_tone(len: usize, freq: f32, rate: u32) -> SampleBlock {
        let mut block = SampleBlock::new(rate);
        for n in 0..len {
            let phase = 2.0 * PI * freq * n as f32 / rate as f32;
            block.push(0.5 * phase.cos(), 0.5 * phase.sin());
        }
        block
    }

    fn tail_peak(block: &SampleBlock) -> f32 {
        let half = block.len() / 2;
        block.i()[half..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Bank that drops the rate but forgets to change it
    struct Broken;

    impl FilterBank for Broken {
        fn decimate(&mut self, config: &FilterConfig, block: &mut SampleBlock) {
            let rate = block.sample_rate();
            block.resize_with_rate(block.len() / config.factor(), rate);
        }
        fn interpolate(&mut self, _: &FilterConfig, _: &mut SampleBlock) {}
        fn equalize(&mut self, _: &FilterConfig, _: &mut SampleBlock) {}
        fn hilbert(&mut self, _: &FilterConfig, _: &mut SampleBlock) {}
        fn convolve(&mut self, _: &FilterConfig, _: &mut SampleBlock) {}
    }

    #[test]
    fn receive_framing_round_trip() {
        let mut bank = BiquadFilterBank::new();
        let mut block = complex_tone(READ_BUFFER_SIZE, 1_000.0, NATIVE_SAMPLE_RATE);

        assert!(decimate(&mut bank, &RX_DECIMATE, &mut block));
        assert_eq!(block.len(), DECIMATED_BLOCK_SIZE);
        assert_eq!(block.sample_rate(), DECIMATED_SAMPLE_RATE);

        assert!(interpolate(&mut bank, &RX_INTERPOLATE, &mut block));
        assert_eq!(block.len(), READ_BUFFER_SIZE);
        assert_eq!(block.sample_rate(), NATIVE_SAMPLE_RATE);
    }

    #[test]
    fn decimation_keeps_in_band_tone() {
        let mut bank = BiquadFilterBank::new();
        let mut block = complex_tone(READ_BUFFER_SIZE, 1_000.0, NATIVE_SAMPLE_RATE);
        decimate(&mut bank, &RX_DECIMATE, &mut block);
        let peak = tail_peak(&block);
        assert!(peak > 0.4 && peak < 0.6, "in-band level {peak}");
    }

    #[test]
    fn decimation_rejects_alias() {
        let mut bank = BiquadFilterBank::new();
        // 40 kHz would alias to 16 kHz at the 24 kHz rate
        let mut block = complex_tone(READ_BUFFER_SIZE, 40_000.0, NATIVE_SAMPLE_RATE);
        decimate(&mut bank, &RX_DECIMATE, &mut block);
        assert!(tail_peak(&block) < 0.05);
    }

    #[test]
    fn inconsistent_stage_is_reported() {
        let mut block = complex_tone(64, 1_000.0, NATIVE_SAMPLE_RATE);
        assert!(!decimate(&mut Broken, &RX_DECIMATE, &mut block));
        // Processing continued through both stages
        assert_eq!(block.len(), 8);
    }

    #[test]
    fn passband_selects_sideband() {
        let mut bank = BiquadFilterBank::new();
        let usb = FilterConfig::band(FilterStage::RxPassband, 200.0, 3_000.0);

        let mut upper = complex_tone(2048, 1_500.0, DECIMATED_SAMPLE_RATE);
        bank.convolve(&usb, &mut upper);
        let mut lower = complex_tone(2048, -1_500.0, DECIMATED_SAMPLE_RATE);
        bank.convolve(&usb, &mut lower);

        assert!(tail_peak(&upper) > 0.4, "wanted sideband {}", tail_peak(&upper));
        assert!(tail_peak(&lower) < 0.05, "opposite sideband {}", tail_peak(&lower));
    }

    #[test]
    fn hilbert_fills_quadrature() {
        let mut bank = BiquadFilterBank::new();
        let mut block = SampleBlock::new(DECIMATED_SAMPLE_RATE);
        for n in 0..512 {
            let x = (2.0 * PI * 3_000.0 * n as f32 / DECIMATED_SAMPLE_RATE as f32).cos();
            block.push(x, 0.0);
        }
        bank.hilbert(&FilterConfig::plain(FilterStage::TxHilbert), &mut block);
        // Analytic signal: |I + jQ| is flat once the FIR has filled
        for (i, q) in block.i()[64..].iter().zip(&block.q()[64..]) {
            let mag = (i * i + q * q).sqrt();
            assert!((mag - 1.0).abs() < 0.05, "magnitude {mag}");
        }
    }

    #[test]
    fn equalizer_bypassed_without_band() {
        let mut bank = BiquadFilterBank::new();
        let mut block = complex_tone(32, 1_000.0, DECIMATED_SAMPLE_RATE);
        let original = block.clone();
        bank.equalize(&FilterConfig::plain(FilterStage::RxEqualizer), &mut block);
        assert_eq!(block.i(), original.i());
    }
}
