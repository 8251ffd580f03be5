//! Reference Noise Reduction
//!
//! Sample-domain stand-ins for the noise-reduction collaborator. They are
//! cheap enough for the loopback firmware and give the dispatcher real
//! behavior to exercise:
//! - Kim: Wiener-style gain from a smoothed envelope and a noise floor
//! - Spectral: soft gate below a tracked noise floor
//! - LMS: adaptive line enhancer, keeps the predictable (tonal) part
//! - Notch: the same enhancer, keeps the unpredictable part
//!
//! Demodulated audio sits in both channels; each reducer works on I and
//! copies the result to Q.

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use super::block::SampleBlock;
use super::dispatch::NoiseReducer;

/// Apply a per-sample processor to the I channel and mirror it into Q
fn process_audio(block: &mut SampleBlock, mut f: impl FnMut(f32) -> f32) {
    for sample in block.i_mut() {
        *sample = f(*sample);
    }
    block.copy_i_to_q();
}

/// Noise floor follower: falls quickly, rises slowly
#[derive(Clone, Copy, Debug)]
struct FloorTracker {
    floor: f32,
    alpha: f32,
}

impl FloorTracker {
    const MIN_FLOOR: f32 = 1e-4;

    const fn new(alpha: f32) -> Self {
        Self {
            floor: 1e-3,
            alpha,
        }
    }

    fn update(&mut self, magnitude: f32) -> f32 {
        if magnitude < self.floor * 2.0 {
            self.floor += self.alpha * (magnitude - self.floor);
        } else if magnitude > self.floor * 10.0 {
            self.floor *= 1.0 + self.alpha;
        }
        self.floor = self.floor.max(Self::MIN_FLOOR);
        self.floor
    }

    fn reset(&mut self) {
        self.floor = 1e-3;
    }
}

/// Wiener-style envelope gain
#[derive(Clone, Copy, Debug)]
pub struct WienerGate {
    envelope: f32,
    smoothing: f32,
    floor: FloorTracker,
    min_gain: f32,
}

impl WienerGate {
    /// Create a gate; `min_gain` bounds the attenuation
    #[must_use]
    pub fn new(min_gain: f32) -> Self {
        Self {
            envelope: 0.0,
            smoothing: 0.05,
            floor: FloorTracker::new(0.001),
            min_gain: min_gain.clamp(0.0, 1.0),
        }
    }

    /// Process a single sample
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        self.envelope += self.smoothing * (magnitude - self.envelope);
        let floor = self.floor.update(magnitude);

        let env_sq = self.envelope * self.envelope;
        let gain = if env_sq > 0.0 {
            ((env_sq - floor * floor) / env_sq).clamp(self.min_gain, 1.0)
        } else {
            self.min_gain
        };
        input * gain
    }

    /// Reset internal state
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.floor.reset();
    }
}

impl Default for WienerGate {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Soft gate below a tracked noise floor
#[derive(Clone, Copy, Debug)]
pub struct SpectralGate {
    floor: FloorTracker,
    /// Reduction amount (0.0 to 1.0)
    reduction: f32,
}

impl SpectralGate {
    /// Create a gate with the given reduction amount
    #[must_use]
    pub fn new(reduction: f32) -> Self {
        Self {
            floor: FloorTracker::new(0.001),
            reduction: reduction.clamp(0.0, 1.0),
        }
    }

    /// Process a single sample
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        let floor = self.floor.update(magnitude);

        let threshold = floor * (2.0 + self.reduction * 5.0);
        let gain = if magnitude < threshold {
            (magnitude / threshold).powf(1.0 + self.reduction * 2.0)
        } else {
            1.0
        };
        input * gain
    }

    /// Set reduction amount
    pub fn set_reduction(&mut self, reduction: f32) {
        self.reduction = reduction.clamp(0.0, 1.0);
    }

    /// Get reduction amount
    #[must_use]
    pub fn reduction(&self) -> f32 {
        self.reduction
    }

    /// Reset internal state
    pub fn reset(&mut self) {
        self.floor.reset();
    }
}

impl Default for SpectralGate {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Which half of the line enhancer to output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnhancerOutput {
    /// The prediction (periodic content, noise removed)
    Prediction,
    /// The prediction error (periodic content removed)
    Residual,
}

/// Enhancer taps
const LMS_TAPS: usize = 32;

/// Decorrelation delay between input and reference, in samples
const LMS_DELAY: usize = 4;

/// Delay line length (power of two)
const LMS_LINE: usize = 64;

/// Normalized-LMS adaptive line enhancer
///
/// Predicts each sample from a delayed reference. Tones are predictable,
/// noise and speech mostly are not, so the prediction is a denoiser and
/// the residual is an automatic notch.
#[derive(Clone, Debug)]
pub struct LineEnhancer {
    weights: [f32; LMS_TAPS],
    line: [f32; LMS_LINE],
    pos: usize,
    mu: f32,
    output: EnhancerOutput,
}

impl LineEnhancer {
    /// Create an enhancer
    ///
    /// # Arguments
    /// * `mu` - Normalized adaptation step (0.001 to 0.5)
    /// * `output` - Which half to return
    #[must_use]
    pub fn new(mu: f32, output: EnhancerOutput) -> Self {
        Self {
            weights: [0.0; LMS_TAPS],
            line: [0.0; LMS_LINE],
            pos: 0,
            mu: mu.clamp(0.001, 0.5),
            output,
        }
    }

    fn reference(&self, k: usize) -> f32 {
        self.line[(self.pos + LMS_LINE - LMS_DELAY - k) & (LMS_LINE - 1)]
    }

    /// Process a single sample
    pub fn process(&mut self, input: f32) -> f32 {
        self.line[self.pos] = input;

        let mut prediction = 0.0;
        let mut power = 1e-6;
        for (k, &w) in self.weights.iter().enumerate() {
            let x = self.reference(k);
            prediction += w * x;
            power += x * x;
        }

        let error = input - prediction;
        let step = self.mu * error / power;
        for k in 0..LMS_TAPS {
            let x = self.reference(k);
            self.weights[k] = (self.weights[k] + step * x).clamp(-1.0, 1.0);
        }

        self.pos = (self.pos + 1) & (LMS_LINE - 1);

        match self.output {
            EnhancerOutput::Prediction => prediction,
            EnhancerOutput::Residual => error,
        }
    }

    /// Get adaptation rate
    #[must_use]
    pub fn mu(&self) -> f32 {
        self.mu
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.weights.fill(0.0);
        self.line.fill(0.0);
        self.pos = 0;
    }
}

/// Reference implementation of every noise-reduction entry point
#[derive(Clone, Debug)]
pub struct ReferenceNoiseReducer {
    kim: WienerGate,
    spectral: SpectralGate,
    lms: LineEnhancer,
    notch: LineEnhancer,
}

impl ReferenceNoiseReducer {
    /// Create a reducer with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            kim: WienerGate::default(),
            spectral: SpectralGate::default(),
            lms: LineEnhancer::new(0.05, EnhancerOutput::Prediction),
            notch: LineEnhancer::new(0.05, EnhancerOutput::Residual),
        }
    }

    /// Reset every algorithm
    pub fn reset(&mut self) {
        self.kim.reset();
        self.spectral.reset();
        self.lms.reset();
        self.notch.reset();
    }
}

impl Default for ReferenceNoiseReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseReducer for ReferenceNoiseReducer {
    fn kim(&mut self, block: &mut SampleBlock) {
        process_audio(block, |x| self.kim.process(x));
    }

    fn spectral(&mut self, block: &mut SampleBlock) {
        process_audio(block, |x| self.spectral.process(x));
    }

    fn lms(&mut self, block: &mut SampleBlock) {
        process_audio(block, |x| self.lms.process(x));
    }

    fn notch(&mut self, block: &mut SampleBlock) {
        process_audio(block, |x| self.notch.process(x));
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    fn tone(n: usize) -> f32 {
        0.5 * (2.0 * PI * 0.05 * n as f32).sin()
    }

    /// Deterministic white-ish noise in [-amp, amp]
    fn noise(state: &mut u32, amp: f32) -> f32 {
        *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        ((*state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0) * amp
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    // =========================================================================
    // Spectral Gate Tests
    // =========================================================================

    #[test]
    fn spectral_reduction_clamp() {
        let mut gate = SpectralGate::default();
        gate.set_reduction(1.5);
        assert_eq!(gate.reduction(), 1.0);
        gate.set_reduction(-0.5);
        assert_eq!(gate.reduction(), 0.0);
    }

    #[test]
    fn spectral_attenuates_floor_passes_signal() {
        let mut gate = SpectralGate::new(0.8);
        for _ in 0..1000 {
            gate.process(0.001);
        }
        assert!(gate.process(0.001) <= 0.001, "weak signal should be attenuated");
        assert!(gate.process(0.5) > 0.3, "strong signal should mostly pass");
    }

    // =========================================================================
    // Wiener Gate Tests
    // =========================================================================

    #[test]
    fn wiener_gain_is_bounded() {
        let mut gate = WienerGate::new(0.2);
        let mut state = 7;
        for _ in 0..5000 {
            let x = noise(&mut state, 0.01);
            let y = gate.process(x);
            assert!(y.abs() <= x.abs() + f32::EPSILON);
            assert!(y.abs() >= 0.2 * x.abs() - f32::EPSILON);
        }
    }

    #[test]
    fn wiener_passes_strong_tone() {
        let mut gate = WienerGate::default();
        for n in 0..2000 {
            gate.process(tone(n));
        }
        let out: std::vec::Vec<f32> = (2000..2400).map(|n| gate.process(tone(n))).collect();
        let input: std::vec::Vec<f32> = (2000..2400).map(tone).collect();
        assert!(rms(&out) > 0.9 * rms(&input));
    }

    // =========================================================================
    // Line Enhancer Tests
    // =========================================================================

    #[test]
    fn enhancer_mu_clamp() {
        assert_eq!(LineEnhancer::new(2.0, EnhancerOutput::Residual).mu(), 0.5);
        assert_eq!(LineEnhancer::new(0.0, EnhancerOutput::Residual).mu(), 0.001);
    }

    #[test]
    fn notch_removes_steady_tone() {
        let mut notch = LineEnhancer::new(0.05, EnhancerOutput::Residual);
        for n in 0..8000 {
            notch.process(tone(n));
        }
        let out: std::vec::Vec<f32> = (8000..8400).map(|n| notch.process(tone(n))).collect();
        assert!(rms(&out) < 0.05, "residual {}", rms(&out));
    }

    #[test]
    fn lms_keeps_tone_and_drops_noise() {
        let mut lms = LineEnhancer::new(0.02, EnhancerOutput::Prediction);
        let mut state = 3;
        let mut err = std::vec::Vec::new();
        for n in 0..20_000 {
            let out = lms.process(tone(n) + noise(&mut state, 0.1));
            if n >= 19_000 {
                err.push(out - tone(n));
            }
        }
        // Input SNR error is the noise itself (rms ~0.058)
        assert!(rms(&err) < 0.05, "enhancer error {}", rms(&err));
    }

    #[test]
    fn enhancer_output_finite() {
        let mut lms = LineEnhancer::new(0.5, EnhancerOutput::Prediction);
        for n in 0..1000 {
            assert!(lms.process(if n % 2 == 0 { 1.0 } else { -1.0 }).is_finite());
        }
    }

    // =========================================================================
    // Reference Reducer Tests
    // =========================================================================

    #[test]
    fn reducer_mirrors_audio_into_q() {
        let mut reducer = ReferenceNoiseReducer::new();
        let mut block = SampleBlock::from_iq(&[0.3; 64], &[0.0; 64], 24_000);
        reducer.spectral(&mut block);
        assert_eq!(block.i(), block.q());
    }
}
