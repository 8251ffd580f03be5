//! Digital Filters
//!
//! Biquad sections and a windowed Hilbert FIR. These back the reference
//! filter bank, the reference notch and the CW narrow filter; production
//! builds can swap in designed coefficient sets through
//! [`super::multirate::FilterBank`].

use core::f32::consts::PI;
#[cfg(not(feature = "std"))]
use micromath::F32Ext;

/// Biquad (second-order IIR) filter coefficients
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients (b0, b1, b2)
    b: [f32; 3],
    /// Denominator coefficients (a1, a2) - a0 is always 1
    a: [f32; 2],
}

impl BiquadCoeffs {
    /// Pass-through section
    pub const IDENTITY: Self = Self {
        b: [1.0, 0.0, 0.0],
        a: [0.0, 0.0],
    };

    /// Shared RBJ cookbook prologue: `(cos w0, alpha)`
    fn prewarp(freq_normalized: f32, q: f32) -> (f32, f32) {
        let w0 = 2.0 * PI * freq_normalized;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalized(b: [f32; 3], a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [a1 / a0, a2 / a0],
        }
    }

    /// Create lowpass biquad filter
    #[must_use]
    pub fn lowpass(freq_normalized: f32, q: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq_normalized, q);
        let b1 = 1.0 - cos_w0;
        Self::normalized(
            [b1 / 2.0, b1, b1 / 2.0],
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Create highpass biquad filter
    #[must_use]
    pub fn highpass(freq_normalized: f32, q: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq_normalized, q);
        let b0 = f32::midpoint(1.0, cos_w0);
        Self::normalized(
            [b0, -(1.0 + cos_w0), b0],
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Create bandpass biquad filter (0 dB peak gain)
    #[must_use]
    pub fn bandpass(freq_normalized: f32, q: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq_normalized, q);
        Self::normalized(
            [alpha, 0.0, -alpha],
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Create notch filter
    #[must_use]
    pub fn notch(freq_normalized: f32, q: f32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq_normalized, q);
        Self::normalized(
            [1.0, -2.0 * cos_w0, 1.0],
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }
}

/// Biquad filter state (Direct Form II Transposed)
#[derive(Clone, Copy, Debug)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z: [f32; 2],
}

impl Biquad {
    /// Create with coefficients
    #[must_use]
    pub const fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, z: [0.0; 2] }
    }

    /// Process a single sample
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = c.b[0] * input + self.z[0];
        self.z[0] = c.b[1] * input - c.a[0] * output + self.z[1];
        self.z[1] = c.b[2] * input - c.a[1] * output;
        output
    }

    /// Process a block of samples in-place
    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.z = [0.0; 2];
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(BiquadCoeffs::IDENTITY)
    }
}

/// Two biquads in series (fourth-order response)
#[derive(Clone, Copy, Debug, Default)]
pub struct BiquadPair {
    stages: [Biquad; 2],
}

impl BiquadPair {
    /// Create a cascade of two sections
    #[must_use]
    pub const fn new(first: BiquadCoeffs, second: BiquadCoeffs) -> Self {
        Self {
            stages: [Biquad::new(first), Biquad::new(second)],
        }
    }

    /// Create a cascade of two sections with the same coefficients
    #[must_use]
    pub const fn uniform(coeffs: BiquadCoeffs) -> Self {
        Self::new(coeffs, coeffs)
    }

    /// Process a single sample
    pub fn process(&mut self, input: f32) -> f32 {
        let [first, second] = &mut self.stages;
        second.process(first.process(input))
    }

    /// Process a block of samples in-place
    pub fn process_block(&mut self, samples: &mut [f32]) {
        for stage in &mut self.stages {
            stage.process_block(samples);
        }
    }

    /// Reset both sections
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// Number of taps in [`HilbertFir`]
pub const HILBERT_TAPS: usize = 31;

/// Windowed 31-tap Hilbert transformer
///
/// Odd taps only, `h[n] = 2 / (π n)` under a Hamming window. The group
/// delay is `(HILBERT_TAPS - 1) / 2` samples; [`HilbertFir::process`]
/// also returns the input at that delay so the I channel can be aligned.
#[derive(Clone, Copy, Debug)]
pub struct HilbertFir {
    taps: [f32; HILBERT_TAPS],
    delay: [f32; HILBERT_TAPS],
    pos: usize,
}

impl HilbertFir {
    /// Group delay in samples
    pub const DELAY: usize = (HILBERT_TAPS - 1) / 2;

    /// Create a transformer with cleared state
    #[must_use]
    pub fn new() -> Self {
        let mut taps = [0.0; HILBERT_TAPS];
        let m = (HILBERT_TAPS - 1) as f32;
        for (k, tap) in taps.iter_mut().enumerate() {
            let n = k as i32 - Self::DELAY as i32;
            if n % 2 != 0 {
                let window = 0.54 - 0.46 * (2.0 * PI * k as f32 / m).cos();
                *tap = 2.0 / (PI * n as f32) * window;
            }
        }
        Self {
            taps,
            delay: [0.0; HILBERT_TAPS],
            pos: 0,
        }
    }

    /// Process one sample; returns `(delayed input, 90° shifted)`
    pub fn process(&mut self, input: f32) -> (f32, f32) {
        self.delay[self.pos] = input;

        let mut shifted = 0.0;
        let mut idx = self.pos;
        for &tap in &self.taps {
            shifted += tap * self.delay[idx];
            idx = if idx == 0 { HILBERT_TAPS - 1 } else { idx - 1 };
        }
        let delayed = self.delayed();

        self.pos = (self.pos + 1) % HILBERT_TAPS;
        (delayed, shifted)
    }

    /// Input sample from [`Self::DELAY`] samples ago
    fn delayed(&self) -> f32 {
        let idx = (self.pos + HILBERT_TAPS - Self::DELAY) % HILBERT_TAPS;
        self.delay[idx]
    }

    /// Reset transformer state
    pub fn reset(&mut self) {
        self.delay.fill(0.0);
        self.pos = 0;
    }
}

impl Default for HilbertFir {
    fn default() -> Self {
        Self::new()
    }
}
