//! CW Receive
//!
//! Reference CW collaborator: a narrow band-pass around the receive
//! pitch, then an envelope keying detector that times marks and spaces
//! and turns them into Morse elements and characters.
//!
//! Timing adapts to the sender: every recognised dit or dah pulls the
//! dit length estimate toward what was actually received.

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use heapless::String;

use super::block::SampleBlock;
use super::dispatch::CwProcessor;
use super::filter::{BiquadCoeffs, BiquadPair};
use crate::diag::diag_debug;

/// Decoded text capacity in characters
pub const CW_TEXT_CAPACITY: usize = 64;

/// Longest Morse pattern the decoder collects
const MAX_PATTERN: usize = 8;

/// Narrow filter Q
const NARROW_Q: f32 = 5.0;

/// Default sending speed used to seed the dit estimate
const DEFAULT_WPM: f32 = 20.0;

/// Morse table: character and its dit/dah pattern
const MORSE_TABLE: [(char, &str); 41] = [
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('/', "-..-."),
    ('=', "-...-"),
];

/// Look up the character for a dit/dah pattern
#[must_use]
pub fn morse_to_char(pattern: &str) -> Option<char> {
    MORSE_TABLE
        .iter()
        .find(|(_, p)| *p == pattern)
        .map(|&(c, _)| c)
}

/// Morse pattern for a character (case-insensitive)
#[must_use]
pub fn char_to_morse(c: char) -> Option<&'static str> {
    let upper = c.to_ascii_uppercase();
    MORSE_TABLE
        .iter()
        .find(|(ch, _)| *ch == upper)
        .map(|&(_, p)| p)
}

/// Narrow filter plus envelope-to-Morse decoder
#[derive(Clone, Debug)]
pub struct EnvelopeCwDecoder {
    pitch_hz: f32,
    filter_i: BiquadPair,
    filter_rate: u32,

    envelope: f32,
    peak: f32,
    attack: f32,
    release: f32,
    peak_decay: f32,
    detector_rate: u32,

    key_down: bool,
    /// Samples in the current mark or space
    run: u32,
    /// Dit length estimate in samples
    dit: f32,
    pattern: String<MAX_PATTERN>,
    word_pending: bool,
    text: String<CW_TEXT_CAPACITY>,
}

impl EnvelopeCwDecoder {
    /// Keying threshold relative to the tracked peak
    const ON_RATIO: f32 = 0.5;
    /// Release threshold relative to the tracked peak
    const OFF_RATIO: f32 = 0.25;
    /// Envelope below this is never a mark
    const MIN_LEVEL: f32 = 1e-4;

    /// Create a decoder centered on `pitch_hz`
    #[must_use]
    pub fn new(pitch_hz: f32) -> Self {
        Self {
            pitch_hz,
            filter_i: BiquadPair::default(),
            filter_rate: 0,
            envelope: 0.0,
            peak: 0.0,
            attack: 0.0,
            release: 0.0,
            peak_decay: 1.0,
            detector_rate: 0,
            key_down: false,
            run: 0,
            dit: 0.0,
            pattern: String::new(),
            word_pending: false,
            text: String::new(),
        }
    }

    /// Receive pitch in Hz
    #[must_use]
    pub const fn pitch_hz(&self) -> f32 {
        self.pitch_hz
    }

    /// Move the narrow filter to a new pitch
    pub fn set_pitch(&mut self, pitch_hz: f32) {
        self.pitch_hz = pitch_hz;
        self.filter_rate = 0;
    }

    /// Decoded text so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Discard decoded text
    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    /// Current dit length estimate in samples
    #[must_use]
    pub const fn dit_samples(&self) -> f32 {
        self.dit
    }

    /// Check if a mark is being received
    #[must_use]
    pub const fn is_key_down(&self) -> bool {
        self.key_down
    }

    fn prepare_filter(&mut self, sample_rate: u32) {
        if self.filter_rate == sample_rate {
            return;
        }
        let coeffs = BiquadCoeffs::bandpass(self.pitch_hz / sample_rate.max(1) as f32, NARROW_Q);
        self.filter_i = BiquadPair::uniform(coeffs);
        self.filter_rate = sample_rate;
    }

    fn prepare_detector(&mut self, sample_rate: u32) {
        if self.detector_rate == sample_rate {
            return;
        }
        let fs = sample_rate.max(1) as f32;
        self.attack = 1.0 - (-1.0 / (fs * 0.002)).exp();
        self.release = 1.0 - (-1.0 / (fs * 0.005)).exp();
        self.peak_decay = (-1.0 / (fs * 2.0)).exp();
        // PARIS timing: one dit is 1.2 / wpm seconds
        self.dit = fs * 1.2 / DEFAULT_WPM;
        self.detector_rate = sample_rate;
    }

    fn push_text(&mut self, c: char) {
        if self.text.push(c).is_err() {
            self.text.clear();
            let _ = self.text.push(c);
        }
    }

    /// A mark of `len` samples just ended
    fn end_mark(&mut self, len: u32) {
        let len = len as f32;
        let element = if len < 2.0 * self.dit {
            self.dit = 0.8 * self.dit + 0.2 * len;
            '.'
        } else {
            self.dit = 0.8 * self.dit + 0.2 * (len / 3.0);
            '-'
        };
        if self.pattern.push(element).is_err() {
            // Longer than any table entry; let it decode as unknown
            diag_debug!("CW pattern overflow");
        }
    }

    /// Called every space sample; emits characters and word gaps
    fn during_space(&mut self) {
        let run = self.run as f32;
        if !self.pattern.is_empty() && run > 2.0 * self.dit {
            let c = morse_to_char(&self.pattern).unwrap_or('*');
            self.pattern.clear();
            self.push_text(c);
            self.word_pending = true;
        } else if self.word_pending && run > 5.0 * self.dit {
            self.push_text(' ');
            self.word_pending = false;
        }
    }

    /// Feed one filtered audio sample to the keying detector
    fn detect(&mut self, sample: f32) {
        let magnitude = sample.abs();
        let coeff = if magnitude > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope += coeff * (magnitude - self.envelope);
        self.peak = (self.peak * self.peak_decay).max(self.envelope);

        let keyed = if self.key_down {
            self.envelope > Self::OFF_RATIO * self.peak
        } else {
            self.envelope > Self::ON_RATIO * self.peak && self.envelope > Self::MIN_LEVEL
        };

        if keyed == self.key_down {
            self.run = self.run.saturating_add(1);
        } else {
            if self.key_down {
                self.end_mark(self.run);
            }
            self.key_down = keyed;
            self.run = 1;
        }

        if !self.key_down {
            self.during_space();
        }
    }

    /// Reset detector and decoded text
    pub fn reset(&mut self) {
        self.filter_i.reset();
        self.envelope = 0.0;
        self.peak = 0.0;
        self.key_down = false;
        self.run = 0;
        self.detector_rate = 0;
        self.pattern.clear();
        self.word_pending = false;
        self.text.clear();
    }
}

impl Default for EnvelopeCwDecoder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CW_PITCH_HZ)
    }
}

impl CwProcessor for EnvelopeCwDecoder {
    fn narrow_filter(&mut self, block: &mut SampleBlock) {
        self.prepare_filter(block.sample_rate());
        self.filter_i.process_block(block.i_mut());
        block.copy_i_to_q();
    }

    fn decode(&mut self, block: &SampleBlock) {
        self.prepare_detector(block.sample_rate());
        for &sample in block.i() {
            self.detect(sample);
        }
    }

    fn set_pitch(&mut self, pitch_hz: f32) {
        if pitch_hz != self.pitch_hz {
            EnvelopeCwDecoder::set_pitch(self, pitch_hz);
        }
    }
}
