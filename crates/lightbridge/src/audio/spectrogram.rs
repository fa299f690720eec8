//! Spectrogram aggregation: instantaneous, smoothed and long-term views,
//! lookahead blending and the chromagram fold.

use lightbridge_api::{MAX_NOTES, NUM_CHROMA};

use crate::error::{check_rate, ConfigError};

/// Frames held by the lookahead blend
pub const LOOKAHEAD_FRAMES: usize = 3;

/// Blend weights, newest frame first
const LOOKAHEAD_WEIGHTS: [f32; LOOKAHEAD_FRAMES] = [0.5, 0.3, 0.2];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorSettings {
    /// Rate of the smoothed view towards the instantaneous one
    pub smoothing_rate: f32,
    /// Rate of the long-term baseline (roughly tens of seconds)
    pub long_term_rate: f32,
    /// Times the instantaneous view is squared for contrast
    pub square_iter: u32,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            smoothing_rate: 0.5,
            long_term_rate: 0.001,
            square_iter: 1,
        }
    }
}

impl AggregatorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("smoothing_rate", self.smoothing_rate)?;
        check_rate("long_term_rate", self.long_term_rate)
    }
}

/// Folds notes into pitch classes by summing every `index mod 12`
pub fn fold_chromagram(notes: &[f32], chromagram: &mut [f32; NUM_CHROMA]) {
    chromagram.fill(0.0);
    for (i, &v) in notes.iter().enumerate() {
        chromagram[i % NUM_CHROMA] += v;
    }
}

/// Ring of the most recent smoothed frames
#[derive(Clone)]
pub struct Lookahead {
    frames: [[f32; MAX_NOTES]; LOOKAHEAD_FRAMES],
    /// Slot of the newest frame
    head: usize,
    filled: usize,
}

impl Default for Lookahead {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookahead {
    pub fn new() -> Self {
        Self {
            frames: [[0.0; MAX_NOTES]; LOOKAHEAD_FRAMES],
            head: LOOKAHEAD_FRAMES - 1,
            filled: 0,
        }
    }

    pub fn push(&mut self, frame: &[f32]) {
        self.head = (self.head + 1) % LOOKAHEAD_FRAMES;
        let slot = &mut self.frames[self.head];
        let n = frame.len().min(MAX_NOTES);
        slot[..n].copy_from_slice(&frame[..n]);
        slot[n..].fill(0.0);
        self.filled = (self.filled + 1).min(LOOKAHEAD_FRAMES);
    }

    /// `age` 0 is the newest frame
    fn frame(&self, age: usize) -> &[f32; MAX_NOTES] {
        &self.frames[(self.head + LOOKAHEAD_FRAMES - age) % LOOKAHEAD_FRAMES]
    }

    /// Weighted blend of the held frames into `out`.
    ///
    /// Computed as offsets from the newest frame so a constant stream comes
    /// back unchanged. Missing frames count as the newest one.
    pub fn blend(&self, out: &mut [f32]) {
        if self.filled == 0 {
            out.fill(0.0);
            return;
        }
        let newest = self.frame(0);
        for (i, slot) in out.iter_mut().enumerate().take(MAX_NOTES) {
            let current = newest[i];
            let mut value = current;
            for age in 1..self.filled {
                value += LOOKAHEAD_WEIGHTS[age] * (self.frame(age)[i] - current);
            }
            *slot = value;
        }
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

pub struct SpectrogramAggregator {
    settings: AggregatorSettings,
    note_count: usize,
    /// Contrast-shaped instantaneous view
    spectrogram: [f32; MAX_NOTES],
    smoothed: [f32; MAX_NOTES],
    long_term: [f32; MAX_NOTES],
    lookahead: Lookahead,
    /// Lookahead-blended output driving the renderer
    output: [f32; MAX_NOTES],
    chromagram: [f32; NUM_CHROMA],
}

impl SpectrogramAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            note_count: 0,
            spectrogram: [0.0; MAX_NOTES],
            smoothed: [0.0; MAX_NOTES],
            long_term: [0.0; MAX_NOTES],
            lookahead: Lookahead::new(),
            output: [0.0; MAX_NOTES],
            chromagram: [0.0; NUM_CHROMA],
        }
    }

    /// Folds one frame of normalized brightness into every view
    pub fn update(&mut self, brightness: &[f32]) {
        let n = brightness.len().min(MAX_NOTES);
        self.note_count = n;

        for (i, &b) in brightness.iter().enumerate().take(n) {
            let mut v = if b.is_finite() { b.clamp(0.0, 1.0) } else { 0.0 };
            for _ in 0..self.settings.square_iter {
                v *= v;
            }
            self.spectrogram[i] = v;
            self.smoothed[i] += (v - self.smoothed[i]) * self.settings.smoothing_rate;
            self.long_term[i] += (v - self.long_term[i]) * self.settings.long_term_rate;
        }

        self.lookahead.push(&self.smoothed[..n]);
        self.lookahead.blend(&mut self.output[..n]);
        fold_chromagram(&self.output[..n], &mut self.chromagram);
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AggregatorSettings) {
        self.settings = settings;
    }

    pub fn spectrogram(&self) -> &[f32] {
        &self.spectrogram[..self.note_count]
    }

    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed[..self.note_count]
    }

    pub fn long_term(&self) -> &[f32] {
        &self.long_term[..self.note_count]
    }

    pub fn output(&self) -> &[f32] {
        &self.output[..self.note_count]
    }

    pub fn chromagram(&self) -> &[f32; NUM_CHROMA] {
        &self.chromagram
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromagram_fold_counts() {
        let notes = [1.0; MAX_NOTES];
        let mut chroma = [0.0; NUM_CHROMA];
        fold_chromagram(&notes, &mut chroma);

        // 64 notes: classes 0-3 get 6 entries, the rest 5
        for (p, &c) in chroma.iter().enumerate() {
            let expected = if p < 4 { 6.0 } else { 5.0 };
            assert_eq!(c, expected, "pitch class {p}");
        }
    }

    #[test]
    fn test_chromagram_isolates_each_pitch_class() {
        for p in 0..NUM_CHROMA {
            let mut notes = [0.0; MAX_NOTES];
            for (i, v) in notes.iter_mut().enumerate() {
                if i % NUM_CHROMA == p {
                    *v = 1.0;
                }
            }
            let mut chroma = [0.0; NUM_CHROMA];
            fold_chromagram(&notes, &mut chroma);

            let count = (0..MAX_NOTES).filter(|i| i % NUM_CHROMA == p).count() as f32;
            for (q, &c) in chroma.iter().enumerate() {
                let expected = if q == p { count } else { 0.0 };
                assert_eq!(c, expected, "notes of class {p}, pitch class {q}");
            }
        }
    }

    #[test]
    fn test_chromagram_single_note() {
        let mut notes = [0.0; 24];
        notes[14] = 0.5;
        let mut chroma = [1.0; NUM_CHROMA];
        fold_chromagram(&notes, &mut chroma);

        assert_eq!(chroma[2], 0.5);
        assert_eq!(chroma.iter().sum::<f32>(), 0.5);
    }

    #[test]
    fn test_lookahead_constant_stream_is_unchanged() {
        let mut lookahead = Lookahead::new();
        let frame = [0.37; 16];
        let mut out = [0.0; 16];

        for _ in 0..5 {
            lookahead.push(&frame);
            lookahead.blend(&mut out);
            assert_eq!(out, frame);
        }
    }

    #[test]
    fn test_lookahead_weights() {
        let mut lookahead = Lookahead::new();
        lookahead.push(&[0.0]);
        lookahead.push(&[0.0]);
        lookahead.push(&[1.0]);

        let mut out = [0.0];
        lookahead.blend(&mut out);
        assert!((out[0] - 0.5).abs() < 1e-6);

        // Oldest frame drops out of the ring
        lookahead.push(&[0.0]);
        lookahead.blend(&mut out);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert_eq!(lookahead.len(), LOOKAHEAD_FRAMES);
    }

    #[test]
    fn test_constant_input_converges() {
        let mut aggregator = SpectrogramAggregator::new(AggregatorSettings::default());
        let input = [0.5; 32];

        for _ in 0..200 {
            aggregator.update(&input);
        }
        // Squared once
        assert!(aggregator.spectrogram().iter().all(|&v| v == 0.25));
        assert!(aggregator.output().iter().all(|&v| (v - 0.25).abs() < 1e-4));
        assert!(aggregator.long_term().iter().all(|&v| v > 0.0 && v < 0.25));
        assert!((aggregator.chromagram()[0] - 0.25 * 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_input_stays_zero() {
        let mut aggregator = SpectrogramAggregator::new(AggregatorSettings::default());
        for _ in 0..10 {
            aggregator.update(&[0.0; MAX_NOTES]);
        }
        assert!(aggregator.output().iter().all(|&v| v == 0.0));
        assert_eq!(aggregator.chromagram(), &[0.0; NUM_CHROMA]);
    }

    #[test]
    fn test_non_finite_input_is_dropped() {
        let mut aggregator = SpectrogramAggregator::new(AggregatorSettings {
            square_iter: 0,
            ..Default::default()
        });
        aggregator.update(&[f32::NAN, f32::INFINITY, 2.0]);
        assert_eq!(aggregator.spectrogram(), &[0.0, 0.0, 1.0]);
        assert!(aggregator.output().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_zero_rate() {
        let settings = AggregatorSettings {
            smoothing_rate: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
