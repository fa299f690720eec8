//! Goertzel executor: one single-bin DFT per note over the sample history.
//!
//! This is the hot loop of the engine. Each note costs O(block_size) integer
//! multiply-adds and nothing is allocated per frame.

use lightbridge_api::MAX_NOTES;
use num_complex::Complex;

use super::filter_bank::{FilterBank, NoteFilter};
use super::ingest::SampleHistory;
use super::tables::WindowTable;

/// Windowed Goertzel magnitude of the newest `filter.block_size` samples,
/// normalized by the block length. Always finite and non-negative.
pub fn magnitude(filter: &NoteFilter, samples: &[i16], window: &WindowTable) -> f32 {
    let block = filter.block_size.min(samples.len());
    if block == 0 {
        return 0.0;
    }

    let coeff = filter.coeff_q30;
    let mut q1: i64 = 0;
    let mut q2: i64 = 0;

    for (n, &sample) in samples[samples.len() - block..].iter().enumerate() {
        let weight = i64::from(window.weight(n, filter.window_scale));
        let windowed = (i64::from(sample) * weight) >> 15;
        let q0 = windowed + ((coeff * q1) >> 30) - q2;
        q2 = q1;
        q1 = q0;
    }

    // y = q1 - q2·e^(-jw)
    let (q1, q2) = (q1 as f64, q2 as f64);
    let state = Complex::new(q1 - q2 * filter.cosine, q2 * filter.sine);
    (state.norm() / block as f64) as f32
}

/// Runs every filter of a bank and keeps the raw magnitudes
pub struct GoertzelExecutor {
    window: WindowTable,
    magnitudes: [f32; MAX_NOTES],
    note_count: usize,
}

impl Default for GoertzelExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl GoertzelExecutor {
    pub fn new() -> Self {
        Self {
            window: WindowTable::new(),
            magnitudes: [0.0; MAX_NOTES],
            note_count: 0,
        }
    }

    /// Computes one raw magnitude per note from the current history
    pub fn run(&mut self, bank: &FilterBank, history: &SampleHistory) -> &[f32] {
        let samples = history.samples();
        for (slot, filter) in self.magnitudes.iter_mut().zip(bank.filters()) {
            *slot = magnitude(filter, samples, &self.window);
        }
        self.note_count = bank.len().min(MAX_NOTES);
        &self.magnitudes[..self.note_count]
    }

    /// Magnitudes from the last run
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes[..self.note_count]
    }

    pub fn window(&self) -> &WindowTable {
        &self.window
    }

    pub fn reset(&mut self) {
        self.magnitudes = [0.0; MAX_NOTES];
        self.note_count = 0;
    }
}
