//! Per-note Goertzel filter bank.
//!
//! Built once from a [`BankConfig`] and rebuilt whenever the note range,
//! sample rate or block limits change. Everything is derived from the
//! configuration alone, so two builds of the same config are identical.

use lightbridge_api::{MAX_NOTES, MAX_ZONES};

use super::tables::{a_weighting_db, db_to_ratio, note_frequency, WINDOW_LENGTH};
use crate::error::ConfigError;

/// Distance between a note's two chromatic neighbours, as a fraction of its frequency
const NEIGHBOR_SPAN: f32 = 0.115_588_6; // 2^(1/12) - 2^(-1/12)

/// Inputs that shape the filter bank and the sample history it reads
#[derive(Debug, Clone, PartialEq)]
pub struct BankConfig {
    pub sample_rate: u32,
    /// Semitones above C0 of the lowest note
    pub note_offset: usize,
    pub note_count: usize,
    pub zone_count: usize,
    pub min_block_size: usize,
    pub max_block_size: usize,
    /// Samples kept in the rolling history
    pub history_length: usize,
    /// Samples delivered per chunk by the capture layer
    pub chunk_size: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            sample_rate: 18_000,
            note_offset: 12,
            note_count: MAX_NOTES,
            zone_count: 2,
            min_block_size: 64,
            max_block_size: 1600,
            history_length: 4096,
            chunk_size: 256,
        }
    }
}

impl BankConfig {
    pub fn lowest_frequency(&self) -> f32 {
        note_frequency(self.note_offset)
    }

    pub fn highest_frequency(&self) -> f32 {
        note_frequency(self.note_offset + self.note_count.saturating_sub(1))
    }

    /// Processed frames per second at this chunk size
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.chunk_size.max(1) as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunk);
        }
        if self.note_count == 0 || self.note_count > MAX_NOTES {
            return Err(ConfigError::InvalidNoteCount {
                count: self.note_count,
                max: MAX_NOTES,
            });
        }

        let nyquist_hz = self.sample_rate as f32 / 2.0;
        let highest_hz = self.highest_frequency();
        if highest_hz >= nyquist_hz {
            return Err(ConfigError::NoteRangeAboveNyquist {
                highest_hz,
                nyquist_hz,
            });
        }

        if self.zone_count == 0 || self.zone_count > MAX_ZONES || self.zone_count > self.note_count {
            return Err(ConfigError::InvalidZoneCount {
                count: self.zone_count,
                max: MAX_ZONES,
            });
        }
        if self.min_block_size == 0 || self.min_block_size > self.max_block_size {
            return Err(ConfigError::InvalidBlockRange {
                min: self.min_block_size,
                max: self.max_block_size,
            });
        }
        if self.max_block_size > self.history_length {
            return Err(ConfigError::BlockExceedsHistory {
                block: self.max_block_size,
                history: self.history_length,
            });
        }
        if self.chunk_size > self.history_length {
            return Err(ConfigError::ChunkExceedsHistory {
                chunk: self.chunk_size,
                history: self.history_length,
            });
        }

        Ok(())
    }
}

/// One single-bin DFT tuned to a note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteFilter {
    pub target_frequency: f32,
    /// `2·cos(2π·f/fs)` in Q30; narrower formats merge adjacent bass notes
    pub coeff_q30: i64,
    /// Cosine and sine of the quantized coefficient's angle
    pub cosine: f64,
    pub sine: f64,
    /// Trailing samples analyzed
    pub block_size: usize,
    /// Stretch applied to the shared window table
    pub window_scale: f32,
    pub zone: usize,
    /// Linear perceptual loudness multiplier
    pub weighting_ratio: f32,
}

impl NoteFilter {
    /// Filter for `target_frequency` in zone 0
    pub fn new(target_frequency: f32, sample_rate: u32, block_size: usize) -> Self {
        let w = 2.0 * std::f64::consts::PI * f64::from(target_frequency) / f64::from(sample_rate);
        let coeff_q30 = (2.0 * w.cos() * (1i64 << 30) as f64).round() as i64;

        let cosine = coeff_q30 as f64 / (1i64 << 31) as f64;
        let sine = (1.0 - cosine * cosine).max(0.0).sqrt();

        Self {
            target_frequency,
            coeff_q30,
            cosine,
            sine,
            block_size,
            window_scale: WINDOW_LENGTH as f32 / block_size.max(1) as f32,
            zone: 0,
            weighting_ratio: db_to_ratio(a_weighting_db(target_frequency)),
        }
    }
}

/// Immutable set of note filters, ordered by increasing frequency
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    config: BankConfig,
    filters: Vec<NoteFilter>,
}

impl FilterBank {
    pub fn build(config: &BankConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let filters: Vec<NoteFilter> = (0..config.note_count)
            .map(|n| {
                let frequency = note_frequency(config.note_offset + n);
                let mut filter =
                    NoteFilter::new(frequency, config.sample_rate, block_size_for(frequency, config));
                filter.zone = n * config.zone_count / config.note_count;
                filter
            })
            .collect();

        log::info!(
            "Filter bank: {} notes, {:.1}-{:.1} Hz, blocks {}-{}, {} zones",
            filters.len(),
            config.lowest_frequency(),
            config.highest_frequency(),
            filters.last().map_or(0, |f| f.block_size),
            filters.first().map_or(0, |f| f.block_size),
            config.zone_count,
        );

        Ok(Self {
            config: config.clone(),
            filters,
        })
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn filters(&self) -> &[NoteFilter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn zone_count(&self) -> usize {
        self.config.zone_count
    }
}

/// Window long enough to separate a note from its semitone neighbours
fn block_size_for(frequency: f32, config: &BankConfig) -> usize {
    let ideal = config.sample_rate as f32 / (frequency * NEIGHBOR_SPAN);
    (ideal.round() as usize).clamp(config.min_block_size, config.max_block_size)
}
