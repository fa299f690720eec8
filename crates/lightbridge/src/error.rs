//! Error types for bank construction and chunk processing.

use thiserror::Error;

/// Configuration the engine refuses to run with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("chunk size must be non-zero")]
    ZeroChunk,

    #[error("note count {count} is outside 1..={max}")]
    InvalidNoteCount { count: usize, max: usize },

    #[error("highest note ({highest_hz:.1} Hz) is not below the Nyquist frequency ({nyquist_hz:.1} Hz)")]
    NoteRangeAboveNyquist { highest_hz: f32, nyquist_hz: f32 },

    #[error("zone count {count} is outside 1..={max} or exceeds the note count")]
    InvalidZoneCount { count: usize, max: usize },

    #[error("block size range {min}..={max} is empty")]
    InvalidBlockRange { min: usize, max: usize },

    #[error("max block size {block} exceeds the sample history ({history})")]
    BlockExceedsHistory { block: usize, history: usize },

    #[error("chunk size {chunk} exceeds the sample history ({history})")]
    ChunkExceedsHistory { chunk: usize, history: usize },

    #[error("{name} must be within (0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f32 },

    #[error("AGC floor must be positive, got {0}")]
    InvalidAgcFloor(f32),

    #[error("noise calibration needs at least one iteration")]
    ZeroCalibrationIterations,
}

/// Failures surfaced by the engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The chunk was skipped; all state is as it was before the call
    #[error("expected a chunk of {expected} samples, got {got}")]
    SizeMismatch { expected: usize, got: usize },
}

/// Checks a smoothing/follower rate lies in (0, 1]
pub(crate) fn check_rate(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}
