//! Renderer-facing output of one processed audio chunk

use abi_stable::StableAbi;

/// Capacity of every per-note array
pub const MAX_NOTES: usize = 64;
/// Pitch classes in the chromagram
pub const NUM_CHROMA: usize = 12;

/// One frame of analysis output.
///
/// Only the first `note_count` entries of the per-note arrays are meaningful.
#[repr(C)]
#[derive(StableAbi, Clone, Copy, Debug, PartialEq)]
pub struct SpectralFrame {
    /// Number of active notes
    pub note_count: u32,
    /// Smoothed brightness per note (0-1)
    pub brightness: [f32; MAX_NOTES],
    /// `brightness` quantized to 0-255 for LED drivers
    pub levels: [u8; MAX_NOTES],
    /// Energy folded into 12 pitch classes (sum over octaves)
    pub chromagram: [f32; NUM_CHROMA],
    /// Slow-moving baseline of each note, tracks ambient musical energy
    pub long_term: [f32; MAX_NOTES],
    /// False while a noise calibration is running
    pub noise_complete: bool,
    /// Progress of the running calibration (0-1), 1 when idle
    pub calibration_progress: f32,
}

impl Default for SpectralFrame {
    fn default() -> Self {
        Self {
            note_count: 0,
            brightness: [0.0; MAX_NOTES],
            levels: [0; MAX_NOTES],
            chromagram: [0.0; NUM_CHROMA],
            long_term: [0.0; MAX_NOTES],
            noise_complete: true,
            calibration_progress: 1.0,
        }
    }
}

impl SpectralFrame {
    fn active(&self) -> usize {
        (self.note_count as usize).min(MAX_NOTES)
    }

    /// Brightness of the active notes
    pub fn notes(&self) -> &[f32] {
        &self.brightness[..self.active()]
    }

    /// Long-term baseline of the active notes
    pub fn baseline(&self) -> &[f32] {
        &self.long_term[..self.active()]
    }

    /// Quantized levels of the active notes
    pub fn note_levels(&self) -> &[u8] {
        &self.levels[..self.active()]
    }

    /// Pitch class holding the most energy, `None` when the chromagram is silent
    pub fn dominant_pitch_class(&self) -> Option<usize> {
        self.chromagram
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    /// Chromagram scaled so its loudest pitch class is 1.0
    pub fn normalized_chromagram(&self) -> [f32; NUM_CHROMA] {
        let peak = self.chromagram.iter().cloned().fold(0.0f32, f32::max);
        if peak <= 0.0 {
            return [0.0; NUM_CHROMA];
        }
        self.chromagram.map(|v| v / peak)
    }
}
