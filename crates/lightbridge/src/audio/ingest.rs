//! Rolling sample history and raw capture conditioning.

use crate::error::EngineError;

/// Fixed-length window of the most recent samples, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct SampleHistory {
    samples: Vec<i16>,
    chunk_size: usize,
}

impl SampleHistory {
    /// `chunk_size` must not exceed `history_length` (checked by `BankConfig::validate`)
    pub fn new(history_length: usize, chunk_size: usize) -> Self {
        Self {
            samples: vec![0; history_length],
            chunk_size: chunk_size.min(history_length),
        }
    }

    /// Appends one chunk, evicting the oldest samples.
    ///
    /// A chunk of the wrong length is rejected without touching the history.
    pub fn ingest(&mut self, chunk: &[i16]) -> Result<(), EngineError> {
        if chunk.len() != self.chunk_size {
            return Err(EngineError::SizeMismatch {
                expected: self.chunk_size,
                got: chunk.len(),
            });
        }

        let len = self.samples.len();
        self.samples.copy_within(self.chunk_size.., 0);
        self.samples[len - self.chunk_size..].copy_from_slice(chunk);
        Ok(())
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// The newest `count` samples (or all of them if fewer are held)
    pub fn latest(&self, count: usize) -> &[i16] {
        &self.samples[self.samples.len().saturating_sub(count)..]
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.fill(0);
    }
}

/// How raw 32-bit capture words become history samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditioning {
    /// Right shift taking a raw word down to 16-bit range
    pub raw_shift: u32,
    /// Bias removed after the shift
    pub dc_offset: i32,
    /// Extra gain; the signal is multiplied by `1 + gain`
    pub gain: f32,
}

impl Default for Conditioning {
    fn default() -> Self {
        Self {
            raw_shift: 16,
            dc_offset: 0,
            gain: 0.0,
        }
    }
}

impl Conditioning {
    /// Converts one raw word, reporting whether it clipped
    #[inline]
    pub fn apply(&self, raw: i32) -> (i16, bool) {
        let centered = (raw >> self.raw_shift.min(31)) as i64 - i64::from(self.dc_offset);
        let scaled = centered as f32 * (1.0 + self.gain);
        let clipped = scaled > f32::from(i16::MAX) || scaled < f32::from(i16::MIN);
        (scaled.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16, clipped)
    }
}

/// Conditions `raw` into `out` and returns how many samples clipped
pub fn condition_raw(raw: &[i32], conditioning: &Conditioning, out: &mut [i16]) -> usize {
    let mut clipped = 0;
    for (dst, &word) in out.iter_mut().zip(raw) {
        let (sample, clip) = conditioning.apply(word);
        *dst = sample;
        clipped += usize::from(clip);
    }
    clipped
}
