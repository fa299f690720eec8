//! Precomputed lookup tables.
//!
//! Holds the shared Hann window every filter resamples, the A-weighting
//! reference curve, and the chromatic note layout.

use std::f64::consts::PI;

/// Length of the full Hann window described by the lookup table
pub const WINDOW_LENGTH: usize = 4096;
/// Only the rising half is stored, the falling half mirrors it
const WINDOW_LOOKUP_LENGTH: usize = WINDOW_LENGTH / 2;

/// Relative loudness of human hearing (Hz, dB), interpolated per note
pub const A_WEIGHT_TABLE: [(f32, f32); 13] = [
    (10.0, -70.4),
    (20.0, -50.5),
    (40.0, -34.6),
    (80.0, -22.5),
    (160.0, -13.4),
    (315.0, -6.6),
    (630.0, -1.9),
    (1000.0, 0.0),
    (1250.0, 0.6),
    (2500.0, 1.3),
    (5000.0, 0.5),
    (10000.0, -2.5),
    (20000.0, -9.3),
];

/// C0, note zero of the chromatic layout
const C0_HZ: f32 = 16.351_6;

/// Frequency of chromatic note `note`, counted in semitones above C0
pub fn note_frequency(note: usize) -> f32 {
    C0_HZ * 2f32.powf(note as f32 / 12.0)
}

/// Loudness correction in dB for `frequency`, clamped to the table's ends
pub fn a_weighting_db(frequency: f32) -> f32 {
    let (first_hz, first_db) = A_WEIGHT_TABLE[0];
    if frequency <= first_hz {
        return first_db;
    }

    for pair in A_WEIGHT_TABLE.windows(2) {
        let (low_hz, low_db) = pair[0];
        let (high_hz, high_db) = pair[1];
        if frequency <= high_hz {
            // Linear in log-frequency
            let t = (frequency.ln() - low_hz.ln()) / (high_hz.ln() - low_hz.ln());
            return low_db + t * (high_db - low_db);
        }
    }

    A_WEIGHT_TABLE[A_WEIGHT_TABLE.len() - 1].1
}

pub fn db_to_ratio(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Hann window stored as a Q15 half table
#[derive(Debug, Clone)]
pub struct WindowTable {
    values: Vec<i16>,
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowTable {
    pub fn new() -> Self {
        let values = (0..WINDOW_LOOKUP_LENGTH)
            .map(|i| {
                let w = 0.5 * (1.0 - (2.0 * PI * i as f64 / (WINDOW_LENGTH - 1) as f64).cos());
                (w * f64::from(i16::MAX)).round() as i16
            })
            .collect();
        Self { values }
    }

    /// Q15 weight of sample `n` of a block whose length is `WINDOW_LENGTH / window_scale`
    #[inline]
    pub fn weight(&self, n: usize, window_scale: f32) -> i16 {
        let pos = (n as f32 * window_scale) as usize;
        let idx = if pos < WINDOW_LOOKUP_LENGTH {
            pos
        } else {
            (WINDOW_LENGTH - 1).saturating_sub(pos)
        };
        self.values[idx.min(WINDOW_LOOKUP_LENGTH - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_layout() {
        // A4 is 57 semitones above C0
        assert!((note_frequency(57) - 440.0).abs() < 0.05);
        assert!((note_frequency(12) - 2.0 * note_frequency(0)).abs() < 1e-3);
    }

    #[test]
    fn test_window_shape() {
        let window = WindowTable::new();
        let block = 1024;
        let scale = WINDOW_LENGTH as f32 / block as f32;

        assert_eq!(window.weight(0, scale), 0);
        assert!(window.weight(block / 2, scale) > 32_700);
        assert!(window.weight(block - 1, scale) < 100);

        // Mirrored halves
        for n in 1..block / 2 {
            let rising = window.weight(n, scale) as i32;
            let falling = window.weight(block - n, scale) as i32;
            assert!((rising - falling).abs() <= 60, "asymmetric at {n}");
        }
    }

    #[test]
    fn test_weighting_hits_breakpoints() {
        for &(hz, db) in &A_WEIGHT_TABLE {
            assert!((a_weighting_db(hz) - db).abs() < 1e-3, "{hz} Hz");
        }
        assert_eq!(db_to_ratio(a_weighting_db(1000.0)), 1.0);
    }

    #[test]
    fn test_weighting_is_positive_and_continuous() {
        let mut hz = 5.0f32;
        let mut last = db_to_ratio(a_weighting_db(hz));
        while hz < 25_000.0 {
            hz *= 1.001;
            let ratio = db_to_ratio(a_weighting_db(hz));
            assert!(ratio > 0.0);
            // A 0.1% step in frequency never moves the curve by more than 2%
            assert!((ratio / last - 1.0).abs() < 0.02, "jump at {hz} Hz");
            last = ratio;
        }
    }

    #[test]
    fn test_weighting_clamps_outside_table() {
        assert_eq!(a_weighting_db(1.0), -70.4);
        assert_eq!(a_weighting_db(40_000.0), -9.3);
    }
}
