//! Ambient noise floor calibration.
//!
//! While calibrating, every frame's weighted magnitudes are summed per note;
//! after the target number of frames the averages become the new floor. The
//! previous floor keeps being used until then, so a recalibration or a
//! cancelled one never leaves the engine with a transient zero floor.

use lightbridge_api::MAX_NOTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Calibrating { iterations: u32 },
}

pub struct NoiseCalibrator {
    state: CalibrationState,
    target_iterations: u32,
    accumulators: [f32; MAX_NOTES],
    floors: [f32; MAX_NOTES],
    /// At least one calibration has completed since the last reset
    calibrated: bool,
}

impl NoiseCalibrator {
    pub fn new(target_iterations: u32) -> Self {
        Self {
            state: CalibrationState::Idle,
            target_iterations: target_iterations.max(1),
            accumulators: [0.0; MAX_NOTES],
            floors: [0.0; MAX_NOTES],
            calibrated: false,
        }
    }

    /// Starts (or restarts) a calibration run
    pub fn start(&mut self) {
        self.accumulators = [0.0; MAX_NOTES];
        self.state = CalibrationState::Calibrating { iterations: 0 };
        log::info!(
            "Noise calibration started ({} frames)",
            self.target_iterations
        );
    }

    /// Abandons a running calibration, keeping the previous floor
    pub fn cancel(&mut self) {
        if let CalibrationState::Calibrating { iterations } = self.state {
            self.state = CalibrationState::Idle;
            log::info!(
                "Noise calibration cancelled after {}/{} frames",
                iterations,
                self.target_iterations
            );
        }
    }

    /// Feeds one frame of weighted magnitudes.
    ///
    /// Returns true on the frame that freezes a new floor.
    pub fn observe(&mut self, weighted: &[f32]) -> bool {
        let CalibrationState::Calibrating { iterations } = self.state else {
            return false;
        };

        for (acc, &m) in self.accumulators.iter_mut().zip(weighted) {
            *acc += m;
        }

        let iterations = iterations + 1;
        if iterations < self.target_iterations {
            self.state = CalibrationState::Calibrating { iterations };
            return false;
        }

        // The target may have been lowered mid-run; average what was summed
        let count = iterations as f32;
        for (floor, &acc) in self.floors.iter_mut().zip(&self.accumulators) {
            *floor = acc / count;
        }
        self.state = CalibrationState::Idle;
        self.calibrated = true;
        log::info!("Noise calibration complete");
        true
    }

    /// Per-note floor, all zero until the first calibration completes
    pub fn floors(&self) -> &[f32; MAX_NOTES] {
        &self.floors
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// No calibration is running
    pub fn is_complete(&self) -> bool {
        self.state == CalibrationState::Idle
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Fraction of the running calibration done, 1.0 when idle
    pub fn progress(&self) -> f32 {
        match self.state {
            CalibrationState::Idle => 1.0,
            CalibrationState::Calibrating { iterations } => {
                iterations as f32 / self.target_iterations as f32
            }
        }
    }

    pub fn target_iterations(&self) -> u32 {
        self.target_iterations
    }

    /// Applies from the next observed frame; a run already past the new
    /// target completes on that frame
    pub fn set_target_iterations(&mut self, target_iterations: u32) {
        self.target_iterations = target_iterations.max(1);
    }

    /// Forgets the floor and any running calibration
    pub fn reset(&mut self) {
        self.state = CalibrationState::Idle;
        self.accumulators = [0.0; MAX_NOTES];
        self.floors = [0.0; MAX_NOTES];
        self.calibrated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncalibrated_floor_is_zero() {
        let calibrator = NoiseCalibrator::new(8);
        assert!(calibrator.is_complete());
        assert!(!calibrator.is_calibrated());
        assert!(calibrator.floors().iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_completes_exactly_once() {
        let mut calibrator = NoiseCalibrator::new(4);
        calibrator.start();
        assert!(!calibrator.is_complete());

        let frames = [[1.0, 10.0], [3.0, 10.0], [5.0, 10.0], [7.0, 10.0]];
        let mut completions = 0;
        for (i, frame) in frames.iter().enumerate() {
            let done = calibrator.observe(frame);
            assert_eq!(done, i == frames.len() - 1);
            completions += usize::from(done);
        }
        assert_eq!(completions, 1);
        assert!(calibrator.is_complete());
        assert_eq!(calibrator.floors()[0], 4.0);
        assert_eq!(calibrator.floors()[1], 10.0);

        // Frozen until the next run
        for _ in 0..10 {
            assert!(!calibrator.observe(&[100.0, 100.0]));
        }
        assert_eq!(calibrator.floors()[0], 4.0);
    }

    #[test]
    fn test_previous_floor_holds_during_recalibration() {
        let mut calibrator = NoiseCalibrator::new(2);
        calibrator.start();
        calibrator.observe(&[2.0]);
        calibrator.observe(&[2.0]);
        assert_eq!(calibrator.floors()[0], 2.0);

        calibrator.start();
        calibrator.observe(&[8.0]);
        assert_eq!(calibrator.floors()[0], 2.0);
        assert_eq!(calibrator.progress(), 0.5);

        calibrator.observe(&[8.0]);
        assert_eq!(calibrator.floors()[0], 8.0);
    }

    #[test]
    fn test_cancel_keeps_floor() {
        let mut calibrator = NoiseCalibrator::new(2);
        calibrator.start();
        calibrator.observe(&[3.0]);
        calibrator.observe(&[3.0]);

        calibrator.start();
        calibrator.observe(&[50.0]);
        calibrator.cancel();

        assert!(calibrator.is_complete());
        assert_eq!(calibrator.floors()[0], 3.0);
        assert!(!calibrator.observe(&[50.0]));
        assert_eq!(calibrator.floors()[0], 3.0);
    }

    #[test]
    fn test_lowered_target_averages_observed_frames() {
        let mut calibrator = NoiseCalibrator::new(100);
        calibrator.start();
        for _ in 0..50 {
            assert!(!calibrator.observe(&[1.0, 4.0]));
        }

        calibrator.set_target_iterations(10);
        assert!(calibrator.observe(&[1.0, 4.0]));
        assert_eq!(calibrator.floors()[0], 1.0);
        assert_eq!(calibrator.floors()[1], 4.0);
        assert!(calibrator.is_complete());
    }

    #[test]
    fn test_restart_discards_partial_sums() {
        let mut calibrator = NoiseCalibrator::new(2);
        calibrator.start();
        calibrator.observe(&[100.0]);
        calibrator.start();
        calibrator.observe(&[1.0]);
        calibrator.observe(&[3.0]);
        assert_eq!(calibrator.floors()[0], 2.0);
    }
}
