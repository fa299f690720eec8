//! The engine context: owns every stage and runs them once per chunk.
//!
//! Life cycle is construct, configure, process chunks, and rebuild/reset
//! whenever a bank-affecting setting changes.

use lightbridge_api::{PeerFlags, SpectralFrame, MAX_NOTES};

use super::filter_bank::{BankConfig, FilterBank};
use super::goertzel::GoertzelExecutor;
use super::ingest::SampleHistory;
use super::noise::{CalibrationState, NoiseCalibrator};
use super::normalizer::{AdaptiveNormalizer, NormalizerSettings};
use super::spectrogram::{AggregatorSettings, SpectrogramAggregator};
use crate::error::{ConfigError, EngineError};

/// Skipped chunks between two size mismatch warnings
const MISMATCH_LOG_INTERVAL: u64 = 256;

/// Settings that can change without rebuilding the bank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningConfig {
    pub normalizer: NormalizerSettings,
    pub aggregator: AggregatorSettings,
    /// Frames averaged by a noise calibration
    pub calibration_iterations: u32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerSettings::default(),
            aggregator: AggregatorSettings::default(),
            calibration_iterations: 256,
        }
    }
}

impl TuningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer.validate()?;
        self.aggregator.validate()?;
        if self.calibration_iterations == 0 {
            return Err(ConfigError::ZeroCalibrationIterations);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub bank: BankConfig,
    pub tuning: TuningConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bank.validate()?;
        self.tuning.validate()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub processed: u64,
    /// Chunks rejected for their size
    pub skipped: u64,
}

pub struct Engine {
    config: EngineConfig,
    bank: FilterBank,
    history: SampleHistory,
    executor: GoertzelExecutor,
    calibrator: NoiseCalibrator,
    normalizer: AdaptiveNormalizer,
    aggregator: SpectrogramAggregator,
    stats: FrameStats,
    /// Last level seen on the calibration input
    calibration_input: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bank = FilterBank::build(&config.bank)?;
        let tuning = config.tuning;

        Ok(Self {
            history: SampleHistory::new(config.bank.history_length, config.bank.chunk_size),
            executor: GoertzelExecutor::new(),
            calibrator: NoiseCalibrator::new(tuning.calibration_iterations),
            normalizer: AdaptiveNormalizer::new(tuning.normalizer),
            aggregator: SpectrogramAggregator::new(tuning.aggregator),
            stats: FrameStats::default(),
            calibration_input: false,
            bank,
            config,
        })
    }

    /// Applies a new configuration.
    ///
    /// Bank-affecting changes rebuild the bank and reset all run-time state
    /// (returns true); tuning-only changes apply in place. An invalid config
    /// leaves the engine untouched.
    pub fn configure(&mut self, config: EngineConfig) -> Result<bool, ConfigError> {
        config.validate()?;

        if config.bank != self.config.bank {
            *self = Self::new(config)?;
            log::info!("Filter bank rebuilt, run-time state reset");
            return Ok(true);
        }

        let tuning = config.tuning;
        self.normalizer.set_settings(tuning.normalizer);
        self.aggregator.set_settings(tuning.aggregator);
        self.calibrator.set_target_iterations(tuning.calibration_iterations);
        self.config = config;
        Ok(false)
    }

    /// Clears history, floors and every smoothed view
    pub fn reset(&mut self) {
        self.history.clear();
        self.executor.reset();
        self.calibrator.reset();
        self.normalizer.reset();
        self.aggregator.reset();
        self.stats = FrameStats::default();
    }

    /// Runs one chunk through every stage.
    ///
    /// A chunk of the wrong size is skipped and leaves all state untouched.
    pub fn process_chunk(&mut self, chunk: &[i16]) -> Result<(), EngineError> {
        if let Err(err) = self.history.ingest(chunk) {
            self.stats.skipped += 1;
            if self.stats.skipped == 1 || self.stats.skipped % MISMATCH_LOG_INTERVAL == 0 {
                log::warn!("Skipping chunk: {} ({} skipped)", err, self.stats.skipped);
            }
            return Err(err);
        }

        let raw = self.executor.run(&self.bank, &self.history);
        let weighted = self.normalizer.weigh(&self.bank, raw);
        self.calibrator.observe(weighted);
        let brightness = self.normalizer.normalize(&self.bank, self.calibrator.floors());
        self.aggregator.update(brightness);

        self.stats.processed += 1;
        Ok(())
    }

    pub fn trigger_calibration(&mut self) {
        self.calibrator.start();
    }

    pub fn cancel_calibration(&mut self) {
        self.calibrator.cancel();
    }

    /// Feeds the level of a calibration button; a rising edge starts a run
    pub fn set_calibration_input(&mut self, pressed: bool) {
        if pressed && !self.calibration_input {
            self.trigger_calibration();
        }
        self.calibration_input = pressed;
    }

    /// Snapshot of the current output for the renderer
    pub fn frame(&self) -> SpectralFrame {
        let mut frame = SpectralFrame {
            note_count: self.bank.len().min(MAX_NOTES) as u32,
            noise_complete: self.calibrator.is_complete(),
            calibration_progress: self.calibrator.progress(),
            ..Default::default()
        };

        for (i, &v) in self.aggregator.output().iter().enumerate() {
            let v = v.clamp(0.0, 1.0);
            frame.brightness[i] = v;
            frame.levels[i] = (v * 255.0).round() as u8;
        }
        for (slot, &v) in frame.long_term.iter_mut().zip(self.aggregator.long_term()) {
            *slot = v.clamp(0.0, 1.0);
        }
        frame.chromagram = *self.aggregator.chromagram();
        frame
    }

    /// Frame the renderer should draw: the main unit's mirrored frame when
    /// this unit follows an overriding main, otherwise the local one
    pub fn renderer_frame(&self, flags: PeerFlags, mirrored: Option<&SpectralFrame>) -> SpectralFrame {
        match mirrored {
            Some(frame) if flags.follows_main() => *frame,
            _ => self.frame(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn calibrator(&self) -> &NoiseCalibrator {
        &self.calibrator
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn normalizer(&self) -> &AdaptiveNormalizer {
        &self.normalizer
    }

    pub fn aggregator(&self) -> &SpectrogramAggregator {
        &self.aggregator
    }

    /// Raw magnitudes of the last processed chunk
    pub fn magnitudes(&self) -> &[f32] {
        self.executor.magnitudes()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
