//! Configuration file management.
//!
//! Loads and saves `~/.lightbridge.toml`. The `[synced]` table is the part
//! replicated to peer units, `[private]` stays with this unit. Every private
//! value is optional and falls back to the engine default.

use lightbridge_api::SyncedConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::audio::{
    AggregatorSettings, BankConfig, CaptureSettings, Conditioning, EngineConfig, NormalizerSettings,
    TuningConfig,
};

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_LED_COUNT: usize = 128;

const CONFIG_TEMPLATE: &str = r#"# lightbridge configuration file

# =============================================================================
# Shared with peer units
# =============================================================================
[synced]
# photons = 1.0              # Master brightness (0-1)
# chroma = 0.0               # Hue spread across the strip, 0 = color by pitch class
# mood = 0.05                # Renderer smoothing (0 = snappy, 1 = dreamy)
# base_hue = 0.0             # Hue offset (0-1)
# lightshow_mode = "gdft"    # "gdft" or "chromagram"
# mirror_enabled = true

# =============================================================================
# This unit only
# =============================================================================
[private]
# Analysis range (changing any of these rebuilds the filter bank)
# sample_rate = 18000
# note_offset = 12           # Semitones above C0 of the lowest note (12 = C1)
# note_count = 64
# zone_count = 2             # AGC zones, each normalized on its own
# min_block_size = 64
# max_block_size = 1600
# history_length = 4096
# chunk_size = 256

# Capture conditioning
# gain = 0.0                 # Signal is multiplied by 1 + gain
# dc_offset = 0

# Gain control and smoothing
# agc_floor = 750.0          # Lowest zone gain reference
# agc_attack = 0.5
# agc_release = 0.005
# rise_rate = 0.7
# fall_rate = 0.15
# smoothing_rate = 0.5
# long_term_rate = 0.001
# square_iter = 1
# calibration_iterations = 256

# Output
# led_count = 128
# is_main_unit = false

# Last selected audio device (auto-saved)
# last_device = "Device Name"
# device_timeout_secs = 3
"#;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PrivateConfig {
    pub sample_rate: Option<u32>,
    pub note_offset: Option<usize>,
    pub note_count: Option<usize>,
    pub zone_count: Option<usize>,
    pub min_block_size: Option<usize>,
    pub max_block_size: Option<usize>,
    pub history_length: Option<usize>,
    pub chunk_size: Option<usize>,

    pub gain: Option<f32>,
    pub dc_offset: Option<i32>,

    pub agc_floor: Option<f32>,
    pub agc_attack: Option<f32>,
    pub agc_release: Option<f32>,
    pub rise_rate: Option<f32>,
    pub fall_rate: Option<f32>,
    pub smoothing_rate: Option<f32>,
    pub long_term_rate: Option<f32>,
    pub square_iter: Option<u32>,
    pub calibration_iterations: Option<u32>,

    pub led_count: Option<usize>,
    pub is_main_unit: Option<bool>,

    pub last_device: Option<String>,
    pub device_timeout_secs: Option<u64>,
}

impl PrivateConfig {
    pub fn bank(&self) -> BankConfig {
        let d = BankConfig::default();
        BankConfig {
            sample_rate: self.sample_rate.unwrap_or(d.sample_rate),
            note_offset: self.note_offset.unwrap_or(d.note_offset),
            note_count: self.note_count.unwrap_or(d.note_count),
            zone_count: self.zone_count.unwrap_or(d.zone_count),
            min_block_size: self.min_block_size.unwrap_or(d.min_block_size),
            max_block_size: self.max_block_size.unwrap_or(d.max_block_size),
            history_length: self.history_length.unwrap_or(d.history_length),
            chunk_size: self.chunk_size.unwrap_or(d.chunk_size),
        }
    }

    pub fn tuning(&self) -> TuningConfig {
        let n = NormalizerSettings::default();
        let a = AggregatorSettings::default();
        TuningConfig {
            normalizer: NormalizerSettings {
                agc_attack: self.agc_attack.unwrap_or(n.agc_attack),
                agc_release: self.agc_release.unwrap_or(n.agc_release),
                agc_floor: self.agc_floor.unwrap_or(n.agc_floor),
                rise_rate: self.rise_rate.unwrap_or(n.rise_rate),
                fall_rate: self.fall_rate.unwrap_or(n.fall_rate),
            },
            aggregator: AggregatorSettings {
                smoothing_rate: self.smoothing_rate.unwrap_or(a.smoothing_rate),
                long_term_rate: self.long_term_rate.unwrap_or(a.long_term_rate),
                square_iter: self.square_iter.unwrap_or(a.square_iter),
            },
            calibration_iterations: self
                .calibration_iterations
                .unwrap_or(TuningConfig::default().calibration_iterations),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            bank: self.bank(),
            tuning: self.tuning(),
        }
    }

    pub fn conditioning(&self) -> Conditioning {
        Conditioning {
            gain: self.gain.unwrap_or(0.0),
            dc_offset: self.dc_offset.unwrap_or(0),
            ..Default::default()
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        let bank = self.bank();
        CaptureSettings {
            sample_rate: bank.sample_rate,
            chunk_size: bank.chunk_size,
            conditioning: self.conditioning(),
            device_timeout: Duration::from_secs(self.device_timeout_secs()),
            preferred_device: self.last_device.clone(),
        }
    }

    pub fn led_count(&self) -> usize {
        self.led_count.unwrap_or(DEFAULT_LED_COUNT).max(1)
    }

    pub fn is_main_unit(&self) -> bool {
        self.is_main_unit.unwrap_or(false)
    }

    pub fn device_timeout_secs(&self) -> u64 {
        self.device_timeout_secs.unwrap_or(DEFAULT_DEVICE_TIMEOUT_SECS)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub synced: SyncedConfig,
    #[serde(default)]
    pub private: PrivateConfig,
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lightbridge.toml"))
    }

    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        // Create template file if it doesn't exist
        if !path.exists() {
            match fs::write(&path, CONFIG_TEMPLATE) {
                Ok(()) => log::info!("Created config template at {:?}", path),
                Err(e) => log::warn!("Could not write config template to {:?}: {}", path, e),
            }
        }

        Self::load_from(&path)
    }

    /// Reads a config file, falling back to defaults when it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        Self::from_toml_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config {:?}: {}", path, e);
            Self::default()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        match toml::to_string(self) {
            Ok(content) => match fs::write(path, content) {
                Ok(()) => log::info!("Config saved to {:?}", path),
                Err(e) => log::warn!("Could not save config to {:?}: {}", path, e),
            },
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    pub fn set_device(&mut self, name: &str) {
        self.private.last_device = Some(name.to_string());
        self.save();
    }
}

/// Reloads the config file when its modification time moves forward.
///
/// Checks are rate-limited to one every `CHECK_INTERVAL` polls.
pub struct ConfigWatcher {
    path: Option<PathBuf>,
    last_modified: Option<SystemTime>,
    check_counter: u32,
}

impl ConfigWatcher {
    const CHECK_INTERVAL: u32 = 30;

    pub fn new() -> Self {
        Self::with_path(Config::path())
    }

    pub fn with_path(path: Option<PathBuf>) -> Self {
        let last_modified = path.as_deref().and_then(modified);
        Self {
            path,
            last_modified,
            check_counter: 0,
        }
    }

    /// Call once per frame; returns the new config after an external edit
    pub fn poll(&mut self) -> Option<Config> {
        self.check_counter += 1;
        if self.check_counter < Self::CHECK_INTERVAL {
            return None;
        }
        self.check_counter = 0;

        let path = self.path.as_deref()?;
        let current = modified(path)?;
        if self.last_modified.is_some_and(|last| current <= last) {
            return None;
        }
        self.last_modified = Some(current);
        log::info!("Config changed, reloading {:?}", path);
        Some(Config::load_from(path))
    }

    /// Records the file's current state, e.g. after saving it ourselves
    pub fn mark_seen(&mut self) {
        self.last_modified = self.path.as_deref().and_then(modified);
    }
}

impl Default for ConfigWatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
