//! Adaptive normalization: noise floor removal, per-zone automatic gain
//! control and per-note attack/release smoothing.
//!
//! Gain is tracked per zone so a dominant band (usually bass) cannot pull
//! the other bands down with it.

use lightbridge_api::{MAX_NOTES, MAX_ZONES};

use super::filter_bank::FilterBank;
use crate::error::{check_rate, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerSettings {
    /// Fraction of the gap closed when a zone gets louder (1.0 jumps)
    pub agc_attack: f32,
    /// Fraction of the gap closed when a zone gets quieter
    pub agc_release: f32,
    /// Lowest value a zone follower may take
    pub agc_floor: f32,
    /// Per-note follower rate towards a brighter target
    pub rise_rate: f32,
    /// Per-note follower rate towards a dimmer target
    pub fall_rate: f32,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            agc_attack: 0.5,
            agc_release: 0.005,
            agc_floor: 750.0,
            rise_rate: 0.7,
            fall_rate: 0.15,
        }
    }
}

impl NormalizerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("agc_attack", self.agc_attack)?;
        check_rate("agc_release", self.agc_release)?;
        check_rate("rise_rate", self.rise_rate)?;
        check_rate("fall_rate", self.fall_rate)?;
        if !(self.agc_floor > 0.0 && self.agc_floor.is_finite()) {
            return Err(ConfigError::InvalidAgcFloor(self.agc_floor));
        }
        Ok(())
    }
}

/// Next value of a zone's gain follower
fn follow_zone(follower: f32, zone_max: f32, settings: &NormalizerSettings) -> f32 {
    let next = if zone_max > follower {
        follower + (zone_max - follower) * settings.agc_attack
    } else {
        follower - (follower - zone_max) * settings.agc_release
    };
    next.max(settings.agc_floor)
}

pub struct AdaptiveNormalizer {
    settings: NormalizerSettings,
    note_count: usize,
    weighted: [f32; MAX_NOTES],
    denoised: [f32; MAX_NOTES],
    zone_max: [f32; MAX_ZONES],
    zone_followers: [f32; MAX_ZONES],
    /// Unsmoothed brightness
    targets: [f32; MAX_NOTES],
    followers: [f32; MAX_NOTES],
    /// Follower values of the previous frame
    previous: [f32; MAX_NOTES],
}

impl AdaptiveNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self {
            settings,
            note_count: 0,
            weighted: [0.0; MAX_NOTES],
            denoised: [0.0; MAX_NOTES],
            zone_max: [0.0; MAX_ZONES],
            zone_followers: [settings.agc_floor; MAX_ZONES],
            targets: [0.0; MAX_NOTES],
            followers: [0.0; MAX_NOTES],
            previous: [0.0; MAX_NOTES],
        }
    }

    /// Applies the perceptual weighting to raw magnitudes
    pub fn weigh(&mut self, bank: &FilterBank, raw: &[f32]) -> &[f32] {
        self.note_count = bank.len().min(raw.len()).min(MAX_NOTES);
        for ((slot, &m), filter) in self.weighted.iter_mut().zip(raw).zip(bank.filters()) {
            let weighted = m * filter.weighting_ratio;
            *slot = if weighted.is_finite() { weighted } else { 0.0 };
        }
        &self.weighted[..self.note_count]
    }

    /// Turns the last weighted frame into smoothed brightness (0-1)
    pub fn normalize(&mut self, bank: &FilterBank, floors: &[f32]) -> &[f32] {
        let n = self.note_count;
        let zones = bank.zone_count().min(MAX_ZONES);
        let filters = bank.filters();

        self.previous = self.followers;

        for i in 0..n {
            self.denoised[i] = (self.weighted[i] - floors.get(i).copied().unwrap_or(0.0)).max(0.0);
        }

        self.zone_max[..zones].fill(0.0);
        for (filter, &d) in filters.iter().zip(&self.denoised[..n]) {
            let zone = filter.zone.min(zones - 1);
            self.zone_max[zone] = self.zone_max[zone].max(d);
        }
        for z in 0..zones {
            self.zone_followers[z] = follow_zone(self.zone_followers[z], self.zone_max[z], &self.settings);
        }

        for (i, filter) in filters.iter().enumerate().take(n) {
            let follower = self.zone_followers[filter.zone.min(zones - 1)];
            let target = (self.denoised[i] / follower).clamp(0.0, 1.0);
            self.targets[i] = target;

            let current = self.followers[i];
            self.followers[i] = if target > current {
                current + (target - current) * self.settings.rise_rate
            } else {
                current - (current - target) * self.settings.fall_rate
            };
        }

        &self.followers[..n]
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Rates apply from the next frame; followers are lifted to a raised floor
    pub fn set_settings(&mut self, settings: NormalizerSettings) {
        self.settings = settings;
        for follower in &mut self.zone_followers {
            *follower = follower.max(settings.agc_floor);
        }
    }

    pub fn weighted(&self) -> &[f32] {
        &self.weighted[..self.note_count]
    }

    pub fn denoised(&self) -> &[f32] {
        &self.denoised[..self.note_count]
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets[..self.note_count]
    }

    pub fn smoothed(&self) -> &[f32] {
        &self.followers[..self.note_count]
    }

    pub fn previous(&self) -> &[f32] {
        &self.previous[..self.note_count]
    }

    pub fn zone_max(&self) -> &[f32; MAX_ZONES] {
        &self.zone_max
    }

    pub fn zone_followers(&self) -> &[f32; MAX_ZONES] {
        &self.zone_followers
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::filter_bank::BankConfig;

    fn bank(zone_count: usize) -> FilterBank {
        FilterBank::build(&BankConfig {
            zone_count,
            ..Default::default()
        })
        .unwrap()
    }

    /// Raw magnitudes that weigh to `value` for every note in `zone`
    fn raw_for_zone(bank: &FilterBank, zone: usize, value: f32) -> Vec<f32> {
        bank.filters()
            .iter()
            .map(|f| if f.zone == zone { value / f.weighting_ratio } else { 0.0 })
            .collect()
    }

    fn run(normalizer: &mut AdaptiveNormalizer, bank: &FilterBank, raw: &[f32]) -> Vec<f32> {
        normalizer.weigh(bank, raw);
        normalizer.normalize(bank, &[0.0; MAX_NOTES]).to_vec()
    }

    #[test]
    fn test_silence_converges_to_zero() {
        let bank = bank(2);
        let mut normalizer = AdaptiveNormalizer::new(NormalizerSettings::default());

        run(&mut normalizer, &bank, &raw_for_zone(&bank, 0, 5000.0));
        let silence = vec![0.0; bank.len()];
        let mut out = Vec::new();
        for _ in 0..200 {
            out = run(&mut normalizer, &bank, &silence);
        }
        assert!(out.iter().all(|v| v.is_finite() && *v < 1e-6));
    }

    #[test]
    fn test_floor_is_subtracted() {
        let bank = bank(1);
        let mut normalizer = AdaptiveNormalizer::new(NormalizerSettings::default());
        let raw = raw_for_zone(&bank, 0, 100.0);
        let floors = [150.0; MAX_NOTES];

        normalizer.weigh(&bank, &raw);
        normalizer.normalize(&bank, &floors);
        assert!(normalizer.denoised().iter().all(|&d| d == 0.0));
        assert!(normalizer.targets().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_follower_rises_with_zone_max() {
        let settings = NormalizerSettings::default();
        let mut follower = settings.agc_floor;
        let mut zone_max = settings.agc_floor * 2.0;

        for _ in 0..20 {
            let next = follow_zone(follower, zone_max, &settings);
            assert!(next >= follower);
            follower = next;
            zone_max *= 1.1;
        }
    }

    #[test]
    fn test_follower_decays_to_floor_on_silence() {
        let settings = NormalizerSettings {
            agc_release: 0.1,
            ..Default::default()
        };
        let mut follower = settings.agc_floor * 10.0;

        loop {
            let next = follow_zone(follower, 0.0, &settings);
            if next == settings.agc_floor {
                break;
            }
            assert!(next < follower);
            follower = next;
        }
        // Pinned at the floor from then on
        assert_eq!(follow_zone(settings.agc_floor, 0.0, &settings), settings.agc_floor);
    }

    #[test]
    fn test_zones_gain_independently() {
        let bank = bank(2);
        let mut normalizer = AdaptiveNormalizer::new(NormalizerSettings::default());

        // Bass zone very loud, treble zone moderate
        let mut raw = raw_for_zone(&bank, 0, 50_000.0);
        for (slot, treble) in raw.iter_mut().zip(raw_for_zone(&bank, 1, 2_000.0)) {
            *slot += treble;
        }

        let mut out = Vec::new();
        for _ in 0..100 {
            out = run(&mut normalizer, &bank, &raw);
        }

        let last = bank.len() - 1;
        assert!(out[0] > 0.9);
        // Treble normalized against its own zone, not against the bass
        assert!(out[last] > 0.9, "treble {}", out[last]);
        assert!(normalizer.zone_followers()[0] > normalizer.zone_followers()[1]);
    }

    #[test]
    fn test_brightness_is_bounded() {
        let bank = bank(2);
        let mut normalizer = AdaptiveNormalizer::new(NormalizerSettings {
            agc_attack: 0.1,
            ..Default::default()
        });
        let raw = vec![1e9; bank.len()];

        for _ in 0..10 {
            run(&mut normalizer, &bank, &raw);
            assert!(normalizer.targets().iter().all(|&t| (0.0..=1.0).contains(&t)));
            assert!(normalizer.smoothed().iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_fast_rise_slow_fall() {
        let bank = bank(1);
        let mut normalizer = AdaptiveNormalizer::new(NormalizerSettings::default());
        let loud = raw_for_zone(&bank, 0, 10_000.0);
        let quiet = vec![0.0; bank.len()];

        let up = run(&mut normalizer, &bank, &loud)[0];
        let down = run(&mut normalizer, &bank, &quiet)[0];
        assert_eq!(normalizer.previous()[0], up);
        assert!(up > 0.5);
        assert!(up - down < up * 0.5);
    }
}
