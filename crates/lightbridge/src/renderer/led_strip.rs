//! LED strip preview.
//!
//! Maps a [`SpectralFrame`] onto a row of LEDs the way the strip driver
//! would and draws them as a row of lamps.

use lightbridge_api::{LightshowMode, SpectralFrame, SyncedConfig, NUM_CHROMA};
use nannou::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Led {
    /// 0-1, wraps
    pub hue: f32,
    /// 0-1
    pub value: f32,
}

/// Target color of every LED for one frame.
///
/// When mirrored, the lowest segment sits in the middle of the strip and
/// both halves grow outwards.
pub fn led_values(frame: &SpectralFrame, synced: &SyncedConfig, led_count: usize) -> Vec<Led> {
    let chroma;
    let values: &[f32] = match synced.lightshow_mode {
        LightshowMode::Gdft => frame.notes(),
        LightshowMode::Chromagram => {
            chroma = frame.normalized_chromagram();
            &chroma
        }
    };
    if values.is_empty() {
        return vec![Led::default(); led_count];
    }

    let span = if synced.mirror_enabled {
        led_count.div_ceil(2)
    } else {
        led_count
    };

    (0..led_count)
        .map(|i| {
            let j = if synced.mirror_enabled {
                ((2 * i + 1) as isize - led_count as isize).unsigned_abs() / 2
            } else {
                i
            };
            let segment = (j * values.len() / span).min(values.len() - 1);

            let hue = if synced.chroma > 0.0 {
                synced.base_hue + synced.chroma * j as f32 / span as f32
            } else {
                let class = match synced.lightshow_mode {
                    LightshowMode::Gdft => segment % NUM_CHROMA,
                    LightshowMode::Chromagram => segment,
                };
                synced.base_hue + class as f32 / NUM_CHROMA as f32
            };

            Led {
                hue: hue.rem_euclid(1.0),
                value: (values[segment] * synced.photons).clamp(0.0, 1.0),
            }
        })
        .collect()
}

pub struct LedStrip {
    leds: Vec<Led>,
}

impl LedStrip {
    pub fn new(led_count: usize) -> Self {
        Self {
            leds: vec![Led::default(); led_count],
        }
    }

    pub fn update(&mut self, frame: &SpectralFrame, synced: &SyncedConfig) {
        let targets = led_values(frame, synced, self.leds.len());
        // mood 0 follows the frame directly, higher moods glide
        let rate = (1.0 - synced.mood).clamp(0.05, 1.0);
        for (led, target) in self.leds.iter_mut().zip(targets) {
            led.hue = target.hue;
            led.value += (target.value - led.value) * rate;
        }
    }

    pub fn resize(&mut self, led_count: usize) {
        self.leds.resize(led_count.max(1), Led::default());
    }

    pub fn leds(&self) -> &[Led] {
        &self.leds
    }

    pub fn draw(&self, draw: &Draw, bounds: Rect) {
        draw.background().color(BLACK);

        let count = self.leds.len().max(1) as f32;
        let pitch = bounds.w() / count;
        let size = (pitch * 0.8).min(bounds.h() * 0.5);

        for (i, led) in self.leds.iter().enumerate() {
            let x = bounds.left() + pitch * (i as f32 + 0.5);
            // Glow first, lamp on top
            draw.ellipse()
                .x_y(x, 0.0)
                .w_h(size * 1.8, size * 1.8)
                .color(hsva(led.hue, 1.0, led.value, led.value * 0.25));
            draw.ellipse()
                .x_y(x, 0.0)
                .w_h(size, size)
                .color(hsv(led.hue, 1.0, led.value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_frame(note_count: usize) -> SpectralFrame {
        let mut frame = SpectralFrame {
            note_count: note_count as u32,
            ..Default::default()
        };
        for i in 0..note_count {
            frame.brightness[i] = i as f32 / note_count as f32;
            frame.chromagram[i % NUM_CHROMA] += frame.brightness[i];
        }
        frame
    }

    #[test]
    fn test_mirrored_strip_is_symmetric() {
        let frame = ramp_frame(64);
        let synced = SyncedConfig::default();

        for led_count in [7, 8, 60] {
            let leds = led_values(&frame, &synced, led_count);
            assert_eq!(leds.len(), led_count);
            for i in 0..led_count {
                assert_eq!(leds[i], leds[led_count - 1 - i]);
            }
            // Lowest note in the middle, highest at the ends
            assert!(leds[0].value > leds[led_count / 2].value);
        }
    }

    #[test]
    fn test_unmirrored_strip_runs_low_to_high() {
        let frame = ramp_frame(64);
        let synced = SyncedConfig {
            mirror_enabled: false,
            ..Default::default()
        };
        let leds = led_values(&frame, &synced, 64);
        for (i, led) in leds.iter().enumerate() {
            assert_eq!(led.value, frame.brightness[i]);
            assert!((led.hue - (i % 12) as f32 / 12.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_photons_scale_brightness() {
        let frame = ramp_frame(64);
        let synced = SyncedConfig {
            photons: 0.5,
            mirror_enabled: false,
            ..Default::default()
        };
        let leds = led_values(&frame, &synced, 64);
        assert_eq!(leds[63].value, frame.brightness[63] * 0.5);
    }

    #[test]
    fn test_chromagram_mode_uses_twelve_segments() {
        let frame = ramp_frame(64);
        let synced = SyncedConfig {
            lightshow_mode: LightshowMode::Chromagram,
            mirror_enabled: false,
            ..Default::default()
        };
        let leds = led_values(&frame, &synced, 24);
        let peak = frame.normalized_chromagram();
        for (i, led) in leds.iter().enumerate() {
            assert_eq!(led.value, peak[i / 2]);
        }
    }

    #[test]
    fn test_silent_frame_is_dark() {
        let leds = led_values(&SpectralFrame::default(), &SyncedConfig::default(), 10);
        assert!(leds.iter().all(|l| l.value == 0.0));
    }

    #[test]
    fn test_mood_slows_strip() {
        let frame = ramp_frame(64);
        let snappy = SyncedConfig {
            mood: 0.0,
            ..Default::default()
        };
        let dreamy = SyncedConfig {
            mood: 0.9,
            ..Default::default()
        };

        let mut a = LedStrip::new(16);
        let mut b = LedStrip::new(16);
        a.update(&frame, &snappy);
        b.update(&frame, &dreamy);
        assert_eq!(a.leds()[0].value, led_values(&frame, &snappy, 16)[0].value);
        assert!(b.leds()[0].value < a.leds()[0].value);
    }
}
