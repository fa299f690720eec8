//! Debug overlay: frame rate, capture health and calibration status.

use nannou::prelude::*;
use std::time::Instant;

use lightbridge::audio::{CalibrationState, FrameStats};

/// Everything the overlay prints, gathered once per update
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    pub device: Option<String>,
    pub stats: FrameStats,
    pub overruns: u64,
    pub clipped: u64,
    pub calibration: Option<CalibrationState>,
    pub calibration_progress: f32,
    pub calibrated: bool,
    pub zone_followers: Vec<f32>,
    pub following_main: bool,
}

pub struct DebugOverlay {
    pub visible: bool,
    last_frame_time: Instant,
    /// Smoothed FPS display value
    display_fps: f32,
    info: DebugInfo,
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self {
            visible: false,
            last_frame_time: Instant::now(),
            display_fps: 0.0,
            info: DebugInfo::default(),
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn update(&mut self, info: DebugInfo) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f32();
        let current_fps = if delta > 0.0 { 1.0 / delta } else { 0.0 };
        self.display_fps = self.display_fps * 0.9 + current_fps * 0.1;
        self.last_frame_time = now;
        self.info = info;
    }

    fn lines(&self) -> Vec<String> {
        let info = &self.info;
        let calibration = match info.calibration {
            Some(CalibrationState::Calibrating { .. }) => {
                format!("calibrating {:.0}%", info.calibration_progress * 100.0)
            }
            _ if info.calibrated => "calibrated".to_string(),
            _ => "uncalibrated".to_string(),
        };
        let zones = info
            .zone_followers
            .iter()
            .map(|f| format!("{:.0}", f))
            .collect::<Vec<_>>()
            .join(" / ");

        vec![
            format!("{:.0} fps", self.display_fps),
            format!("device: {}", info.device.as_deref().unwrap_or("none")),
            format!(
                "chunks: {} processed, {} skipped, {} overrun",
                info.stats.processed, info.stats.skipped, info.overruns
            ),
            format!("clipped samples: {}", info.clipped),
            format!("noise floor: {}", calibration),
            format!("zone gain: {}", zones),
            format!("source: {}", if info.following_main { "main unit" } else { "local" }),
        ]
    }

    pub fn draw(&self, draw: &Draw, bounds: Rect) {
        if !self.visible {
            return;
        }

        let line_height = 16.0;
        let lines = self.lines();
        let height = line_height * lines.len() as f32 + 10.0;
        let width = 360.0;
        let left = bounds.left() + 10.0;
        let top = bounds.top() - 10.0;

        draw.rect()
            .x_y(left + width / 2.0, top - height / 2.0)
            .w_h(width, height)
            .color(rgba(0.0, 0.0, 0.0, 0.7));

        for (i, line) in lines.iter().enumerate() {
            draw.text(line)
                .x_y(left + width / 2.0 + 5.0, top - 5.0 - line_height * (i as f32 + 0.5))
                .w_h(width, line_height)
                .left_justify()
                .font_size(12)
                .color(WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_line() {
        let mut overlay = DebugOverlay::new();
        overlay.update(DebugInfo {
            calibration: Some(CalibrationState::Calibrating { iterations: 64 }),
            calibration_progress: 0.25,
            ..Default::default()
        });
        assert!(overlay.lines().iter().any(|l| l == "noise floor: calibrating 25%"));

        overlay.update(DebugInfo {
            calibration: Some(CalibrationState::Idle),
            calibrated: true,
            zone_followers: vec![750.0, 1200.4],
            ..Default::default()
        });
        let lines = overlay.lines();
        assert!(lines.iter().any(|l| l == "noise floor: calibrated"));
        assert!(lines.iter().any(|l| l == "zone gain: 750 / 1200"));
    }
}
