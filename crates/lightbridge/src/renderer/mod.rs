//! Host preview of the lighting output.

mod debug;
mod led_strip;

pub use debug::{DebugInfo, DebugOverlay};
pub use led_strip::LedStrip;

/// Resolution settings for the preview window
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            Self {
                width: 800,
                height: 200,
            }
        } else {
            Self {
                width: 1280,
                height: 240,
            }
        }
    }
}
