//! Values replicated between units and the flags the peer link hands the engine

use abi_stable::StableAbi;
use serde::{Deserialize, Serialize};

/// How the renderer lays the spectrum out on the strip
#[repr(u8)]
#[derive(StableAbi, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LightshowMode {
    /// One LED segment per analyzed note
    #[default]
    Gdft,
    /// Twelve segments, one per pitch class
    Chromagram,
}

impl LightshowMode {
    pub fn next(self) -> Self {
        match self {
            LightshowMode::Gdft => LightshowMode::Chromagram,
            LightshowMode::Chromagram => LightshowMode::Gdft,
        }
    }
}

/// Configuration subset mirrored to every unit on the link.
///
/// Everything else stays private to the unit that owns it.
#[repr(C)]
#[derive(StableAbi, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SyncedConfig {
    /// Master brightness (0-1)
    pub photons: f32,
    /// Hue spread across the strip; 0 colors by pitch class instead
    pub chroma: f32,
    /// Renderer smoothing hint (0 = snappy, 1 = dreamy)
    pub mood: f32,
    /// Hue offset (0-1)
    pub base_hue: f32,
    pub lightshow_mode: LightshowMode,
    /// Draw the strip symmetric around its center
    pub mirror_enabled: bool,
}

impl Default for SyncedConfig {
    fn default() -> Self {
        Self {
            photons: 1.0,
            chroma: 0.0,
            mood: 0.05,
            base_hue: 0.0,
            lightshow_mode: LightshowMode::Gdft,
            mirror_enabled: true,
        }
    }
}

/// Peer-link state consulted when choosing which frame drives the renderer
#[repr(C)]
#[derive(StableAbi, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerFlags {
    /// This unit is the authoritative one on the link
    pub is_main_unit: bool,
    /// The main unit is currently overriding its followers
    pub main_override: bool,
}

impl PeerFlags {
    /// Whether a mirrored frame from the main unit should replace local output
    pub fn follows_main(&self) -> bool {
        !self.is_main_unit && self.main_override
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_unit_never_follows() {
        let flags = PeerFlags {
            is_main_unit: true,
            main_override: true,
        };
        assert!(!flags.follows_main());
    }

    #[test]
    fn test_follower_tracks_override() {
        let mut flags = PeerFlags::default();
        assert!(!flags.follows_main());
        flags.main_override = true;
        assert!(flags.follows_main());
    }

    #[test]
    fn test_mode_cycles() {
        let mode = LightshowMode::default();
        assert_eq!(mode.next().next(), mode);
        assert_ne!(mode.next(), mode);
    }
}
