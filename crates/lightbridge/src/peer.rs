//! Follower-side state of the peer link.
//!
//! The transport lives outside this crate. Whatever carries frames between
//! units calls [`PeerLink::receive`] with the main unit's latest frame and
//! override flag, and [`PeerLink::disconnect`] when the main unit goes away.

use lightbridge_api::{PeerFlags, SpectralFrame};

#[derive(Debug, Clone, Default)]
pub struct PeerLink {
    flags: PeerFlags,
    /// Latest frame received from the main unit
    mirrored: Option<SpectralFrame>,
}

impl PeerLink {
    pub fn new(is_main_unit: bool) -> Self {
        Self {
            flags: PeerFlags {
                is_main_unit,
                main_override: false,
            },
            mirrored: None,
        }
    }

    pub fn set_main_unit(&mut self, is_main_unit: bool) {
        if self.flags.is_main_unit != is_main_unit {
            log::info!(
                "Peer role: {}",
                if is_main_unit { "main" } else { "follower" }
            );
        }
        self.flags.is_main_unit = is_main_unit;
    }

    /// Stores what the main unit last sent
    pub fn receive(&mut self, frame: SpectralFrame, main_override: bool) {
        if self.flags.main_override != main_override {
            log::debug!("Main override {}", if main_override { "on" } else { "off" });
        }
        self.flags.main_override = main_override;
        self.mirrored = Some(frame);
    }

    /// Drops the mirrored frame and any override
    pub fn disconnect(&mut self) {
        if self.mirrored.take().is_some() {
            log::info!("Lost the main unit, rendering local frames");
        }
        self.flags.main_override = false;
    }

    pub fn flags(&self) -> PeerFlags {
        self.flags
    }

    pub fn mirrored(&self) -> Option<&SpectralFrame> {
        self.mirrored.as_ref()
    }

    /// A mirrored frame is currently replacing local output
    pub fn following_main(&self) -> bool {
        self.flags.follows_main() && self.mirrored.is_some()
    }
}
