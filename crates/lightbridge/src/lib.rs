//! Audio-reactive lighting engine.
//!
//! Turns a stream of raw audio chunks into a per-note spectrogram, a
//! chromagram and a long-term baseline for an LED renderer, using a bank of
//! Goertzel filters with per-zone automatic gain control.

pub mod audio;
pub mod error;
pub mod peer;
pub mod utils;

pub use audio::{Engine, EngineConfig};
pub use error::{ConfigError, EngineError};
pub use peer::PeerLink;
pub use lightbridge_api::{PeerFlags, SpectralFrame, SyncedConfig, MAX_NOTES, MAX_ZONES, NUM_CHROMA};
