//! FFI-safe surface shared by the lightbridge engine, lighting renderers and
//! the peer link.
//!
//! Everything here is `#[repr(C)]` + `StableAbi` so a renderer or a sync
//! transport compiled separately from the engine can consume the same frames.

pub mod frame;
pub mod sync;

pub use frame::{SpectralFrame, MAX_NOTES, NUM_CHROMA};
pub use sync::{LightshowMode, PeerFlags, SyncedConfig};

pub const ABI_VERSION: u32 = 1;

/// Upper bound on independent gain-control zones
pub const MAX_ZONES: usize = 4;
