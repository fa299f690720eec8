mod config;

pub use config::{Config, ConfigWatcher, PrivateConfig};
