//! Core types shared across the tether crates.
//!
//! Defines the configuration model, the hierarchical config loader, the
//! durable file layout and the error type used by the channel and CLI.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod paths;

pub use config::{
    minute_of_day, Credentials, NotifyConfig, PathsConfig, QuietHoursConfig, TelegramConfig,
    TetherConfig, CONFIG_FILENAME,
};
pub use config_loader::{ConfigLoader, ConfigSource, EffectiveConfig};
pub use error::TetherError;
pub use paths::StatePaths;
