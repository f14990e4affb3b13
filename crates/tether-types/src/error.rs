//! Error type shared across the tether crates.

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error("configuration error: {0}")]
    ConfigError(String),
}
