//! CLI command implementations for the `tether` binary.

pub mod answer;
pub mod ask;
pub mod config;
pub mod flags;
pub mod listen;
pub mod notify;
pub mod test;

use anyhow::Context;

use tether_channel::Bridge;
use tether_types::{ConfigLoader, EffectiveConfig, StatePaths, TetherConfig, CONFIG_FILENAME};

use crate::GlobalArgs;

/// Load defaults, the user file, `<dir>/.tether/config.toml` and `TETHER_*`
/// variables, in increasing priority.
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<EffectiveConfig> {
    let mut loader =
        ConfigLoader::new().with_workspace_path(global.dir.join(".tether").join(CONFIG_FILENAME));
    if let Some(user) = &global.config {
        loader = loader.with_user_path(user.clone());
    }
    loader.load().context("failed to load configuration")
}

pub fn state_paths(global: &GlobalArgs, config: &TetherConfig) -> StatePaths {
    StatePaths::resolve(&global.dir, &config.paths)
}

pub fn bridge(global: &GlobalArgs, config: TetherConfig) -> Bridge {
    Bridge::from_config(config, &global.dir)
}

/// Single-threaded runtime for one bridge operation.
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}
