//! `tether commands` -- one command-polling cycle between loop iterations.

use std::process::ExitCode;
use std::time::Duration;

use tracing::{info, warn};

use tether_channel::ChannelError;
use tether_types::TetherConfig;

use crate::GlobalArgs;

/// Run `tether commands [--wait SECS]`.
///
/// Prints the name of each executed command on its own line. Not being
/// configured is not an error.
pub fn run(global: &GlobalArgs, config: TetherConfig, wait: u64) -> anyhow::Result<ExitCode> {
    let bridge = super::bridge(global, config);
    let rt = super::runtime()?;

    match rt.block_on(bridge.listen_once(Duration::from_secs(wait))) {
        Ok(report) => {
            info!(
                updates = report.updates,
                commands = report.commands.len(),
                ignored = report.ignored,
                "command poll finished"
            );
            for command in &report.commands {
                println!("{}", command.name());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(ChannelError::NotConfigured) => {
            warn!("telegram not configured, no commands polled");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(error = %e, "command poll failed");
            Ok(ExitCode::SUCCESS)
        }
    }
}
