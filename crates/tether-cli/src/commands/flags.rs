//! `tether flags show|clear-pause` -- control flags raised by the operator.

use std::process::ExitCode;

use anyhow::Context;

use tether_channel::state::ControlFlags;
use tether_types::TetherConfig;

use crate::GlobalArgs;

fn flags(global: &GlobalArgs, config: &TetherConfig) -> ControlFlags {
    let paths = super::state_paths(global, config);
    ControlFlags::new(paths.pause_flag, paths.stop_flag)
}

/// Print `paused=` and `stop_requested=` lines for shell consumption.
pub fn show(global: &GlobalArgs, config: &TetherConfig) -> anyhow::Result<ExitCode> {
    let flags = flags(global, config);
    println!("paused={}", flags.paused.is_set());
    println!("stop_requested={}", flags.stop.is_set());
    Ok(ExitCode::SUCCESS)
}

/// Called by the host once it has honoured a pause.
pub fn clear_pause(global: &GlobalArgs, config: &TetherConfig) -> anyhow::Result<ExitCode> {
    flags(global, config)
        .paused
        .clear()
        .context("failed to clear pause flag")?;
    Ok(ExitCode::SUCCESS)
}
