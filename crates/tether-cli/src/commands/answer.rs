//! `tether answer take|peek|clear` -- the host's side of the pending answer.

use std::process::ExitCode;

use anyhow::Context;

use tether_channel::state::PendingAnswer;
use tether_types::TetherConfig;

use crate::GlobalArgs;

fn slot(global: &GlobalArgs, config: &TetherConfig) -> PendingAnswer {
    PendingAnswer::new(super::state_paths(global, config).pending_answer)
}

/// Print and delete the answer. Exits 1 when there is none.
pub fn take(global: &GlobalArgs, config: &TetherConfig) -> anyhow::Result<ExitCode> {
    let answer = slot(global, config)
        .take()
        .context("failed to read pending answer")?;
    Ok(print_answer(answer))
}

/// Print the answer without consuming it. Exits 1 when there is none.
pub fn peek(global: &GlobalArgs, config: &TetherConfig) -> anyhow::Result<ExitCode> {
    let answer = slot(global, config)
        .peek()
        .context("failed to read pending answer")?;
    Ok(print_answer(answer))
}

pub fn clear(global: &GlobalArgs, config: &TetherConfig) -> anyhow::Result<ExitCode> {
    let removed = slot(global, config)
        .clear()
        .context("failed to clear pending answer")?;
    if removed {
        eprintln!("Pending answer cleared.");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_answer(answer: Option<String>) -> ExitCode {
    match answer {
        Some(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}
