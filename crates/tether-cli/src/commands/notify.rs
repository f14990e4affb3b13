//! `tether notify <kind>` -- one-shot notifications from the host loop.
//!
//! Delivery problems are logged and the command still exits 0, so a dead
//! channel never breaks the loop. `--strict` turns them into exit code 1.

use std::process::ExitCode;

use clap::Subcommand;
use tracing::warn;

use tether_channel::format::{LoopSummary, RateLimitInfo};
use tether_channel::{ChannelError, Delivery, Notifier};
use tether_types::TetherConfig;

use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum NotifyKindArgs {
    /// Free-form status update
    Status {
        message: String,
        #[arg(long = "loop")]
        loop_number: Option<u64>,
    },

    /// Loop iteration finished (skipped when nothing was done)
    LoopComplete {
        #[arg(long = "loop")]
        loop_number: u64,
        #[arg(long, default_value_t = 0)]
        tasks: u64,
        #[arg(long, default_value_t = 0)]
        files: u64,
        #[arg(long)]
        summary: Option<String>,
    },

    /// An error in the loop
    Error {
        message: String,
        #[arg(long = "loop")]
        loop_number: Option<u64>,
        #[arg(long)]
        context: Option<String>,
    },

    /// Circuit breaker changed state
    Circuit {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// API call budget exhausted
    RateLimit {
        #[arg(long)]
        calls: u64,
        #[arg(long)]
        max: u64,
        #[arg(long)]
        reset_in_minutes: Option<u64>,
    },

    /// The loop started
    Startup {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        max_calls: Option<u64>,
    },

    /// The loop stopped
    Shutdown {
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        loops: Option<u64>,
    },
}

impl NotifyKindArgs {
    fn label(&self) -> &'static str {
        match self {
            NotifyKindArgs::Status { .. } => "status",
            NotifyKindArgs::LoopComplete { .. } => "loop_complete",
            NotifyKindArgs::Error { .. } => "error",
            NotifyKindArgs::Circuit { .. } => "circuit_breaker",
            NotifyKindArgs::RateLimit { .. } => "rate_limit",
            NotifyKindArgs::Startup { .. } => "startup",
            NotifyKindArgs::Shutdown { .. } => "shutdown",
        }
    }
}

/// Run `tether notify <kind>`.
pub fn run(
    global: &GlobalArgs,
    config: TetherConfig,
    kind: NotifyKindArgs,
    strict: bool,
) -> anyhow::Result<ExitCode> {
    let bridge = super::bridge(global, config);
    let label = kind.label();
    let rt = super::runtime()?;
    let result = rt.block_on(send(bridge.notifier(), kind));

    match result {
        Ok(Delivery::Sent) => Ok(ExitCode::SUCCESS),
        Ok(Delivery::Suppressed(reason)) => {
            tracing::info!(kind = label, ?reason, "notification suppressed");
            Ok(ExitCode::SUCCESS)
        }
        Err(ChannelError::NotConfigured) => {
            warn!(kind = label, "telegram not configured, notification skipped");
            Ok(exit_for(strict))
        }
        Err(e) => {
            warn!(kind = label, error = %e, "notification not delivered");
            Ok(exit_for(strict))
        }
    }
}

fn exit_for(strict: bool) -> ExitCode {
    if strict {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn send(notifier: &Notifier, kind: NotifyKindArgs) -> Result<Delivery, ChannelError> {
    match kind {
        NotifyKindArgs::Status {
            message,
            loop_number,
        } => notifier.send_status(loop_number, &message).await,
        NotifyKindArgs::LoopComplete {
            loop_number,
            tasks,
            files,
            summary,
        } => {
            notifier
                .send_loop_complete(&LoopSummary {
                    loop_number,
                    tasks_completed: tasks,
                    files_modified: files,
                    summary,
                })
                .await
        }
        NotifyKindArgs::Error {
            message,
            loop_number,
            context,
        } => {
            notifier
                .send_error(loop_number, &message, context.as_deref())
                .await
        }
        NotifyKindArgs::Circuit { from, to, reason } => {
            notifier
                .send_circuit_change(&from, &to, reason.as_deref())
                .await
        }
        NotifyKindArgs::RateLimit {
            calls,
            max,
            reset_in_minutes,
        } => {
            notifier
                .send_rate_limit(&RateLimitInfo {
                    calls_made: calls,
                    max_calls: max,
                    reset_in_minutes,
                })
                .await
        }
        NotifyKindArgs::Startup { project, max_calls } => {
            notifier.send_startup(project.as_deref(), max_calls).await
        }
        NotifyKindArgs::Shutdown { reason, loops } => {
            notifier.send_shutdown(reason.as_deref(), loops).await
        }
    }
}
