//! `tether ask` -- ask the operator and print the answer.
//!
//! Exit codes: 0 answered or skipped (skip prints nothing), 2 timed out,
//! 3 not asked (not configured, kind disabled or quiet hours), 130 cancelled
//! with Ctrl-C. Other failures are errors (exit 1).

use std::process::ExitCode;
use std::time::Duration;

use anyhow::bail;
use tokio::sync::watch;
use tracing::{info, warn};

use tether_channel::{AskError, Question, ReplyOutcome};
use tether_types::TetherConfig;

use crate::GlobalArgs;

const EXIT_TIMED_OUT: u8 = 2;
const EXIT_NOT_ASKED: u8 = 3;
const EXIT_CANCELLED: u8 = 130;

/// Run `tether ask QUESTION`.
pub fn run(
    global: &GlobalArgs,
    config: TetherConfig,
    question: String,
    context: Option<String>,
    loop_number: Option<u64>,
    timeout_minutes: Option<u64>,
) -> anyhow::Result<ExitCode> {
    let question = Question {
        text: question,
        context,
        loop_number,
        timeout: timeout_minutes.map(|m| Duration::from_secs(m.saturating_mul(60))),
    };
    let bridge = super::bridge(global, config);
    let rt = super::runtime()?;

    let result = rt.block_on(async {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ask = bridge.ask(&question, Some(cancel_rx));
        tokio::pin!(ask);
        tokio::select! {
            outcome = &mut ask => outcome,
            Ok(()) = tokio::signal::ctrl_c() => {
                let _ = cancel_tx.send(true);
                ask.await
            }
        }
    });

    match result {
        Ok(ReplyOutcome::Answered(answer)) => {
            println!("{answer}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(ReplyOutcome::Skipped) => Ok(ExitCode::SUCCESS),
        Ok(ReplyOutcome::TimedOut) => Ok(ExitCode::from(EXIT_TIMED_OUT)),
        Ok(ReplyOutcome::Suppressed(reason)) => {
            info!(?reason, "question not sent");
            Ok(ExitCode::from(EXIT_NOT_ASKED))
        }
        Ok(ReplyOutcome::Cancelled) => Ok(ExitCode::from(EXIT_CANCELLED)),
        Err(AskError::NotConfigured) => {
            warn!("telegram not configured, question not asked");
            Ok(ExitCode::from(EXIT_NOT_ASKED))
        }
        Err(e @ AskError::EmptyQuestion) => bail!(e),
        Err(AskError::SendFailed(e)) => bail!("could not send the question: {e}"),
    }
}
