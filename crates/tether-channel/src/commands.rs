//! Operator commands received over the chat.
//!
//! Parsing is pure; [`CommandDispatcher::execute`] performs the command's
//! side effect on the flag files or circuit-breaker record and returns the
//! MarkdownV2 reply. Handlers never fail: I/O problems become an error reply.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};

use tether_types::StatePaths;

use crate::format::{escape_code, escape_md};
use crate::state::{read_session_id, tail_log, CircuitRecord, ControlFlags, HostStatus};

/// Lines returned by `/logs` without an argument.
pub const DEFAULT_LOG_LINES: usize = 10;
/// Upper bound for `/logs N`.
pub const MAX_LOG_LINES: usize = 20;
/// Byte ceiling for the log excerpt, well under Telegram's message limit.
pub const MAX_LOG_BYTES: usize = 3000;

/// A recognized (or unrecognized) slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Pause,
    Resume,
    Reset,
    Stop,
    Logs { lines: usize },
    Skip,
    /// The command token as received, lower-cased.
    Unknown(String),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::Help => "/help",
            Command::Status => "/status",
            Command::Pause => "/pause",
            Command::Resume => "/resume",
            Command::Reset => "/reset",
            Command::Stop => "/stop",
            Command::Logs { .. } => "/logs",
            Command::Skip => "/skip",
            Command::Unknown(token) => token,
        }
    }
}

/// True when `text` begins with `/`.
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Parse a slash command. Returns `None` for free text.
///
/// `/status@my_bot` is treated as `/status`; the token is case-folded and
/// everything after it is the argument string.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    if !is_command(text) {
        return None;
    }
    let (token, rest) = match text.split_once(char::is_whitespace) {
        Some((t, r)) => (t, r.trim()),
        None => (text, ""),
    };
    let token = token.split('@').next().unwrap_or(token).to_lowercase();

    let command = match token.as_str() {
        "/help" | "/start" => Command::Help,
        "/status" => Command::Status,
        "/pause" => Command::Pause,
        "/resume" => Command::Resume,
        "/reset" => Command::Reset,
        "/stop" => Command::Stop,
        "/logs" => Command::Logs {
            lines: parse_log_count(rest),
        },
        "/skip" => Command::Skip,
        _ => Command::Unknown(token),
    };
    Some(command)
}

/// `/logs` argument: default when absent or non-numeric, clamped to
/// `1..=MAX_LOG_LINES`.
pub fn parse_log_count(args: &str) -> usize {
    match args.split_whitespace().next().map(str::parse::<i64>) {
        Some(Ok(n)) => n.clamp(1, MAX_LOG_LINES as i64) as usize,
        _ => DEFAULT_LOG_LINES,
    }
}

pub fn help_text() -> String {
    [
        "*Remote commands*\n",
        "/status \\- Loop status, circuit breaker and flags",
        "/pause \\- Hold the loop before its next iteration",
        "/resume \\- Let a paused loop continue",
        "/reset \\- Close an open circuit breaker",
        "/stop \\- Stop the loop \\(cannot be undone remotely\\)",
        "/logs \\[N\\] \\- Last N log lines \\(default 10, max 20\\)",
        "/skip \\- Skip the question the loop is waiting on",
        "/help \\- Show this message",
    ]
    .join("\n")
}

/// Result of offering inbound text to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The text was a command; `reply` is ready to send.
    Handled { command: Command, reply: String },
    NotCommand,
}

/// Runs operator commands against the host's files.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    flags: ControlFlags,
    status: PathBuf,
    circuit_breaker: PathBuf,
    session: PathBuf,
    log: PathBuf,
}

impl CommandDispatcher {
    pub fn new(paths: &StatePaths) -> Self {
        Self {
            flags: ControlFlags::new(&paths.pause_flag, &paths.stop_flag),
            status: paths.status.clone(),
            circuit_breaker: paths.circuit_breaker.clone(),
            session: paths.session.clone(),
            log: paths.log.clone(),
        }
    }

    pub fn flags(&self) -> &ControlFlags {
        &self.flags
    }

    /// Parse and execute `text` if it is a command.
    pub fn dispatch(&self, text: &str) -> DispatchOutcome {
        match parse(text) {
            Some(command) => {
                let reply = self.execute(&command);
                DispatchOutcome::Handled { command, reply }
            }
            None => DispatchOutcome::NotCommand,
        }
    }

    /// Perform the command and return the reply text.
    pub fn execute(&self, command: &Command) -> String {
        info!(command = command.name(), "executing operator command");
        match command {
            Command::Help => help_text(),
            Command::Status => self.status_report(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Reset => self.reset(),
            Command::Stop => self.stop(),
            Command::Logs { lines } => self.logs(*lines),
            Command::Skip => {
                "No question is waiting\\. /skip only applies while the loop is asking\\."
                    .to_string()
            }
            Command::Unknown(token) => format!(
                "Unknown command `{}`\\. Send /help for the list\\.",
                escape_code(token)
            ),
        }
    }

    fn pause(&self) -> String {
        match self.flags.paused.set() {
            Ok(true) => "*Loop paused*\n\nThe loop will hold before its next iteration\\. \
                         Send /resume to continue\\."
                .to_string(),
            Ok(false) => "The loop is already paused\\.".to_string(),
            Err(e) => error_reply("Could not pause the loop", &e),
        }
    }

    fn resume(&self) -> String {
        match self.flags.paused.clear() {
            Ok(true) => "*Loop resumed*".to_string(),
            Ok(false) => "The loop is not paused\\.".to_string(),
            Err(e) => error_reply("Could not resume the loop", &e),
        }
    }

    fn stop(&self) -> String {
        match self.flags.stop.set() {
            Ok(true) => "*Stop requested*\n\nThe loop will stop after its current iteration\\. \
                         This cannot be undone remotely\\."
                .to_string(),
            Ok(false) => "Stop was already requested\\.".to_string(),
            Err(e) => error_reply("Could not request a stop", &e),
        }
    }

    fn reset(&self) -> String {
        let mut record = match CircuitRecord::load(&self.circuit_breaker) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return "No circuit breaker record found\\. Nothing to reset\\.".to_string();
            }
            Err(e) => return error_reply("Could not read the circuit breaker", &e),
        };
        if record.is_closed() {
            return "The circuit breaker is already `CLOSED`\\.".to_string();
        }
        let previous = record.state.to_string();
        record.reset(Utc::now());
        if let Err(e) = record.save(&self.circuit_breaker) {
            return error_reply("Could not write the circuit breaker", &e);
        }
        info!(from = %previous, "circuit breaker reset by operator");
        format!(
            "*Circuit breaker reset*\n\n`{}` → `CLOSED`\nProgress counters cleared\\.",
            escape_code(&previous)
        )
    }

    fn logs(&self, lines: usize) -> String {
        match tail_log(&self.log, lines, MAX_LOG_BYTES) {
            Ok(Some(tail)) if tail.trim().is_empty() => "The log is empty\\.".to_string(),
            Ok(Some(tail)) => format!(
                "*Last {lines} log lines*\n```\n{}\n```",
                escape_code(&tail)
            ),
            Ok(None) => "No log file yet\\.".to_string(),
            Err(e) => error_reply("Could not read the log", &e),
        }
    }

    /// Each section reads its own source and degrades on its own.
    fn status_report(&self) -> String {
        let mut sections = vec!["*Loop status*".to_string()];

        let host = match HostStatus::load(&self.status) {
            Ok(Some(status)) => {
                let mut lines = Vec::new();
                if let Some(n) = status.r#loop {
                    lines.push(format!("Loop: #{n}"));
                }
                if let Some(state) = &status.state {
                    lines.push(format!("State: {state}"));
                }
                match (status.calls_made, status.max_calls_per_hour) {
                    (Some(made), Some(max)) => lines.push(format!("API calls: {made}/{max}")),
                    (Some(made), None) => lines.push(format!("API calls: {made}")),
                    _ => {}
                }
                if let Some(action) = &status.last_action {
                    lines.push(format!("Last action: {action}"));
                }
                if let Some(ts) = &status.timestamp {
                    lines.push(format!("Updated: {ts}"));
                }
                if lines.is_empty() {
                    lines.push("Status file has no fields".to_string());
                }
                lines
            }
            Ok(None) => vec!["No status reported yet".to_string()],
            Err(e) => {
                warn!(error = %e, "unreadable host status");
                vec![format!("Unreadable: {e}")]
            }
        };
        sections.push(section("Host", &host));

        let circuit = match CircuitRecord::load(&self.circuit_breaker) {
            Ok(Some(record)) => {
                let mut lines = vec![format!("State: {}", record.state)];
                if let Some(reason) = record.reason.as_deref().filter(|r| !r.is_empty()) {
                    lines.push(format!("Reason: {reason}"));
                }
                lines
            }
            Ok(None) => vec!["No record".to_string()],
            Err(e) => {
                warn!(error = %e, "unreadable circuit breaker record");
                vec![format!("Unreadable: {e}")]
            }
        };
        sections.push(section("Circuit breaker", &circuit));

        let control = vec![
            format!("Paused: {}", yes_no(self.flags.paused.is_set())),
            format!("Stop requested: {}", yes_no(self.flags.stop.is_set())),
        ];
        sections.push(section("Control", &control));

        let session = match read_session_id(&self.session) {
            Ok(Some(id)) => id,
            Ok(None) => "none".to_string(),
            Err(e) => format!("unreadable: {e}"),
        };
        sections.push(section("Session", &[session]));

        sections.join("\n\n")
    }
}

fn section(title: &str, lines: &[String]) -> String {
    let body: Vec<String> = lines.iter().map(|l| escape_md(l)).collect();
    format!("*{title}*\n{}", body.join("\n"))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn error_reply(what: &str, err: &dyn std::fmt::Display) -> String {
    warn!(error = %err, "{what}");
    format!("*Error*\n\n{}: {}", escape_md(what), escape_md(&err.to_string()))
}
