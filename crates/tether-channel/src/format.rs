//! Message formatting for outbound notifications.
//!
//! Pure functions that render Telegram MarkdownV2 text from explicit fields.
//! Optional fields that are absent are left out of the message entirely.

/// Escape special characters for Telegram MarkdownV2.
///
/// Telegram requires escaping 18 characters: `_*[]()~>#+\-=|{}.!`
pub fn escape_md(s: &str) -> String {
    escape_md_capped(s, usize::MAX)
}

/// Escape text placed inside a MarkdownV2 code block (only `` ` `` and `\`).
pub fn escape_code(s: &str) -> String {
    escape_code_capped(s, usize::MAX)
}

/// [`escape_md`], cut so the escaped text is at most `max` characters.
///
/// A cut never splits an escape sequence and is marked with an ellipsis,
/// which counts toward `max`.
pub fn escape_md_capped(s: &str, max: usize) -> String {
    escape_within(s, max, is_md_special)
}

/// [`escape_code`] with the same cap as [`escape_md_capped`].
pub fn escape_code_capped(s: &str, max: usize) -> String {
    escape_within(s, max, |c| c == '`' || c == '\\')
}

fn is_md_special(c: char) -> bool {
    matches!(
        c,
        '_' | '*'
            | '['
            | ']'
            | '('
            | ')'
            | '~'
            | '`'
            | '>'
            | '#'
            | '+'
            | '-'
            | '='
            | '|'
            | '{'
            | '}'
            | '.'
            | '!'
            | '\\'
    )
}

fn escape_within(s: &str, max: usize, special: impl Fn(char) -> bool) -> String {
    let width = |c: char| -> usize {
        if special(c) {
            2
        } else {
            1
        }
    };
    let full: usize = s.chars().map(width).sum();
    let budget = if full <= max {
        full
    } else {
        max.saturating_sub(1)
    };

    let mut out = String::with_capacity(s.len() + s.len() / 4);
    let mut used = 0;
    for c in s.chars() {
        let w = width(c);
        if used + w > budget {
            break;
        }
        if w == 2 {
            out.push('\\');
        }
        out.push(c);
        used += w;
    }
    if full > max {
        out.push('…');
    }
    out
}

// Escaped lengths. Every message stays below Telegram's 4096-character
// limit with its fixed text included.
const MAX_BODY_CHARS: usize = 3000;
const MAX_CONTEXT_CHARS: usize = 600;
const MAX_ECHO_CHARS: usize = 200;

/// Totals reported when a loop iteration finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub loop_number: u64,
    pub tasks_completed: u64,
    pub files_modified: u64,
    pub summary: Option<String>,
}

impl LoopSummary {
    /// True when the iteration did nothing worth reporting.
    pub fn is_idle(&self) -> bool {
        self.tasks_completed == 0 && self.files_modified == 0
    }
}

/// API usage reported when the host hits its call budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub calls_made: u64,
    pub max_calls: u64,
    pub reset_in_minutes: Option<u64>,
}

fn loop_line(loop_number: Option<u64>) -> String {
    loop_number
        .map(|n| format!("\n*Loop:* \\#{n}"))
        .unwrap_or_default()
}

pub fn format_status(loop_number: Option<u64>, message: &str) -> String {
    format!(
        "*Status Update*{}\n\n{}",
        loop_line(loop_number),
        escape_md_capped(message, MAX_BODY_CHARS)
    )
}

pub fn format_loop_complete(summary: &LoopSummary) -> String {
    let mut text = format!(
        "*Loop \\#{} Complete*\n\n\
         *Tasks completed:* {}\n\
         *Files modified:* {}",
        summary.loop_number, summary.tasks_completed, summary.files_modified,
    );
    if let Some(s) = summary.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!("\n\n{}", escape_md_capped(s.trim(), MAX_BODY_CHARS)));
    }
    text
}

pub fn format_error(loop_number: Option<u64>, error: &str, context: Option<&str>) -> String {
    let mut text = format!(
        "*Error*{}\n\n`{}`",
        loop_line(loop_number),
        escape_code_capped(error, MAX_BODY_CHARS),
    );
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!(
            "\n\n*Context:* {}",
            escape_md_capped(ctx.trim(), MAX_CONTEXT_CHARS)
        ));
    }
    text
}

pub fn format_circuit_change(from: &str, to: &str, reason: Option<&str>) -> String {
    let headline = match to.to_ascii_uppercase().as_str() {
        "OPEN" => "Circuit Breaker OPEN \\- loop halted",
        "HALF_OPEN" => "Circuit Breaker HALF\\_OPEN \\- monitoring",
        "CLOSED" => "Circuit Breaker CLOSED \\- loop resumed",
        _ => "Circuit Breaker Changed",
    };
    let mut text = format!(
        "*{headline}*\n\n*Transition:* `{}` → `{}`",
        escape_code(from),
        escape_code(to),
    );
    if let Some(r) = reason.filter(|r| !r.trim().is_empty()) {
        text.push_str(&format!(
            "\n*Reason:* {}",
            escape_md_capped(r.trim(), MAX_CONTEXT_CHARS)
        ));
    }
    text
}

pub fn format_rate_limit(info: &RateLimitInfo) -> String {
    let mut text = format!(
        "*Rate Limit Reached*\n\n*API calls:* {}/{}",
        info.calls_made, info.max_calls
    );
    if let Some(minutes) = info.reset_in_minutes {
        text.push_str(&format!("\n*Resets in:* {minutes} min"));
    }
    text.push_str("\n\nThe loop is waiting for the next window\\.");
    text
}

pub fn format_question(
    question: &str,
    context: Option<&str>,
    loop_number: Option<u64>,
    timeout_minutes: u64,
) -> String {
    let mut text = format!(
        "*Question from the loop*{}\n\n{}",
        loop_line(loop_number),
        escape_md_capped(question.trim(), MAX_BODY_CHARS),
    );
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!(
            "\n\n*Context:* {}",
            escape_md_capped(ctx.trim(), MAX_CONTEXT_CHARS)
        ));
    }
    text.push_str(&format!(
        "\n\nReply with your answer, or /skip to let the loop decide\\.\n\
         _Waiting up to {timeout_minutes} min\\._"
    ));
    text
}

pub fn format_startup(project: Option<&str>, max_calls: Option<u64>) -> String {
    let mut text = String::from("*Loop Started*");
    if let Some(p) = project.filter(|p| !p.trim().is_empty()) {
        text.push_str(&format!("\n\n*Project:* `{}`", escape_code(p.trim())));
    }
    if let Some(max) = max_calls {
        text.push_str(&format!("\n*Call budget:* {max}/hour"));
    }
    text.push_str("\n\nSend /help for remote commands\\.");
    text
}

pub fn format_shutdown(reason: Option<&str>, total_loops: Option<u64>) -> String {
    let mut text = String::from("*Loop Stopped*");
    if let Some(r) = reason.filter(|r| !r.trim().is_empty()) {
        text.push_str(&format!(
            "\n\n*Reason:* {}",
            escape_md_capped(r.trim(), MAX_CONTEXT_CHARS)
        ));
    }
    if let Some(n) = total_loops {
        text.push_str(&format!("\n*Loops run:* {n}"));
    }
    text
}

pub fn answer_received(answer: &str) -> String {
    format!(
        "*Answer received*\n\n_{}_\n\nThe loop will pick it up on its next iteration\\.",
        escape_md_capped(answer, MAX_ECHO_CHARS)
    )
}

pub fn skip_acknowledged() -> String {
    "*Question skipped*\n\nThe loop continues on its own judgement\\.".to_string()
}

pub fn reply_timed_out(timeout_minutes: u64) -> String {
    format!(
        "*No answer after {timeout_minutes} min*\n\nContinuing without input\\. \
         The question can be answered next time it comes up\\."
    )
}

pub fn no_pending_question() -> String {
    "No question is waiting for an answer\\. Send /help for commands\\.".to_string()
}
