//! Turns records and view state into renderer-neutral text.

use crate::buffer::SourceTally;
use crate::model::{ConnectionState, LogLevel, LogRecord, LogSource, SourceColor, SourceId};
use crate::view::ViewEngine;

const LOGGER_WIDTH: usize = 15;
const MAX_MESSAGE_CHARS: usize = 2_000;

/// Color role of a segment; the renderer maps it to a concrete style
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Source(SourceColor),
    /// Component that matches no configured source
    UnknownSource,
    Timestamp,
    Level(LogLevel),
    Logger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub tone: Tone,
}

impl Segment {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// One rendered log line as ordered (text, tone) pairs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayLine {
    pub segments: Vec<Segment>,
}

impl DisplayLine {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Three-letter tag such as `[BAC]` for `backend`
pub fn source_tag(component: &str) -> String {
    let short: String = component.chars().take(3).collect::<String>().to_uppercase();
    format!("[{}]", short)
}

pub fn format_record(record: &LogRecord, sources: &[LogSource]) -> DisplayLine {
    let source_tone = sources
        .iter()
        .find(|s| s.id.eq_ignore_ascii_case(&record.component))
        .map(|s| Tone::Source(s.color))
        .unwrap_or(Tone::UnknownSource);

    let mut segments = vec![Segment::new(
        format!("{} ", source_tag(&record.component)),
        source_tone,
    )];

    if !record.timestamp.is_empty() {
        segments.push(Segment::new(
            format!("{} ", record.time_part()),
            Tone::Timestamp,
        ));
    }

    segments.push(Segment::new(
        format!("{} ", record.level.marker()),
        Tone::Level(record.level),
    ));

    if !record.logger.is_empty() {
        segments.push(Segment::new(
            format!("{}: ", tail_chars(&record.logger, LOGGER_WIDTH)),
            Tone::Logger,
        ));
    }

    segments.push(Segment::new(
        message_line(&record.message),
        Tone::Level(record.level),
    ));

    DisplayLine { segments }
}

/// Last `n` characters of `text`
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    let skip = count - n;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Collapse a possibly multi-line message into one display line
fn message_line(message: &str) -> String {
    let trimmed = message.trim_end_matches(['\n', '\r']);
    let mut out: String = trimmed
        .chars()
        .take(MAX_MESSAGE_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        out.push_str("...");
    }
    out
}

/// Status shown above the log body. `attempts` is the subscriber's count of
/// connection attempts, shown while it is retrying.
pub fn status_line(connection: ConnectionState, attempts: u64, view: &ViewEngine) -> String {
    let mut line = match connection {
        ConnectionState::Disconnected => format!(
            "{} (retrying, attempt {}) - [X] Reconnect",
            connection.label(),
            attempts
        ),
        ConnectionState::Connecting | ConnectionState::Stopped => connection.label().to_string(),
        ConnectionState::Connected if view.is_paused() => "PAUSED".to_string(),
        ConnectionState::Connected if !view.is_following() => {
            "VIEW FROZEN (buffering) - Press End for latest".to_string()
        }
        ConnectionState::Connected => "LIVE".to_string(),
    };

    if connection != ConnectionState::Connected && view.is_paused() {
        line.push_str(" | PAUSED");
    }
    line.push_str(" | Filters: ");
    line.push_str(&view.filter().label());
    line
}

/// `backend: 12 (3 err) | batch: 4`
pub fn stats_line(tallies: &[(SourceId, SourceTally)]) -> String {
    if tallies.is_empty() {
        return "No logs yet".to_string();
    }
    tallies
        .iter()
        .map(|(id, t)| {
            if t.errors > 0 {
                format!("{}: {} ({} err)", id, t.total, t.errors)
            } else {
                format!("{}: {}", id, t.total)
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
