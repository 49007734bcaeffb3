use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub type SourceId = String;

/// Severity of a log record as published on the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    /// Anything else; displayed verbatim, never matched by a level filter
    Unknown,
}

impl LogLevel {
    /// Levels selectable with the 1..5 shortcuts, in key order
    pub const KNOWN: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "CRITICAL" => Self::Critical,
            _ => Self::Unknown,
        }
    }

    /// Short marker shown in front of the message
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Debug => "[D]",
            Self::Info => "[I]",
            Self::Warning => "[W]",
            Self::Error => "[E]",
            Self::Critical => "[!]",
            Self::Unknown => "[?]",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Display color assigned to a source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceColor {
    Cyan,
    Yellow,
    Magenta,
    Green,
    Blue,
    Red,
    #[default]
    White,
    Gray,
}

/// A monitored channel on the bus
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSource {
    pub id: SourceId,
    #[serde(default)]
    pub color: SourceColor,
    /// Hotkey selecting this source as the filter
    #[serde(default)]
    pub key: Option<char>,
}

impl LogSource {
    pub fn new(id: impl Into<String>, color: SourceColor) -> Self {
        Self {
            id: id.into(),
            color,
            key: None,
        }
    }

    pub fn with_key(mut self, key: char) -> Self {
        self.key = Some(key);
        self
    }

    /// Bus channel carrying this source's records
    pub fn channel(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.id)
    }
}

/// One decoded log event. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Raw `YYYY-MM-DD HH:MM:SS,mmm` text, empty when absent
    pub timestamp: String,
    pub level: LogLevel,
    /// Level exactly as received, kept for unknown levels
    pub level_text: String,
    pub component: SourceId,
    pub logger: String,
    pub message: String,
}

impl LogRecord {
    pub fn new(
        component: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: String::new(),
            level,
            level_text: level.to_string(),
            component: component.into(),
            logger: String::new(),
            message: message.into(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = logger.into();
        self
    }

    /// Time-of-day part of the timestamp (`HH:MM:SS,mmm`)
    pub fn time_part(&self) -> &str {
        match self.timestamp.rsplit_once(' ') {
            Some((_, time)) => time,
            None => &self.timestamp,
        }
    }

    /// Single-line plain text form used for export
    pub fn plain_text(&self) -> String {
        let mut out = format!("[{}]", self.component);
        if !self.timestamp.is_empty() {
            out.push(' ');
            out.push_str(&self.timestamp);
        }
        out.push(' ');
        out.push_str(&self.level_text);
        if !self.logger.is_empty() {
            out.push(' ');
            out.push_str(&self.logger);
            out.push(':');
        }
        out.push(' ');
        out.push_str(self.message.trim_end_matches('\n'));
        out
    }
}

/// Subscriber connection lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Stopped,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Stopped => "STOPPED",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Connected => 1,
            Self::Disconnected => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Connected,
            2 => Self::Disconnected,
            _ => Self::Stopped,
        }
    }
}

/// Connection state shared between the subscriber and the UI.
///
/// Advisory only: the UI reads it for the status line and nothing
/// else depends on it for correctness.
#[derive(Debug)]
pub struct ConnectionStatus {
    state: AtomicU8,
    attempts: AtomicU64,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting.to_u8()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    /// Number of subscribe attempts made so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub(crate) fn record_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}
