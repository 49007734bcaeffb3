use crate::model::{LogLevel, LogRecord, SourceId};

/// Active view filter. Level and source selections are mutually exclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Level(LogLevel),
    Source(SourceId),
}

impl Filter {
    pub fn matches(&self, record: &LogRecord) -> bool {
        match self {
            Self::All => true,
            Self::Level(LogLevel::Unknown) => false,
            Self::Level(level) => record.level == *level,
            Self::Source(id) => record.component.eq_ignore_ascii_case(id),
        }
    }

    pub fn level(&self) -> Option<LogLevel> {
        match self {
            Self::Level(level) => Some(*level),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Source(id) => Some(id),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "None".to_string(),
            Self::Level(level) => format!("Level: {}", level),
            Self::Source(id) => format!("Source: {}", id),
        }
    }
}
