//! Wire payload decoding.
//!
//! Each bus message carries one JSON object:
//! `{"timestamp", "level", "component", "logger", "message"}`.
//! Only `component` is mandatory; a missing level reads as INFO and the
//! remaining fields default to empty strings.

use serde::Deserialize;

use crate::model::{LogLevel, LogRecord};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireRecord {
    timestamp: Option<String>,
    level: Option<String>,
    component: Option<String>,
    logger: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    MissingComponent,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid payload: {}", e),
            Self::MissingComponent => write!(f, "payload has no component"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e)
    }
}

pub fn decode_record(payload: &str) -> Result<LogRecord, DecodeError> {
    let wire: WireRecord = serde_json::from_str(payload)?;

    let component = match wire.component {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(DecodeError::MissingComponent),
    };

    let level_text = wire.level.unwrap_or_else(|| "INFO".to_string());

    Ok(LogRecord {
        timestamp: wire.timestamp.unwrap_or_default(),
        level: LogLevel::parse(&level_text),
        level_text,
        component,
        logger: wire.logger.unwrap_or_default(),
        message: wire.message.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_payload() {
        let payload = r#"{
            "timestamp": "2024-05-01 12:30:45,123",
            "level": "ERROR",
            "component": "backend",
            "logger": "api.routes",
            "message": "upstream refused"
        }"#;
        let rec = decode_record(payload).unwrap();
        assert_eq!(rec.component, "backend");
        assert_eq!(rec.level, LogLevel::Error);
        assert_eq!(rec.logger, "api.routes");
        assert_eq!(rec.message, "upstream refused");
        assert_eq!(rec.time_part(), "12:30:45,123");
    }

    #[test]
    fn test_optional_fields_default() {
        let rec = decode_record(r#"{"component": "batch", "message": "tick"}"#).unwrap();
        assert_eq!(rec.timestamp, "");
        assert_eq!(rec.logger, "");
        assert_eq!(rec.level, LogLevel::Info);
        assert_eq!(rec.level_text, "INFO");
    }

    #[test]
    fn test_unknown_level_passes_through() {
        let rec = decode_record(r#"{"component": "ray", "level": "notice", "message": "x"}"#)
            .unwrap();
        assert_eq!(rec.level, LogLevel::Unknown);
        assert_eq!(rec.level_text, "notice");
    }

    #[test]
    fn test_missing_component_is_rejected() {
        let err = decode_record(r#"{"level": "INFO", "message": "orphan"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingComponent));

        let err = decode_record(r#"{"component": "  ", "message": "blank"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingComponent));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert!(matches!(decode_record("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_record("[1, 2]"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_record(r#"{"component": 7, "message": "x"}"#),
            Err(DecodeError::Json(_))
        ));
    }
}
