//! Diagnostic logging.
//!
//! stdout belongs to the TUI, so events go to a file and only when one is
//! requested with `--log-file` or `LOGMON_LOG_FILE`. The filter comes from
//! `LOGMON_LOG` (default `info`).

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_FILE_ENV: &str = "LOGMON_LOG_FILE";
pub const LOG_FILTER_ENV: &str = "LOGMON_LOG";

/// Resolve the log destination, flag first
pub fn log_path(flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_FILE_ENV).map(PathBuf::from))
}

/// Install the global subscriber. Returns the file in use, if any.
pub fn init(flag: Option<&Path>) -> io::Result<Option<PathBuf>> {
    let Some(path) = log_path(flag) else {
        return Ok(None);
    };

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_takes_precedence() {
        let path = log_path(Some(Path::new("/tmp/logmon-flag.log")));
        assert_eq!(path, Some(PathBuf::from("/tmp/logmon-flag.log")));
    }
}
