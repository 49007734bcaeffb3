use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{LogSource, SourceColor};
use crate::subscriber::{DEFAULT_CHANNEL_PREFIX, SubscriberSettings};

/// File names looked up in every directory during discovery
pub const CONFIG_FILE_NAMES: [&str; 4] = ["logmon.yml", "logmon.yaml", ".logmon.yml", ".logmon.yaml"];

/// Keys bound to built-in actions; source hotkeys may not use them in
/// either case, since letter keys are matched case-insensitively
pub const RESERVED_KEYS: [char; 14] = [
    'q', 'p', 'c', 'g', 'l', 'y', 'x', 'a', '0', '1', '2', '3', '4', '5',
];

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    /// Buffer capacity; oldest records are evicted beyond this
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Redraw interval of the viewer
    #[serde(default = "default_refresh_rate_ms")]
    pub refresh_rate_ms: u64,

    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Drop a connection that stays silent this long
    #[serde(default)]
    pub receive_timeout_ms: Option<u64>,

    #[serde(default = "default_sources")]
    pub sources: Vec<LogSource>,
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".into()
}
fn default_channel_prefix() -> String {
    DEFAULT_CHANNEL_PREFIX.into()
}
fn default_max_lines() -> usize {
    1000
}
fn default_refresh_rate_ms() -> u64 {
    200
}
fn default_reconnect_interval_ms() -> u64 {
    5000
}

pub fn default_sources() -> Vec<LogSource> {
    vec![
        LogSource::new("backend", SourceColor::Cyan).with_key('b'),
        LogSource::new("batch", SourceColor::Yellow).with_key('w'),
        LogSource::new("ray", SourceColor::Magenta).with_key('r'),
    ]
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            channel_prefix: default_channel_prefix(),
            max_lines: default_max_lines(),
            refresh_rate_ms: default_refresh_rate_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            receive_timeout_ms: None,
            sources: default_sources(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    NoSources,
    EmptySourceId,
    DuplicateSource { id: String },
    DuplicateKey { key: char },
    ReservedKey { source: String, key: char },
    InvalidCapacity,
    InvalidInterval,
    NotFound { searched: Vec<PathBuf> },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML parse error: {}", e),
            Self::NoSources => write!(f, "at least one source must be configured"),
            Self::EmptySourceId => write!(f, "source id must not be empty"),
            Self::DuplicateSource { id } => write!(f, "source '{}' is configured twice", id),
            Self::DuplicateKey { key } => {
                write!(f, "hotkey '{}' is assigned to more than one source", key)
            }
            Self::ReservedKey { source, key } => {
                write!(f, "source '{}' uses reserved hotkey '{}'", source, key)
            }
            Self::InvalidCapacity => write!(f, "max_lines must be at least 1"),
            Self::InvalidInterval => write!(f, "reconnect_interval_ms must be greater than 0"),
            Self::NotFound { searched } => {
                write!(f, "no config file found, searched: {:?}", searched)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl MonitorConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var("LOGMON_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    /// Like `discover`, but falls back to built-in defaults when no file exists
    pub fn discover_or_default(start_dir: &Path) -> Result<(Option<PathBuf>, Self), ConfigError> {
        match Self::discover(start_dir) {
            Ok((path, config)) => Ok((Some(path), config)),
            Err(ConfigError::NotFound { .. }) => Ok((None, Self::default())),
            Err(e) => Err(e),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut ids = BTreeSet::new();
        let mut keys = BTreeSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::EmptySourceId);
            }
            if !ids.insert(source.id.to_lowercase()) {
                return Err(ConfigError::DuplicateSource {
                    id: source.id.clone(),
                });
            }
            if let Some(key) = source.key {
                if RESERVED_KEYS.contains(&key.to_ascii_lowercase()) {
                    return Err(ConfigError::ReservedKey {
                        source: source.id.clone(),
                        key,
                    });
                }
                if !keys.insert(key.to_ascii_lowercase()) {
                    return Err(ConfigError::DuplicateKey { key });
                }
            }
        }

        if self.max_lines == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    /// Keep only the named sources, in configured order
    pub fn retain_sources(&mut self, ids: &[&str]) {
        self.sources
            .retain(|s| ids.iter().any(|id| s.id.eq_ignore_ascii_case(id)));
    }

    pub fn channels(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.channel(&self.channel_prefix))
            .collect()
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms.max(1))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn subscriber_settings(&self) -> SubscriberSettings {
        SubscriberSettings {
            channel_prefix: self.channel_prefix.clone(),
            reconnect_interval: self.reconnect_interval(),
            receive_timeout: self.receive_timeout_ms.map(Duration::from_millis),
        }
    }

    /// YAML document written by `logmon init`
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
redis_url: redis://cache.internal:6380/2
channel_prefix: "app-logs:"
max_lines: 500
refresh_rate_ms: 100
reconnect_interval_ms: 2000
receive_timeout_ms: 30000
sources:
  - { id: api, color: green, key: i }
  - id: worker
    color: blue
"#;
        let config = MonitorConfig::from_str(yaml).unwrap();
        assert_eq!(config.redis_url, "redis://cache.internal:6380/2");
        assert_eq!(config.max_lines, 500);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].key, Some('i'));
        assert_eq!(config.sources[1].key, None);
        assert_eq!(config.sources[1].color, SourceColor::Blue);
        assert_eq!(config.channels(), vec!["app-logs:api", "app-logs:worker"]);

        let settings = config.subscriber_settings();
        assert_eq!(settings.reconnect_interval, Duration::from_secs(2));
        assert_eq!(settings.receive_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = MonitorConfig::from_str("{}").unwrap();
        assert_eq!(config.redis_url, "redis://localhost:6379/0");
        assert_eq!(config.channel_prefix, "logs:");
        assert_eq!(config.max_lines, 1000);
        assert_eq!(config.reconnect_interval(), Duration::from_secs(5));
        assert_eq!(
            config.channels(),
            vec!["logs:backend", "logs:batch", "logs:ray"]
        );
    }

    #[test]
    fn test_unknown_color_rejected() {
        let yaml = r#"
sources:
  - { id: api, color: purple }
"#;
        assert!(matches!(
            MonitorConfig::from_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("sources: []", "no sources"),
            ("sources: [{ id: '' }]", "empty id"),
            ("sources: [{ id: api }, { id: API }]", "duplicate id"),
            ("sources: [{ id: api, key: q }]", "reserved key"),
            ("sources: [{ id: a, key: z }, { id: b, key: z }]", "duplicate key"),
            ("max_lines: 0", "capacity"),
            ("reconnect_interval_ms: 0", "interval"),
        ];
        for (yaml, what) in cases {
            assert!(MonitorConfig::from_str(yaml).is_err(), "{} accepted", what);
        }

        assert!(matches!(
            MonitorConfig::from_str("sources: [{ id: api, key: q }]"),
            Err(ConfigError::ReservedKey { key: 'q', .. })
        ));
    }

    #[test]
    fn test_hotkeys_compare_case_insensitively() {
        assert!(matches!(
            MonitorConfig::from_str("sources: [{ id: api, key: Q }]"),
            Err(ConfigError::ReservedKey { key: 'Q', .. })
        ));
        assert!(matches!(
            MonitorConfig::from_str("sources: [{ id: api, key: G }]"),
            Err(ConfigError::ReservedKey { .. })
        ));
        assert!(matches!(
            MonitorConfig::from_str("sources: [{ id: a, key: z }, { id: b, key: Z }]"),
            Err(ConfigError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_retain_sources() {
        let mut config = MonitorConfig::default();
        config.retain_sources(&["backend", "ray"]);
        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["backend", "ray"]);
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = MonitorConfig::default().to_yaml().unwrap();
        let parsed = MonitorConfig::from_str(&yaml).unwrap();
        assert_eq!(parsed.sources, default_sources());
    }

    #[test]
    fn test_discover_walks_parents() {
        let root = std::env::temp_dir().join(format!("logmon-discover-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("logmon.yml"), "max_lines: 42\n").unwrap();

        let (path, config) = MonitorConfig::discover(&nested).unwrap();
        assert_eq!(path, root.join("logmon.yml"));
        assert_eq!(config.max_lines, 42);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
