//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::selector::WeightTable;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub selector: WeightTable,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP / WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_client_buffer() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_connections: default_max_connections(),
            client_buffer: default_client_buffer(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sample feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Samples strictly above this map to `line`, the rest to `bar`
    #[serde(default = "default_cutoff")]
    pub cutoff: u32,

    /// Samples are drawn from `[0, upper_bound)`
    #[serde(default = "default_upper_bound")]
    pub upper_bound: u32,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_cutoff() -> u32 {
    50
}

fn default_upper_bound() -> u32 {
    100
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            cutoff: default_cutoff(),
            upper_bound: default_upper_bound(),
        }
    }
}

/// Largest sample value range the dashboard plots
pub const MAX_UPPER_BOUND: u32 = 100;

impl FeedConfig {
    /// Reject ranges that would produce samples outside `[0, 100)`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upper_bound == 0 || self.upper_bound > MAX_UPPER_BOUND {
            return Err(ConfigError::Invalid {
                field: "feed.upper_bound",
                reason: format!(
                    "{} is outside 1..={}",
                    self.upper_bound, MAX_UPPER_BOUND
                ),
            });
        }
        if self.cutoff >= self.upper_bound {
            return Err(ConfigError::Invalid {
                field: "feed.cutoff",
                reason: format!(
                    "{} leaves no sample above it (upper_bound {})",
                    self.cutoff, self.upper_bound
                ),
            });
        }
        Ok(())
    }
}

/// Sample history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite file to read history from; no history when unset
    pub path: Option<String>,

    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_records: default_max_records(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// The first config file that exists wins. A file that exists but
    /// cannot be read or parsed is an error, not a fallback to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("livechart").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        Self::load_first(config_paths.iter().flatten())
    }

    fn load_first<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<Self, ConfigError> {
        for path in paths {
            if path.exists() {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(host) = var("LIVECHART_HOST") {
            self.server.host = host;
        }

        if let Some(interval) = var("LIVECHART_FEED_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => self.feed.interval_ms = ms,
                Err(_) => {
                    tracing::warn!(value = %interval, "Ignoring invalid LIVECHART_FEED_INTERVAL_MS")
                }
            }
        }

        if let Some(path) = var("LIVECHART_STORE_PATH") {
            self.store.path = Some(path).filter(|p| !p.is_empty());
        }

        if let Some(level) = var("LIVECHART_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LIVECHART_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Livechart Configuration
#
# Environment variables override these settings:
# - PORT
# - LIVECHART_HOST
# - LIVECHART_FEED_INTERVAL_MS
# - LIVECHART_STORE_PATH
# - LIVECHART_LOG_LEVEL
# - LIVECHART_LOG_FORMAT

[server]
# Host to bind to
host = "0.0.0.0"

# Port to listen on
port = 3000

# Directory served at /
static_dir = "public"

# Maximum concurrent WebSocket connections
max_connections = 1000

# Messages queued per client before new ones are dropped
client_buffer = 64

[feed]
# Time between generated samples (ms)
interval_ms = 2000

# Samples above this value are suggested as "line", the rest as "bar"
cutoff = 50

# Samples are drawn from [0, upper_bound); at most 100, above cutoff
upper_bound = 100

[selector.ease_of_interpretation]
scatter = 5.0
line = 3.0
bar = 4.0
horizontal = 3.0
vertical = 4.0

[selector.visual_appeal]
scatter = 4.0
line = 3.0
bar = 5.0
horizontal = 3.0
vertical = 4.0

[store]
# SQLite file with a `data` table of past samples (optional)
# path = "history.db"

# Newest samples sent to each client on connect
max_records = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.addr(), "0.0.0.0:3000");
        assert_eq!(config.feed.interval_ms, 2000);
        assert_eq!(config.feed.cutoff, 50);
        assert_eq!(config.feed.upper_bound, 100);
        assert!(config.store.path.is_none());
        assert_eq!(config.selector, WeightTable::default());
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.server.static_dir, defaults.server.static_dir);
        assert_eq!(config.feed.interval_ms, defaults.feed.interval_ms);
        assert_eq!(config.selector, defaults.selector);
        assert_eq!(config.store.max_records, defaults.store.max_records);
        assert_eq!(config.logging.format, defaults.logging.format);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [server]
            port = 8080

            [selector.visual_appeal]
            scatter = 1.0
            line = 1.0
            bar = 9.0
            horizontal = 1.0
            vertical = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.selector.visual_appeal.bar, 9.0);
        assert_eq!(config.selector.ease_of_interpretation.scatter, 5.0);
    }

    #[test]
    fn test_single_weight_override() {
        let config = Config::parse("[selector.visual_appeal]\nbar = 9.0\n").unwrap();

        assert_eq!(config.selector.visual_appeal.bar, 9.0);
        assert_eq!(config.selector.visual_appeal.line, 3.0);
        assert_eq!(config.selector.ease_of_interpretation.bar, 4.0);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"nope\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "4100"),
            ("LIVECHART_STORE_PATH", "/tmp/history.db"),
            ("LIVECHART_FEED_INTERVAL_MS", "250"),
            ("LIVECHART_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 4100);
        assert_eq!(config.store.path.as_deref(), Some("/tmp/history.db"));
        assert_eq!(config.feed.interval_ms, 250);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_invalid_overrides_are_logged() {
        let mut config = Config::default();
        let logs = captured_logs(|| {
            config.apply_overrides(|key| match key {
                "PORT" => Some("not-a-port".to_string()),
                "LIVECHART_FEED_INTERVAL_MS" => Some("soon".to_string()),
                _ => None,
            });
        });

        assert_eq!(config.feed.interval_ms, 2000);
        assert!(logs.contains("Ignoring invalid PORT"));
        assert!(logs.contains("Ignoring invalid LIVECHART_FEED_INTERVAL_MS"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        std::fs::write(&broken, "[feed\ncutoff = 10\n").unwrap();
        std::fs::write(&good, "[feed]\ncutoff = 10\n").unwrap();

        let err = Config::load_first([&broken, &good]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let missing = dir.path().join("missing.toml");
        let config = Config::load_first([&missing, &good]).unwrap();
        assert_eq!(config.feed.cutoff, 10);

        assert!(Config::load_first([&missing]).is_ok());
    }

    #[test]
    fn test_feed_range_validation() {
        assert!(FeedConfig::default().validate().is_ok());

        let wide = FeedConfig {
            upper_bound: 1000,
            ..FeedConfig::default()
        };
        assert!(matches!(
            wide.validate(),
            Err(ConfigError::Invalid { field: "feed.upper_bound", .. })
        ));

        let empty = FeedConfig {
            upper_bound: 0,
            ..FeedConfig::default()
        };
        assert!(empty.validate().is_err());

        let all_bar = FeedConfig {
            cutoff: 100,
            ..FeedConfig::default()
        };
        assert!(matches!(
            all_bar.validate(),
            Err(ConfigError::Invalid { field: "feed.cutoff", .. })
        ));

        let config = Config::parse("[feed]\nupper_bound = 500\n").unwrap();
        assert!(config.feed.validate().is_err());
    }
}
