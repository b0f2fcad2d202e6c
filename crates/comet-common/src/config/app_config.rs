//! Application configuration structs
//!
//! Loads configuration from built-in defaults, an optional YAML/TOML file and
//! `COMET_*` environment variables, in that order of precedence.

use serde::Deserialize;
use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Config file used when `COMET_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/comet.yaml";

/// Upper bound for the raw-socket body cap
const MAX_BODY_SIZE_LIMIT: usize = 16 * 1024 * 1024;

/// Shard ids are 8 bits wide
const MAX_ZONE_NUM: usize = 256;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub node: NodeConfig,
    pub tcp: TcpConfig,
    pub websocket: WebsocketConfig,
    pub proto: ProtoConfig,
    pub timer: TimerConfig,
    pub zone: ZoneConfig,
    pub stat: StatConfig,
    pub log: LogConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "comet".to_string(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Identity of this gateway node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Stored in the top 8 bits of every routing id this node mints
    pub id: u8,
}

/// Raw TCP listener and buffer pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub bind: Vec<String>,
    /// Accept tasks per listener
    pub accept: usize,
    pub sndbuf_size: u32,
    pub rcvbuf_size: u32,
    pub keepalive: bool,
    pub reader_num: usize,
    pub readbuf_num: usize,
    pub readbuf_size: usize,
    pub writer_num: usize,
    pub writebuf_num: usize,
    pub writebuf_size: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind: vec!["0.0.0.0:8080".to_string()],
            accept: default_parallelism(),
            sndbuf_size: 4096,
            rcvbuf_size: 4096,
            keepalive: false,
            reader_num: 32,
            readbuf_num: 1024,
            readbuf_size: 1024,
            writer_num: 32,
            writebuf_num: 1024,
            writebuf_size: 1024,
        }
    }
}

/// WebSocket listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebsocketConfig {
    pub bind: Vec<String>,
    /// Request path accepted for the upgrade
    pub path: String,
    pub tls_open: bool,
    pub tls_bind: Vec<String>,
    pub cert_file: String,
    pub private_file: String,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            bind: vec!["0.0.0.0:8090".to_string()],
            path: "/sub".to_string(),
            tls_open: false,
            tls_bind: Vec::new(),
            cert_file: String::new(),
            private_file: String::new(),
        }
    }
}

/// Protocol and per-connection window settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtoConfig {
    pub handshake_timeout_ms: u64,
    pub heartbeat_ms: u64,
    /// Pipelining window: client requests parsed ahead of the writer
    pub cli_proto: usize,
    /// Outbound signal channel capacity
    pub svr_proto: usize,
    pub max_body_size: usize,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 5_000,
            heartbeat_ms: 90_000,
            cli_proto: 5,
            svr_proto: 80,
            max_body_size: 1024,
        }
    }
}

impl ProtoConfig {
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

/// Timer wheel settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub timer_num: usize,
    /// Initial entry capacity of each wheel
    pub timer_size: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            timer_num: default_parallelism(),
            timer_size: 1000,
        }
    }
}

/// Session registry settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub zone_num: usize,
    /// Initial map capacity of each shard
    pub cache_size: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            zone_num: MAX_ZONE_NUM,
            cache_size: 1024,
        }
    }
}

/// Stat/admin HTTP endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatConfig {
    pub bind: Vec<String>,
}

impl Default for StatConfig {
    fn default() -> Self {
        Self {
            bind: vec!["127.0.0.1:6972".to_string()],
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

impl AppConfig {
    /// Load configuration from `COMET_CONFIG` (or the default path) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let path = env::var("COMET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from the given file, overlaid with `COMET_*` variables
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("COMET")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tcp.bind")
                    .with_list_parse_key("websocket.bind")
                    .with_list_parse_key("websocket.tls_bind")
                    .with_list_parse_key("stat.bind")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the deserializer cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone.zone_num == 0 || self.zone.zone_num > MAX_ZONE_NUM {
            return Err(ConfigError::InvalidValue(
                "zone.zone_num",
                format!("must be in 1..={MAX_ZONE_NUM}, got {}", self.zone.zone_num),
            ));
        }

        let positive = [
            ("proto.cli_proto", self.proto.cli_proto),
            ("proto.svr_proto", self.proto.svr_proto),
            ("tcp.accept", self.tcp.accept),
            ("tcp.reader_num", self.tcp.reader_num),
            ("tcp.writer_num", self.tcp.writer_num),
            ("timer.timer_num", self.timer.timer_num),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue(key, "must be greater than 0".to_string()));
            }
        }

        if self.proto.max_body_size > MAX_BODY_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue(
                "proto.max_body_size",
                format!("must not exceed {MAX_BODY_SIZE_LIMIT}"),
            ));
        }

        if self.websocket.tls_open
            && (self.websocket.cert_file.is_empty() || self.websocket.private_file.is_empty())
        {
            return Err(ConfigError::InvalidValue(
                "websocket.tls_open",
                "cert_file and private_file are required".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
