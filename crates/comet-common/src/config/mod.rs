//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, Environment, LogConfig, NodeConfig, ProtoConfig,
    StatConfig, TcpConfig, TimerConfig, WebsocketConfig, ZoneConfig, DEFAULT_CONFIG_PATH,
};
