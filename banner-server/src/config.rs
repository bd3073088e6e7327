//! YAML configuration, layered with environment-variable overrides.

use config::{Config as RawConfig, Environment, File};
use serde::Deserialize;

/// Top-level server configuration, mirroring the fields of the Go service this
/// service replaces one-for-one (`port`, `postgres.*`, `redis.url`, `logger.*`, `mode`).
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub port: u16,
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub logger: LoggerConfig,
    pub mode: Mode,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "PostgresConfig::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "PostgresConfig::default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "PostgresConfig::default_ttl_idle_connections")]
    pub ttl_idle_connections: u64,
}

impl PostgresConfig {
    const fn default_max_connections() -> u32 {
        5
    }

    const fn default_min_connections() -> u32 {
        2
    }

    const fn default_ttl_idle_connections() -> u64 {
        10
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggerConfig {
    pub app_name: String,
    pub directory: String,
    pub level: String,
    pub use_std_and_file: bool,
    #[serde(default)]
    pub allow_show_low_level: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Release,
    Debug,
    #[serde(rename = "release+prof")]
    ReleaseProf,
    #[serde(rename = "debug+prof")]
    DebugProf,
}

/// Loads configuration from `path`, then lets environment variables prefixed
/// `BANNER_` (double-underscore separated, e.g. `BANNER_POSTGRES__URL`) override
/// individual fields. A missing or malformed file is a fatal startup error.
pub fn load(path: &str) -> Result<Config, config::ConfigError> {
    RawConfig::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("BANNER").separator("__"))
        .build()?
        .try_deserialize()
}
