//! Application configuration schemas.
//!
//! Each deployable process reads a JSON configuration file from its program
//! folder, merged with `MSGHUB_`-prefixed environment variables. CLI flags
//! are applied on top by the binary. Each sub-module represents a logical
//! configuration section shared between the processes.

pub mod cache;
pub mod database;
pub mod dispatch;
pub mod encryption;
pub mod logging;
pub mod queue;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::database::DatabaseConfig;
pub use self::dispatch::DispatchConfig;
pub use self::encryption::EncryptionConfig;
pub use self::logging::LoggingConfig;
pub use self::queue::QueueConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Configuration file name for the gateway server process.
pub const SERVER_CONFIG_FILE: &str = "main_server_configurations";
/// Configuration file name for the queue consumer process.
pub const CONSUMER_CONFIG_FILE: &str = "main_server_consumer_configurations";
/// Configuration file name for the user client process.
pub const CLIENT_CONFIG_FILE: &str = "user_client_configurations";

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Title reported by this process.
    #[serde(default = "default_server_title")]
    pub client_title: String,
    /// Port the gateway listens on.
    #[serde(default = "default_server_port")]
    pub main_server_port: u16,
    /// Maximum frame part size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Worker pool settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key/value store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Work-queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Queue consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Title reported by this process.
    #[serde(default = "default_consumer_title")]
    pub client_title: String,
    /// Worker pool settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key/value store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Work-queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Message persistence settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Stored-content encryption settings.
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// User client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Title reported by this process; doubles as the session id.
    #[serde(default = "default_client_title")]
    pub client_title: String,
    /// Address of the gateway server.
    #[serde(default = "default_server_ip")]
    pub main_server_ip: String,
    /// Port of the gateway server.
    #[serde(default = "default_server_port")]
    pub main_server_port: u16,
    /// Maximum frame part size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Delay between reconnect attempts in milliseconds.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    /// Delay before re-issuing the status heartbeat in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Worker pool settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_server_title() -> String {
    "MainServer".to_string()
}

fn default_consumer_title() -> String {
    "MainServerConsumer".to_string()
}

fn default_client_title() -> String {
    "UserClient".to_string()
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    9876
}

fn default_buffer_size() -> usize {
    32768
}

fn default_reconnect_interval() -> u64 {
    3000
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

/// Load a process configuration from its JSON file and the environment.
///
/// The file is optional; every field has a default so a missing file yields
/// a fully usable configuration.
pub fn load<T: serde::de::DeserializeOwned>(file_stem: &str) -> AppResult<T> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(file_stem).required(false))
        .add_source(
            config::Environment::with_prefix("MSGHUB")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

    settings
        .try_deserialize()
        .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
}
