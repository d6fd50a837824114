//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Logging verbosity and output settings.
///
/// Console and file verbosity are independent integer levels:
/// 0 = off, 1 = error, 2 = warn, 3 = info, 4 = debug, 5 = trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Console log level.
    #[serde(default = "default_console_level")]
    pub write_console_log: u8,
    /// File log level.
    #[serde(default)]
    pub write_file_log: u8,
    /// Root directory for log files.
    #[serde(default)]
    pub log_root_path: String,
    /// Flush interval for the file writer in milliseconds.
    #[serde(default = "default_write_interval")]
    pub write_interval: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            write_console_log: default_console_level(),
            write_file_log: 0,
            log_root_path: String::new(),
            write_interval: default_write_interval(),
        }
    }
}

fn default_console_level() -> u8 {
    3
}

fn default_write_interval() -> u64 {
    1000
}
