//! msghub user client.
//!
//! Keeps a session to the gateway alive, heartbeats its status, publishes
//! messages, and displays broadcasts.

mod app;
mod handlers;

use clap::Parser;

use msghub_core::config::{self, ClientConfig};

/// Command-line overrides applied on top of the JSON configuration file.
#[derive(Debug, Parser)]
#[command(name = "msghub-client", about = "msghub user client")]
struct Cli {
    /// Title reported by this process; doubles as the session id.
    #[arg(long = "client_title")]
    client_title: Option<String>,
    /// Root directory for log files.
    #[arg(long = "log_root_path")]
    log_root_path: Option<String>,
    /// Log flush interval in milliseconds.
    #[arg(long = "write_interval")]
    write_interval: Option<u64>,
    /// Console log level (0-5).
    #[arg(long = "write_console_log")]
    write_console_log: Option<u8>,
    /// File log level (0-5).
    #[arg(long = "write_file_log")]
    write_file_log: Option<u8>,
}

impl Cli {
    fn apply(self, config: &mut ClientConfig) {
        if let Some(client_title) = self.client_title {
            config.client_title = client_title;
        }
        if let Some(log_root_path) = self.log_root_path {
            config.logging.log_root_path = log_root_path;
        }
        if let Some(write_interval) = self.write_interval {
            config.logging.write_interval = write_interval;
        }
        if let Some(write_console_log) = self.write_console_log {
            config.logging.write_console_log = write_console_log;
        }
        if let Some(write_file_log) = self.write_file_log {
            config.logging.write_file_log = write_file_log;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config: ClientConfig = match config::load(config::CLIENT_CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    cli.apply(&mut config);

    let _log_guard = msghub_core::logging::init(&config.logging, "user_client");

    if let Err(e) = app::run(config).await {
        tracing::error!(error = %e, "Client error");
        std::process::exit(1);
    }
}
