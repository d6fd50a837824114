//! msghub gateway server.
//!
//! Accepts persistent client sessions, dispatches their commands, publishes
//! outbound messages to the work queue, and fans consumed broadcasts out to
//! every connected session.

mod app;
mod broadcast;
mod handlers;
mod snapshot;

use clap::Parser;

use msghub_core::config::{self, GatewayConfig};

/// Command-line overrides applied on top of the JSON configuration file.
#[derive(Debug, Parser)]
#[command(name = "msghub-server", about = "msghub gateway server")]
struct Cli {
    /// Title reported by this process.
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
    fn apply(self, config: &mut GatewayConfig) {
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

    let mut config: GatewayConfig = match config::load(config::SERVER_CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    cli.apply(&mut config);

    let _log_guard = msghub_core::logging::init(&config.logging, "main_server");

    if let Err(e) = app::run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
