//! Tracing initialization shared by the three binaries.
//!
//! Console and file outputs are filtered independently. Integer verbosity
//! levels follow the deployment convention: 0 = off, 1 = error, 2 = warn,
//! 3 = info, 4 = debug, 5 = trace. `RUST_LOG` overrides the console filter.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Map an integer verbosity level onto a filter directive.
pub fn level_directive(level: u8) -> &'static str {
    match level {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing for a process.
///
/// Returns the file writer guard when file logging is enabled; it must be
/// held for the lifetime of the process so buffered lines are flushed.
pub fn init(config: &LoggingConfig, process_name: &str) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(config.write_console_log)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_filter(console_filter);

    if config.write_file_log > 0 && !config.log_root_path.is_empty() {
        let appender = tracing_appender::rolling::daily(
            &config.log_root_path,
            format!("{process_name}.log"),
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(level_directive(config.write_file_log)));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry().with(console_layer).init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive(0), "off");
        assert_eq!(level_directive(3), "info");
        assert_eq!(level_directive(9), "trace");
    }
}
