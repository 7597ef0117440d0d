//! `tracing`-backed table logger.

use std::fmt;

use tracing::debug;

use idlecache_core::TableLogger;

/// Forwards table diagnostics to `tracing` at debug level.
///
/// Each event carries the table name as a `table` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl TableLogger for TracingLogger {
    fn log(&self, table: &str, message: fmt::Arguments<'_>) {
        debug!(target: "idlecache", table, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_without_subscriber() {
        TracingLogger.log("t", format_args!("nothing listens to {}", 42));
    }

    #[test]
    fn test_logs_with_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            TracingLogger.log("sessions", format_args!("Flushing table"));
        });
    }
}
