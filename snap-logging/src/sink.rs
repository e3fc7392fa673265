//! Log sinks handed to the adapter at construction.

use std::sync::{Mutex, PoisonError};
use tracing::Level;

/// Destination for the adapter's operator notices.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Forwards every notice to the global `tracing` dispatcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "do_snapshot", "{}", message),
            Level::WARN => tracing::warn!(target: "do_snapshot", "{}", message),
            Level::INFO => tracing::info!(target: "do_snapshot", "{}", message),
            Level::DEBUG => tracing::debug!(target: "do_snapshot", "{}", message),
            Level::TRACE => tracing::trace!(target: "do_snapshot", "{}", message),
        }
    }
}

/// Keeps every notice in memory so tests can assert on it.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Everything logged so far, one message per line.
    pub fn buffer(&self) -> String {
        self.lines()
            .into_iter()
            .map(|(_, m)| m)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.buffer().contains(needle)
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order_and_levels() {
        let sink = MemorySink::new();
        sink.debug("Event Id: 7");
        sink.error("Droplet Not Found");

        assert_eq!(sink.buffer(), "Event Id: 7\nDroplet Not Found");
        assert_eq!(sink.at(Level::ERROR), vec!["Droplet Not Found".to_string()]);
        assert!(sink.at(Level::WARN).is_empty());
        assert!(sink.contains("Not Found"));
    }

    #[test]
    fn test_tracing_sink_without_subscriber_is_silent() {
        TracingSink.info("no subscriber installed");
    }
}
