use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Entries kept before the oldest are dropped.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Recent operational messages, shared explicitly with whoever needs to
/// report progress. Every entry is also emitted as a `tracing` event.
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn add(&self, level: &str, source: &str, message: &str) -> LogEntry {
        match level {
            "ERROR" => error!(source, "{}", message),
            "WARN" => warn!(source, "{}", message),
            "DEBUG" => debug!(source, "{}", message),
            _ => info!(source, "{}", message),
        }

        let entry = LogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            source: source.to_string(),
            message: message.to_string(),
        };

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        entry
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
