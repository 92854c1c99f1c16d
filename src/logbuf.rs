//! Operator log ring
//!
//! Keeps the last [`CAPACITY`] operator-facing lines with their timestamps
//! so they can be fetched over the command surface after the fact. Every
//! line is also sent to the `log` facade.

use core::fmt::{self, Write};

use heapless::{HistoryBuffer, String};

use crate::config::logbuf::{CAPACITY, MAX_MESSAGE_LEN};

/// One retained line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Milliseconds since boot
    pub timestamp_ms: u64,
    pub message: String<MAX_MESSAGE_LEN>,
}

/// Fixed-capacity ring; the oldest line is evicted when full
pub struct LogBuffer {
    buffer: HistoryBuffer<LogEntry, CAPACITY>,
    evicted: u32,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: HistoryBuffer::new(),
            evicted: 0,
        }
    }

    /// Record a line. A formatted fragment that no longer fits within
    /// [`MAX_MESSAGE_LEN`] is dropped.
    pub fn record(&mut self, timestamp_ms: u64, args: fmt::Arguments<'_>) {
        let mut message = String::new();
        let _ = message.write_fmt(args);
        log::info!("{}", message);

        if self.buffer.len() == CAPACITY {
            self.evicted = self.evicted.saturating_add(1);
        }
        self.buffer.write(LogEntry {
            timestamp_ms,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Lines lost to eviction since boot
    pub fn evicted(&self) -> u32 {
        self.evicted
    }

    /// Entry `index`, counted from the oldest retained line
    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.buffer.oldest_ordered().nth(index)
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.buffer.oldest_ordered()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let mut logs = LogBuffer::new();
        assert!(logs.is_empty());

        logs.record(10, format_args!("first {}", 1));
        logs.record(20, format_args!("second"));

        assert_eq!(logs.len(), 2);
        let oldest = logs.get(0).unwrap();
        assert_eq!(oldest.timestamp_ms, 10);
        assert_eq!(oldest.message.as_str(), "first 1");
        assert_eq!(logs.get(1).unwrap().message.as_str(), "second");
        assert!(logs.get(2).is_none());
    }

    #[test]
    fn test_oldest_evicted_when_full() {
        let mut logs = LogBuffer::new();
        for i in 0..CAPACITY + 3 {
            logs.record(i as u64, format_args!("line {}", i));
        }

        assert_eq!(logs.len(), CAPACITY);
        assert_eq!(logs.evicted(), 3);
        assert_eq!(logs.get(0).unwrap().message.as_str(), "line 3");
        assert_eq!(
            logs.iter().last().unwrap().message.as_str(),
            std::format!("line {}", CAPACITY + 2)
        );
    }

    #[test]
    fn test_long_message_truncated() {
        let mut logs = LogBuffer::new();
        let long = "x".repeat(MAX_MESSAGE_LEN * 2);
        logs.record(0, format_args!("{}", long));
        assert!(logs.get(0).unwrap().message.len() <= MAX_MESSAGE_LEN);
    }
}
