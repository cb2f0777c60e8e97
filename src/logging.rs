//! Logging facilities.
//!
//! The crate is instrumented with `tracing`. Install any subscriber in the
//! host application to see output; filter by the names in [`targets`].
//!
//! Configuration and resolution problems that must not abort an operation
//! (a collection without a data source, a collection variable pointing at an
//! unknown collection, ...) go through [`ErrorLog`]. Each entry is emitted as
//! a `tracing` error event and kept in memory so the host can inspect it.
//! The in-memory log is bounded; once full, the oldest entries are dropped.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Target names for log filtering.
pub mod targets {
    /// Data sources, records and path notifications.
    pub const DATA: &str = "databind::data";
    /// Resolver construction, evaluation and listeners.
    pub const RESOLVER: &str = "databind::resolver";
    /// Collection expansion and state propagation.
    pub const COLLECTION: &str = "databind::collection";
    /// Symbol propagation.
    pub const SYMBOL: &str = "databind::symbol";
    /// Event bus dispatch.
    pub const EVENT: &str = "databind::event";
}

/// Subsystem a logged error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Data,
    Resolver,
    Collection,
    Symbol,
    Event,
}

impl Channel {
    /// The `tracing` target for this channel.
    pub fn target(self) -> &'static str {
        match self {
            Channel::Data => targets::DATA,
            Channel::Resolver => targets::RESOLVER,
            Channel::Collection => targets::COLLECTION,
            Channel::Symbol => targets::SYMBOL,
            Channel::Event => targets::EVENT,
        }
    }
}

/// One recorded error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub channel: Channel,
    pub message: String,
}

/// Host-visible error channel.
///
/// Interior mutability lets read-only resolution code report problems
/// without threading `&mut` through every call.
#[derive(Debug)]
pub struct ErrorLog {
    entries: RefCell<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl ErrorLog {
    /// Entries kept by [`ErrorLog::new`].
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `capacity` entries. With 0, entries are only
    /// emitted to `tracing`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RefCell::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an error and emit it on the channel's tracing target.
    pub fn error(&self, channel: Channel, message: impl Into<String>) {
        let message = message.into();
        // `target:` must be a constant, hence one arm per channel.
        match channel {
            Channel::Data => tracing::error!(target: targets::DATA, "{message}"),
            Channel::Resolver => tracing::error!(target: targets::RESOLVER, "{message}"),
            Channel::Collection => tracing::error!(target: targets::COLLECTION, "{message}"),
            Channel::Symbol => tracing::error!(target: targets::SYMBOL, "{message}"),
            Channel::Event => tracing::error!(target: targets::EVENT, "{message}"),
        }
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.borrow_mut();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry { channel, message });
    }

    /// Snapshot of the kept entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().iter().cloned().collect()
    }

    /// Messages only, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    /// Whether any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop all recorded entries.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_entries_in_order() {
        let log = ErrorLog::new();
        assert!(log.is_empty());
        log.error(Channel::Collection, "first");
        log.error(Channel::Resolver, String::from("second"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.messages(), vec!["first", "second"]);
        assert_eq!(log.entries()[1].channel, Channel::Resolver);
        assert!(log.contains("sec"));
        assert!(!log.contains("third"));

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn drops_oldest_entries_when_full() {
        let log = ErrorLog::with_capacity(2);
        for message in ["a", "b", "c"] {
            log.error(Channel::Data, message);
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages(), vec!["b", "c"]);

        let log = ErrorLog::with_capacity(0);
        log.error(Channel::Event, "dropped");
        assert!(log.is_empty());
        assert_eq!(ErrorLog::new().capacity(), ErrorLog::DEFAULT_CAPACITY);
    }

    #[test]
    fn channel_targets() {
        assert_eq!(Channel::Data.target(), "databind::data");
        assert_eq!(Channel::Symbol.target(), targets::SYMBOL);
    }
}
