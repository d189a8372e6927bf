// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Logging infrastructure for the boot stage
//!
//! Messages are recorded in a fixed-size circular buffer. The console only
//! comes up in the middle of the bring-up sequence, so every entry stays
//! pending until a [`LogSink`] is attached; [`LogBuffer::flush`] then replays
//! the pending entries, oldest first.
//!
//! # Security
//!
//! - Key material is never present in this stage and must never be logged
//! - Fuse words are only logged as counter bit patterns

use core::fmt::{self, Write};
use heapless::{Deque, String};

/// Message capacity in bytes
pub const MAX_LOG_MESSAGE_LEN: usize = 128;

/// Entries retained before the oldest is evicted
pub const LOG_BUFFER_SIZE: usize = 64;

/// Severity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Failures
    Error = 0,
    /// Important boot messages always shown on the console
    Notice = 1,
    /// Degraded operation
    Warn = 2,
    /// Progress
    Info = 3,
    /// Development detail, filtered by default
    Debug = 4,
}

impl LogLevel {
    /// Console prefix
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Notice => "NOTICE",
            Self::Warn => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogLevel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.as_str());
    }
}

/// One recorded message
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Monotonic sequence number within this boot stage
    pub sequence: u32,
    /// Emitting module
    pub module: &'static str,
    /// Log message
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl LogEntry {
    /// Build an entry, cutting `message` at a char boundary to fit
    #[must_use]
    pub fn new(level: LogLevel, sequence: u32, module: &'static str, message: &str) -> Self {
        let mut msg = String::new();
        let mut end = message.len().min(MAX_LOG_MESSAGE_LEN);
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        let _ = msg.push_str(&message[..end]);

        Self {
            level,
            sequence,
            module,
            message: msg,
        }
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:   [{}] {}", self.level, self.module, self.message)
    }
}

/// Destination for flushed log entries (typically the boot console)
pub trait LogSink {
    /// Emit one entry
    fn emit(&mut self, entry: &LogEntry);
}

/// Bounded record of the stage's log
///
/// Holds the newest [`LOG_BUFFER_SIZE`] entries. Each entry is pending until
/// a flush hands it to a sink; evicting an unflushed entry drops it from the
/// pending count as well.
pub struct LogBuffer {
    entries: Deque<LogEntry, LOG_BUFFER_SIZE>,
    pending: usize,
    sequence: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Empty buffer recording `Info` and above
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            pending: 0,
            sequence: 0,
            min_level: LogLevel::Info,
        }
    }

    /// Change the level filter; already recorded entries are kept
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Current level filter
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// `level` passes the filter
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Record an entry, evicting the oldest one when full
    pub fn write(&mut self, entry: LogEntry) {
        if !self.should_log(entry.level) {
            return;
        }

        if self.entries.is_full() {
            self.entries.pop_front();
            self.pending = self.pending.saturating_sub(1);
        }
        // Room was made above
        let _ = self.entries.push_back(entry);
        self.pending += 1;
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Format and record a message (used by the `log_*!` macros)
    pub fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }

        // Overlong messages are cut at the capacity
        let mut message = String::<MAX_LOG_MESSAGE_LEN>::new();
        let _ = message.write_fmt(args);

        self.write(LogEntry {
            level,
            sequence: self.sequence,
            module,
            message,
        });
    }

    /// Replay every entry not yet flushed to `sink`, oldest first
    pub fn flush<S: LogSink + ?Sized>(&mut self, sink: &mut S) {
        let flushed = self.entries.len() - self.pending;
        for entry in self.entries.iter().skip(flushed) {
            sink.emit(entry);
        }
        self.pending = 0;
    }

    /// Number of entries recorded but not yet flushed
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether any retained entry contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|e| e.message.contains(needle))
    }

    /// Drop every entry; the sequence counter keeps running
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = 0;
    }

    /// Retained entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $module, format_args!($($arg)*))
    };
}

/// Log a notice (always shown on the boot console)
#[macro_export]
macro_rules! log_notice {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Notice, $module, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $module, format_args!($($arg)*))
    };
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $module, format_args!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $module, format_args!($($arg)*))
    };
}
