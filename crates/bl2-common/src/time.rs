// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Time utilities for bounded hardware polls
//!
//! The boot stage has a single time base: a free-running microsecond counter
//! exposed by the HAL. Every register poll is bounded by a [`Deadline`].

/// Timestamp or duration in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Micros(u64);

impl Micros {
    /// Counter value in microseconds
    #[must_use]
    pub const fn new(us: u64) -> Self {
        Self(us)
    }

    /// Raw counter value
    #[must_use]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Microseconds elapsed since `self` at time `now`
    #[must_use]
    pub const fn elapsed(&self, now: Self) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

/// Deadline for a bounded wait
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Micros,
    timeout_us: u64,
}

impl Deadline {
    /// Create a deadline `timeout_us` after `start`
    #[must_use]
    pub const fn new(start: Micros, timeout_us: u64) -> Self {
        Self { start, timeout_us }
    }

    /// True once strictly more than the timeout has elapsed
    #[must_use]
    pub const fn is_expired(&self, now: Micros) -> bool {
        self.start.elapsed(now) > self.timeout_us
    }

    /// Microseconds left before expiry
    #[must_use]
    pub const fn remaining(&self, now: Micros) -> u64 {
        self.timeout_us.saturating_sub(self.start.elapsed(now))
    }
}
