// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Monotonic firmware version
//!
//! The anti-rollback counter lives in a single 32-bit fuse word and is
//! encoded in unary: version `V` is recorded as the `V` lowest bits set. Fuse
//! bits can only go from 0 to 1, so the recorded version can only grow.
//! This caps the version at [`MAX_MONOTONIC_VALUE`]. A larger value is
//! rejected when the constant is evaluated, so an out-of-range build fails
//! to compile.

use core::fmt;

pub use crate::constants::MAX_MONOTONIC_VALUE;

/// Firmware version for the anti-rollback counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MonotonicVersion(u32);

impl MonotonicVersion {
    /// Create a version
    ///
    /// # Panics
    ///
    /// Panics if `value` exceeds [`MAX_MONOTONIC_VALUE`]. In a `const`
    /// context this is a compile error.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        assert!(
            value <= MAX_MONOTONIC_VALUE,
            "monotonic version exceeds the fuse word width"
        );
        Self(value)
    }

    /// Create a version from a runtime value
    #[must_use]
    pub const fn checked(value: u32) -> Option<Self> {
        if value <= MAX_MONOTONIC_VALUE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Raw version number
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Unary fuse pattern recording this version (`value` low bits set)
    #[must_use]
    pub const fn bit_pattern(&self) -> u32 {
        if self.0 >= MAX_MONOTONIC_VALUE {
            u32::MAX
        } else {
            (1u32 << self.0) - 1
        }
    }

    /// Check whether a stored fuse word already records this version
    #[must_use]
    pub const fn is_recorded_by(&self, stored: u32) -> bool {
        stored.count_ones() >= self.0
    }

    /// Word recording this version on top of `stored`
    ///
    /// Sets the lowest clear bits of `stored` until exactly `value` bits are
    /// set. No bit of `stored` is cleared; on a unary word this is
    /// [`bit_pattern`](Self::bit_pattern). Returns `stored` unchanged when it
    /// already records this version.
    #[must_use]
    pub const fn advance(&self, stored: u32) -> u32 {
        let mut word = stored;
        while word.count_ones() < self.0 {
            word |= !word & word.wrapping_add(1);
        }
        word
    }

    /// Check whether a stored fuse word records a newer version
    #[must_use]
    pub const fn is_older_than(&self, stored: u32) -> bool {
        stored.count_ones() > self.0
    }
}

impl fmt::Display for MonotonicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running firmware version, fixed at build time
pub const TF_VERSION: MonotonicVersion = MonotonicVersion::new(0);
