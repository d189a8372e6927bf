// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Set-once cells for stage-wide state

use crate::errors::{Error, Result};

/// A value that may be initialized exactly once
///
/// The boot stage is single threaded, so the cell is owned by the stage
/// state and borrowed mutably only during initialization.
#[derive(Debug)]
pub struct InitOnce<T> {
    value: Option<T>,
}

impl<T> InitOnce<T> {
    /// Create an empty cell
    #[must_use]
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Initialize the cell
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if the cell already holds a value;
    /// the existing value is kept.
    pub fn init(&mut self, value: T) -> Result<&T> {
        if self.value.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        Ok(self.value.insert(value))
    }

    /// Get the value if initialized
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Check whether the cell holds a value
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}

impl<T> Default for InitOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
