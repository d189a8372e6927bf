// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Anti-Rollback Protection
//!
//! The running firmware's version is recorded in the monotonic counter fuse
//! word. The recorded version is the number of bits set in the word; a fresh
//! counter is written in unary, version `V` being the `V` lowest bits set.
//!
//! - Increment sets the lowest clear bits until `V` bits are set; no bit is
//!   ever cleared
//! - A stored word with more bits set than `V` means a newer firmware has
//!   already run on this device, so the running image is a rollback
//! - Programming is one-way; a failed program may leave the word in an
//!   intermediate state, so it is always fatal

use bl2_common::{log_error, log_info};
use bl2_common::log::LogBuffer;
use bl2_common::{Error, MonotonicVersion, Result};
use bl2_hal::{FuseField, FuseStorage};

const MODULE: &str = "rollback";

/// Stored counter and running version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiRollbackState {
    /// Fuse word index of the counter
    pub index: u32,
    /// Current stored fuse word
    pub stored: u32,
    /// Running firmware version
    pub version: MonotonicVersion,
}

/// Outcome of counter enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// Counter already records the running version
    UpToDate {
        /// Stored fuse word
        stored: u32,
    },
    /// Counter was advanced
    Advanced {
        /// Previous fuse word
        from: u32,
        /// Programmed fuse word
        to: u32,
    },
}

impl AntiRollbackState {
    /// Read the stored counter
    ///
    /// # Errors
    ///
    /// Returns `Error::FuseReadFailed` if the index or value cannot be read.
    pub fn read(fuses: &dyn FuseStorage, version: MonotonicVersion) -> Result<Self> {
        let index = fuses
            .read_index(FuseField::MonotonicCounter)
            .map_err(|_| Error::FuseReadFailed)?;
        let stored = fuses
            .read_value(FuseField::MonotonicCounter)
            .map_err(|_| Error::FuseReadFailed)?;
        Ok(Self {
            index,
            stored,
            version,
        })
    }

    /// Check that the running version is not older than the recorded one
    ///
    /// # Errors
    ///
    /// Returns `Error::RollbackAttempted` if the stored word records a newer
    /// version.
    pub fn check_rollback(&self) -> Result<()> {
        if self.version.is_older_than(self.stored) {
            return Err(Error::RollbackAttempted);
        }
        Ok(())
    }

    /// Word to program, if the counter must advance
    #[must_use]
    pub const fn target(&self) -> Option<u32> {
        if self.version.is_recorded_by(self.stored) {
            None
        } else {
            Some(self.version.advance(self.stored))
        }
    }
}

/// Enforce the monotonic counter for `version`
///
/// # Errors
///
/// - `Error::FuseReadFailed` if the counter cannot be read
/// - `Error::RollbackAttempted` if a newer firmware already ran
/// - `Error::FuseProgramFailed` if programming the fuse failed or the word
///   read back does not record `version`
pub fn update_monotonic_counter(
    fuses: &mut dyn FuseStorage,
    version: MonotonicVersion,
    log: &mut LogBuffer,
) -> Result<CounterUpdate> {
    let state = AntiRollbackState::read(fuses, version)?;

    if let Err(e) = state.check_rollback() {
        log_error!(
            log,
            MODULE,
            "Firmware version {} older than counter 0x{:x}",
            version,
            state.stored
        );
        return Err(e);
    }

    let Some(target) = state.target() else {
        return Ok(CounterUpdate::UpToDate {
            stored: state.stored,
        });
    };

    if let Err(e) = fuses.program(target, state.index) {
        log_error!(log, MODULE, "BSEC: MONOTONIC_OTP program Error {}", e);
        return Err(Error::FuseProgramFailed);
    }

    let written = fuses
        .read_value(FuseField::MonotonicCounter)
        .map_err(|_| Error::FuseReadFailed)?;
    if written.count_ones() != version.value() {
        log_error!(
            log,
            MODULE,
            "MONOTONIC_OTP reads 0x{:x} after programming 0x{:x}",
            written,
            target
        );
        return Err(Error::FuseProgramFailed);
    }

    log_info!(
        log,
        MODULE,
        "Monotonic counter has been incremented (value 0x{:x})",
        target
    );
    Ok(CounterUpdate::Advanced {
        from: state.stored,
        to: target,
    })
}
