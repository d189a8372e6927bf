// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Bounded register polls
//!
//! Every wait on a hardware transition goes through [`poll_until`]. The
//! condition is evaluated once more after the deadline, so a transition that
//! completes while the poller is descheduled is not reported as a timeout.

use bl2_common::time::Deadline;

use crate::error::{HalError, HalResult};
use crate::traits::{Mmio, TimeSource};

/// Expected state of the polled bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitState {
    /// All bits of the mask set
    Set,
    /// All bits of the mask clear
    Clear,
}

impl BitState {
    /// Check whether `value` matches for `mask`
    #[must_use]
    pub const fn matches(&self, value: u32, mask: u32) -> bool {
        match self {
            Self::Set => value & mask == mask,
            Self::Clear => value & mask == 0,
        }
    }
}

/// Poll `condition` until it holds or `timeout_us` elapses
///
/// # Errors
///
/// Returns [`HalError::Timeout`] if the condition still does not hold after
/// the deadline.
pub fn poll_until<T, F>(timer: &T, timeout_us: u32, mut condition: F) -> HalResult<()>
where
    T: TimeSource + ?Sized,
    F: FnMut() -> bool,
{
    let deadline = Deadline::new(timer.now_us(), u64::from(timeout_us));
    loop {
        if condition() {
            return Ok(());
        }
        if deadline.is_expired(timer.now_us()) {
            return if condition() {
                Ok(())
            } else {
                Err(HalError::Timeout)
            };
        }
        core::hint::spin_loop();
    }
}

/// Wait until the `mask` bits at `address` reach `state`
///
/// # Errors
///
/// Returns [`HalError::Timeout`] on expiry.
pub fn wait_for_bits<M, T>(
    mmio: &M,
    timer: &T,
    address: u32,
    mask: u32,
    state: BitState,
    timeout_us: u32,
) -> HalResult<()>
where
    M: Mmio + ?Sized,
    T: TimeSource + ?Sized,
{
    poll_until(timer, timeout_us, || state.matches(mmio.read32(address), mask))
}
