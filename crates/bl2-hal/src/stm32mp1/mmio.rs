// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Volatile register access for STM32MP15 peripherals

use core::ptr;

use crate::traits::Mmio;

/// Direct volatile access to the peripheral address space
///
/// Only meaningful when running on the target with the register map
/// identity-mapped as device memory.
#[derive(Debug, Default)]
pub struct VolatileMmio {
    _private: (),
}

impl VolatileMmio {
    /// Create the accessor
    ///
    /// # Safety
    ///
    /// The caller must run on an STM32MP15 with the peripheral windows
    /// mapped, and every address later passed to [`Mmio`] must be a valid,
    /// 4-byte aligned register.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Mmio for VolatileMmio {
    fn read32(&self, address: u32) -> u32 {
        // SAFETY: construction of VolatileMmio requires every address to be
        // an aligned, mapped STM32MP15 register. Volatile read is required
        // because register contents change outside program control.
        unsafe { ptr::read_volatile(address as usize as *const u32) }
    }

    fn write32(&mut self, address: u32, value: u32) {
        // SAFETY: same contract as read32. Volatile write keeps the store
        // ordered and never elided.
        unsafe { ptr::write_volatile(address as usize as *mut u32, value) }
    }
}
