// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot ROM hand-off and stage-wide state
//!
//! The boot ROM passes a pointer to its context structure in the first
//! argument register. The stage decodes it once into a [`BootContext`] and
//! keeps it, together with the other stage singletons, in [`StageState`].
//! Nothing here is global: the state is owned by the sequencer and lent to
//! whoever needs it.

use bl2_common::log::LogBuffer;
use bl2_common::{AuthStatus, BootDevice, BootInterface, InitOnce, Result};

/// Boot ROM context fields consumed by this stage
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct RawBootContext {
    /// Interface the ROM loaded this stage from
    pub boot_interface_selected: u16,
    /// Instance of that interface (1-based)
    pub boot_interface_instance: u16,
    /// Outcome of the ROM's authentication of this stage
    pub auth_status: u32,
}

/// Decoded boot ROM hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootContext {
    /// Boot interface
    pub interface: BootInterface,
    /// Boot interface instance
    pub instance: u16,
    /// ROM authentication result
    pub auth_status: AuthStatus,
}

impl BootContext {
    /// Decode the raw ROM structure
    #[must_use]
    pub const fn from_raw(raw: &RawBootContext) -> Self {
        Self {
            interface: BootInterface::from_raw(raw.boot_interface_selected),
            instance: raw.boot_interface_instance,
            auth_status: AuthStatus::from_raw(raw.auth_status),
        }
    }

    /// The ROM booted over the serial UART programmer
    #[must_use]
    pub fn is_serial_uart(&self) -> bool {
        self.interface == BootInterface::SerialUart
    }

    /// The ROM booted over the USB programmer
    #[must_use]
    pub fn is_serial_usb(&self) -> bool {
        self.interface == BootInterface::SerialUsb
    }
}

/// Registered console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleHandle {
    /// UART register base
    pub base: u32,
    /// UART kernel clock rate in Hz
    pub clock_rate: u32,
    /// Baud rate
    pub baudrate: u32,
}

/// Process-wide state of the boot stage
///
/// The boot context is fixed at construction. The boot device and console
/// are set at most once during bring-up and read-only afterwards.
pub struct StageState {
    boot_context: BootContext,
    boot_device: InitOnce<BootDevice>,
    console: InitOnce<ConsoleHandle>,
    /// Stage log, replayed to the console once registered
    pub log: LogBuffer,
}

impl StageState {
    /// Create the state for this boot
    #[must_use]
    pub const fn new(boot_context: BootContext) -> Self {
        Self {
            boot_context,
            boot_device: InitOnce::new(),
            console: InitOnce::new(),
            log: LogBuffer::new(),
        }
    }

    /// Boot ROM hand-off
    #[must_use]
    pub const fn boot_context(&self) -> &BootContext {
        &self.boot_context
    }

    /// Device later stages load from (`Board` until classified)
    #[must_use]
    pub fn boot_device(&self) -> BootDevice {
        self.boot_device.get().copied().unwrap_or(BootDevice::Board)
    }

    /// Record the boot device classification
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyInitialized` on a second call.
    pub fn set_boot_device(&mut self, device: BootDevice) -> Result<()> {
        self.boot_device.init(device).map(|_| ())
    }

    /// Active console, if one was registered
    #[must_use]
    pub const fn console(&self) -> Option<&ConsoleHandle> {
        self.console.get()
    }

    /// Record the active console
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyInitialized` on a second call.
    pub fn set_console(&mut self, console: ConsoleHandle) -> Result<()> {
        self.console.init(console).map(|_| ())
    }
}
