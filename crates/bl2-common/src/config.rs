// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot stage configuration
//!
//! All configuration is compile-time: the memory layout of the part and the
//! boot flow options selected for the build. Runtime platform properties
//! (DRAM size, console node, per-image placement) come from the platform
//! configuration tree through the HAL's `ConfigSource`.

use crate::constants::{
    BKPSRAM_BASE, BKPSRAM_SIZE, BL2_BASE, BL2_LIMIT, DDR_BASE, DDR_MAX_SIZE, DDR_SHMEM_SIZE,
    DDR_S_SIZE, DTB_BASE, DTB_SIZE, FW_CONFIG_BASE, FW_CONFIG_MAX_SIZE, OPTEE_BASE, OPTEE_SIZE,
    PWR_TIMEOUT_US, RESET_TIMEOUT_US, UART_BAUDRATE,
};
use crate::log::LogLevel;
use crate::types::{MemoryAttributes, MemoryRegion};
use crate::version::{MonotonicVersion, TF_VERSION};

/// Memory layout of the part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// DRAM base address
    pub dram_base: u64,
    /// Largest DRAM size the part can address
    pub dram_max_size: u64,
    /// Secure DRAM reserved at the top of DRAM
    pub dram_secure_size: u64,
    /// Shared DRAM reserved below the secure area
    pub dram_shared_size: u64,
    /// This stage's code and data
    pub bl2: MemoryRegion,
    /// Preloaded device tree blob
    pub dtb: MemoryRegion,
    /// Fixed TEE pager window
    pub tee_pager: MemoryRegion,
    /// Firmware configuration window
    pub fw_config: MemoryRegion,
    /// Always-on backup SRAM
    pub backup_sram: MemoryRegion,
}

impl MemoryLayout {
    /// STM32MP15 layout
    pub const STM32MP15: Self = Self {
        dram_base: DDR_BASE,
        dram_max_size: DDR_MAX_SIZE,
        dram_secure_size: DDR_S_SIZE,
        dram_shared_size: DDR_SHMEM_SIZE,
        bl2: MemoryRegion::new(
            BL2_BASE,
            BL2_LIMIT - BL2_BASE,
            MemoryAttributes::CODE.union(MemoryAttributes::SECURE),
        ),
        dtb: MemoryRegion::new(
            DTB_BASE,
            DTB_SIZE,
            MemoryAttributes::RO_DATA.union(MemoryAttributes::SECURE),
        ),
        tee_pager: MemoryRegion::window(OPTEE_BASE, OPTEE_SIZE),
        fw_config: MemoryRegion::window(FW_CONFIG_BASE, FW_CONFIG_MAX_SIZE),
        backup_sram: MemoryRegion::window(BKPSRAM_BASE, BKPSRAM_SIZE),
    };

    /// DRAM as a region of `dram_size` bytes
    #[must_use]
    pub const fn dram(&self, dram_size: u64) -> MemoryRegion {
        MemoryRegion::new(
            self.dram_base,
            dram_size,
            MemoryAttributes::RW
                .union(MemoryAttributes::SECURE)
                .union(MemoryAttributes::CACHEABLE),
        )
    }

    /// Secure window at the top of DRAM, below the shared area
    ///
    /// Base is `dram_base + dram_size - secure - shared`, size is the secure
    /// reservation. Returns `None` if DRAM is smaller than the reservations.
    #[must_use]
    pub const fn dram_top_window(&self, dram_size: u64) -> Option<MemoryRegion> {
        let reserved = self.dram_secure_size + self.dram_shared_size;
        if dram_size < reserved {
            return None;
        }
        Some(MemoryRegion::window(
            self.dram_base + dram_size - reserved,
            self.dram_secure_size,
        ))
    }

    /// Check whether `address` lies in the part's DRAM window
    #[must_use]
    pub const fn is_dram_address(&self, address: u64) -> bool {
        address >= self.dram_base && address - self.dram_base < self.dram_max_size
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::STM32MP15
    }
}

/// How the split TEE sub-image windows are sourced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeLayout {
    /// Windows come from the firmware configuration table
    FixedWindows,
    /// The TEE image is self-describing; windows derive from the top of DRAM
    DramTop,
}

/// Boot stage configuration
#[derive(Debug, Clone, Copy)]
pub struct Bl2Config {
    /// Memory layout
    pub layout: MemoryLayout,
    /// Split TEE window sourcing
    pub tee_layout: TeeLayout,
    /// Stage built with trusted board boot (image authentication)
    pub trusted_board_boot: bool,
    /// Serial UART programmer support
    pub uart_programmer: bool,
    /// USB programmer support
    pub usb_programmer: bool,
    /// Console baud rate
    pub console_baudrate: u32,
    /// Reset line assert/deassert timeout
    pub reset_timeout_us: u32,
    /// Power-domain register poll timeout
    pub power_timeout_us: u32,
    /// Minimum recorded log level
    pub log_level: LogLevel,
    /// Version enforced against the monotonic counter
    pub firmware_version: MonotonicVersion,
}

impl Bl2Config {
    /// Default configuration for STM32MP15 with fw-config placement
    pub const DEFAULT: Self = Self {
        layout: MemoryLayout::STM32MP15,
        tee_layout: TeeLayout::FixedWindows,
        trusted_board_boot: true,
        uart_programmer: true,
        usb_programmer: true,
        console_baudrate: UART_BAUDRATE,
        reset_timeout_us: RESET_TIMEOUT_US,
        power_timeout_us: PWR_TIMEOUT_US,
        log_level: LogLevel::Info,
        firmware_version: TF_VERSION,
    };

    /// Builder-style override of the TEE layout
    #[must_use]
    pub const fn with_tee_layout(mut self, tee_layout: TeeLayout) -> Self {
        self.tee_layout = tee_layout;
        self
    }

    /// Builder-style override of trusted board boot
    #[must_use]
    pub const fn with_trusted_board_boot(mut self, enabled: bool) -> Self {
        self.trusted_board_boot = enabled;
        self
    }

    /// Builder-style override of the enforced firmware version
    #[must_use]
    pub const fn with_firmware_version(mut self, version: MonotonicVersion) -> Self {
        self.firmware_version = version;
        self
    }

    /// Regions this stage must never let an image overwrite
    #[must_use]
    pub const fn reserved_regions(&self) -> [MemoryRegion; 2] {
        [self.layout.bl2, self.layout.dtb]
    }
}

impl Default for Bl2Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
