// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types for the boot stage
//!
//! This module defines the image identities known to the boot flow, memory
//! region descriptors and the boot ROM hand-off primitives.

use core::fmt;

use crate::errors::Error;

// ============================================================================
// Image Identity
// ============================================================================

/// Fixed roles of the images handled by the boot flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImageId {
    /// Firmware configuration blob (describes where every other image goes)
    FwConfig = 0,
    /// Secure monitor / TEE image
    Tee = 1,
    /// TEE pager sub-image (resident part of a split TEE)
    TeePager = 2,
    /// TEE paged sub-image (demand-loaded part of a split TEE)
    TeePaged = 3,
    /// Non-secure firmware image
    NonSecureFw = 4,
    /// Hardware configuration blob (device tree for later stages)
    HwConfig = 5,
    /// TEE configuration blob
    TeeConfig = 6,
}

impl ImageId {
    /// Number of image identities
    pub const COUNT: usize = 7;

    /// Every image identity, in table order
    pub const ALL: [ImageId; Self::COUNT] = [
        Self::FwConfig,
        Self::Tee,
        Self::TeePager,
        Self::TeePaged,
        Self::NonSecureFw,
        Self::HwConfig,
        Self::TeeConfig,
    ];

    /// Index of this image in a descriptor table
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FwConfig => "FW_CONFIG",
            Self::Tee => "BL32",
            Self::TeePager => "BL32_EXTRA1",
            Self::TeePaged => "BL32_EXTRA2",
            Self::NonSecureFw => "BL33",
            Self::HwConfig => "HW_CONFIG",
            Self::TeeConfig => "TOS_FW_CONFIG",
        }
    }

    /// Image identifier as used by the external image loader
    #[must_use]
    pub const fn loader_id(self) -> u32 {
        match self {
            Self::FwConfig => 31,
            Self::Tee => 4,
            Self::TeePager => 21,
            Self::TeePaged => 22,
            Self::NonSecureFw => 5,
            Self::HwConfig => 23,
            Self::TeeConfig => 26,
        }
    }
}

impl TryFrom<u32> for ImageId {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.loader_id() == raw)
            .ok_or(Error::UnknownImage)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Memory Regions
// ============================================================================

bitflags::bitflags! {
    /// Mapping attributes of a memory region
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryAttributes: u32 {
        /// Executable, read-only
        const CODE = 1 << 0;
        /// Read-only data
        const RO_DATA = 1 << 1;
        /// Read-write data
        const RW = 1 << 2;
        /// Secure world only
        const SECURE = 1 << 3;
        /// Accessible from the non-secure world
        const NON_SECURE = 1 << 4;
        /// Normal cacheable memory
        const CACHEABLE = 1 << 5;
        /// Device memory
        const DEVICE = 1 << 6;
    }
}

/// A contiguous physical memory range with mapping attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryRegion {
    /// Base address
    pub base: u64,
    /// Maximum size in bytes
    pub size: u64,
    /// Mapping attributes
    pub attributes: MemoryAttributes,
}

impl MemoryRegion {
    /// Create a new region
    #[must_use]
    pub const fn new(base: u64, size: u64, attributes: MemoryAttributes) -> Self {
        Self {
            base,
            size,
            attributes,
        }
    }

    /// Create a region without mapping attributes (placement windows)
    #[must_use]
    pub const fn window(base: u64, size: u64) -> Self {
        Self::new(base, size, MemoryAttributes::empty())
    }

    /// Exclusive end address, `None` if the region wraps the address space
    #[must_use]
    pub const fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }

    /// Check that the region is non-empty and does not wrap
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.size != 0 && self.end().is_some()
    }

    /// Check if `address` lies within the region
    #[must_use]
    pub const fn contains(&self, address: u64) -> bool {
        match self.end() {
            Some(end) => address >= self.base && address < end,
            None => address >= self.base,
        }
    }

    /// Check if `[base, base + size)` lies entirely within the region
    #[must_use]
    pub fn contains_range(&self, base: u64, size: u64) -> bool {
        if size == 0 {
            return self.contains(base);
        }
        match (base.checked_add(size - 1), self.end()) {
            (Some(last), Some(end)) => base >= self.base && last < end,
            _ => false,
        }
    }

    /// Check if two regions share at least one byte
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        let self_last = self.base.saturating_add(self.size - 1);
        let other_last = other.base.saturating_add(other.size - 1);
        self.base <= other_last && other.base <= self_last
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:08x}, +0x{:x}]", self.base, self.size)
    }
}

// ============================================================================
// Boot ROM Hand-off
// ============================================================================

/// Interface the boot ROM loaded this stage from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootInterface {
    /// No interface reported
    None,
    /// SD card
    Sd,
    /// eMMC
    Emmc,
    /// NOR flash over QSPI
    NorQspi,
    /// NAND flash over FMC
    NandFmc,
    /// Serial UART (programmer)
    SerialUart,
    /// Serial USB (programmer)
    SerialUsb,
    /// NAND flash over QSPI
    NandQspi,
    /// Code not known to this stage
    Unknown(u16),
}

impl BootInterface {
    /// Decode the boot ROM interface selector
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0x0 => Self::None,
            0x1 => Self::Sd,
            0x2 => Self::Emmc,
            0x3 => Self::NorQspi,
            0x4 => Self::NandFmc,
            0x5 => Self::SerialUart,
            0x6 => Self::SerialUsb,
            0x7 => Self::NandQspi,
            other => Self::Unknown(other),
        }
    }

    /// Encode back to the boot ROM selector
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            Self::None => 0x0,
            Self::Sd => 0x1,
            Self::Emmc => 0x2,
            Self::NorQspi => 0x3,
            Self::NandFmc => 0x4,
            Self::SerialUart => 0x5,
            Self::SerialUsb => 0x6,
            Self::NandQspi => 0x7,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Outcome of the boot ROM's own authentication of this stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Authentication not performed
    NotDone,
    /// Authentication failed
    Failed,
    /// Authentication succeeded
    Succeeded,
}

impl AuthStatus {
    /// Decode the boot ROM authentication status
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0x1 => Self::Failed,
            0x2 => Self::Succeeded,
            _ => Self::NotDone,
        }
    }
}

/// Device the later stages should fetch images from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    /// On-board storage selected by the platform configuration
    Board,
    /// USB programmer transport
    Usb,
}
