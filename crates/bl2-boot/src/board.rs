// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Driver bundle lent to the boot core

use bl2_hal::{
    BackupContext, CacheMaintenance, ClockDriver, ConfigSource, DramDriver, FuseStorage,
    ImageMemory, IoSetup, Mmio, Mmu, PmicDriver, ResetController, SecurityController,
    TimeSource, UartConsole, WatchdogDriver,
};

/// Every collaborator the boot stage talks to
///
/// The core owns no hardware state; it only orchestrates calls through
/// these handles.
pub struct Board<'a> {
    /// Register access
    pub mmio: &'a mut dyn Mmio,
    /// Microsecond time base
    pub timer: &'a mut dyn TimeSource,
    /// Fuse controller
    pub fuses: &'a mut dyn FuseStorage,
    /// Translation tables
    pub mmu: &'a mut dyn Mmu,
    /// Platform configuration tree
    pub config: &'a mut dyn ConfigSource,
    /// Clock tree
    pub clock: &'a mut dyn ClockDriver,
    /// Power-management IC
    pub pmic: &'a mut dyn PmicDriver,
    /// Reset controller
    pub reset: &'a mut dyn ResetController,
    /// Console and programmer UARTs
    pub uart: &'a mut dyn UartConsole,
    /// Independent watchdog
    pub watchdog: &'a mut dyn WatchdogDriver,
    /// Always-on context
    pub backup: &'a mut dyn BackupContext,
    /// Bus firewall
    pub security: &'a mut dyn SecurityController,
    /// DRAM controller
    pub dram: &'a mut dyn DramDriver,
    /// Image loader IO layer
    pub io: &'a mut dyn IoSetup,
    /// Data cache maintenance
    pub cache: &'a mut dyn CacheMaintenance,
    /// Loaded image bytes
    pub images: &'a dyn ImageMemory,
}
