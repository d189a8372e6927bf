// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Collaborator driver contracts
//!
//! The boot core only consumes pass/fail contracts from the platform
//! drivers. Each driver is a trait object so a board bundle can mix real
//! drivers with fakes in host tests.

use bl2_common::log::LogSink;
use bl2_common::time::Micros;
use bl2_common::{BootDevice, BootInterface, ImageId, MemoryRegion};

use crate::error::HalResult;

// ============================================================================
// Register access and time
// ============================================================================

/// 32-bit memory-mapped register access
pub trait Mmio {
    /// Read a register
    fn read32(&self, address: u32) -> u32;

    /// Write a register
    fn write32(&mut self, address: u32, value: u32);

    /// Set `mask` bits
    fn set_bits(&mut self, address: u32, mask: u32) {
        let value = self.read32(address);
        self.write32(address, value | mask);
    }

    /// Clear `mask` bits
    fn clear_bits(&mut self, address: u32, mask: u32) {
        let value = self.read32(address);
        self.write32(address, value & !mask);
    }

    /// Clear `clear` bits then set `set` bits in one write
    fn clear_set_bits(&mut self, address: u32, clear: u32, set: u32) {
        let value = self.read32(address);
        self.write32(address, (value & !clear) | set);
    }
}

/// Free-running microsecond time base
pub trait TimeSource {
    /// Current time
    fn now_us(&self) -> Micros;

    /// Busy-wait for `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Busy-wait for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

// ============================================================================
// Fuses
// ============================================================================

/// Named fuse words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuseField {
    /// Anti-rollback monotonic counter
    MonotonicCounter,
}

impl FuseField {
    /// Name of the field in the platform fuse map
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MonotonicCounter => "monotonic_otp",
        }
    }
}

bitflags::bitflags! {
    /// Debug enable bits from the fuse controller
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugConfig: u32 {
        /// Hardware debug port
        const HDPEN = 1 << 4;
        /// Secure invasive debug
        const SPIDEN = 1 << 5;
        /// Secure non-invasive debug
        const SPINDEN = 1 << 6;
        /// Software debug enable
        const DBGSWGEN = 1 << 10;
    }
}

impl DebugConfig {
    /// Check whether any debug access is open
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.is_empty()
    }
}

/// Fuse/OTP storage controller
pub trait FuseStorage {
    /// Probe the controller
    fn probe(&mut self) -> HalResult<()>;

    /// Word index of a named field
    fn read_index(&self, field: FuseField) -> HalResult<u32>;

    /// Current value of a named field
    fn read_value(&self, field: FuseField) -> HalResult<u32>;

    /// Program `value` bits into word `index` (one-way: bits only go 0 to 1)
    fn program(&mut self, value: u32, index: u32) -> HalResult<()>;

    /// Debug enable configuration
    fn read_debug_config(&self) -> DebugConfig;

    /// Device is fused closed (production-locked)
    fn is_closed_device(&self) -> bool;
}

// ============================================================================
// Translation tables
// ============================================================================

/// Translation table builder
pub trait Mmu {
    /// Add a static region (installed by [`Mmu::enable`])
    fn add_region(&mut self, region: &MemoryRegion) -> HalResult<()>;

    /// Map a region into the already-enabled tables
    fn add_dynamic_region(&mut self, region: &MemoryRegion) -> HalResult<()>;

    /// Install the tables and enable translation
    fn enable(&mut self) -> HalResult<()>;
}

// ============================================================================
// Platform configuration
// ============================================================================

/// Clock identifier in the platform clock tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockId(pub u32);

impl ClockId {
    /// Backup SRAM clock gate
    pub const BACKUP_SRAM: Self = Self(u32::MAX);
}

/// Reset line identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetId(pub u32);

/// Status of a configuration node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Enabled for the secure world
    Secure,
    /// Enabled for the non-secure world
    NonSecure,
    /// Disabled
    Disabled,
}

/// Console UART node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartNode {
    /// Register base
    pub base: u32,
    /// Kernel clock
    pub clock: Option<ClockId>,
    /// Reset line
    pub reset: Option<ResetId>,
    /// Node status
    pub status: NodeStatus,
}

/// Firmware-config entry for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynConfig {
    /// Load address
    pub address: u64,
    /// Maximum size
    pub max_size: u64,
}

/// CPU frequency/voltage pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingPoint {
    /// Frequency in kHz
    pub freq_khz: u32,
    /// CPU supply voltage in mV
    pub voltage_mv: u16,
}

/// Parsed platform configuration tree
pub trait ConfigSource {
    /// Open the preloaded configuration tree and check its header
    fn open_and_check(&mut self) -> HalResult<()>;

    /// DRAM size in bytes (0 if absent)
    fn dram_size(&self) -> u64;

    /// Power-management IC is declared and enabled
    fn pmic_present(&self) -> bool;

    /// PLL1 settings are fixed by configuration
    fn pll1_predefined(&self) -> bool;

    /// Highest supported operating point
    fn max_opp(&self) -> HalResult<OperatingPoint>;

    /// Name of the CPU supply regulator
    fn cpu_supply_name(&self) -> Option<&'static str>;

    /// Console UART node
    fn stdout_uart(&self) -> HalResult<UartNode>;

    /// Apply the console pin configuration
    fn set_stdout_pinctrl(&mut self) -> HalResult<()>;

    /// Board model string
    fn board_model(&self) -> Option<&str>;

    /// Populate the firmware configuration from the blob in `window`
    fn populate_fw_config(&mut self, window: &MemoryRegion) -> HalResult<()>;

    /// Firmware-config entry for `image`
    fn image_config(&self, image: ImageId) -> Option<DynConfig>;
}

// ============================================================================
// Drivers
// ============================================================================

/// Clock tree driver
pub trait ClockDriver {
    /// Probe the RCC
    fn probe(&mut self) -> HalResult<()>;

    /// Initialize the tree; `freq_khz == 0` keeps the predefined PLL1 setting
    fn init(&mut self, freq_khz: u32) -> HalResult<()>;

    /// Enable a clock gate
    fn enable(&mut self, clock: ClockId);

    /// Rate of a clock in Hz
    fn rate(&self, clock: ClockId) -> u32;

    /// Highest operating point restored from the low-power context
    fn max_freq_opp(&self) -> HalResult<OperatingPoint>;
}

/// Power-management IC driver
pub trait PmicDriver {
    /// Initialize the PMIC link
    fn initialize(&mut self) -> HalResult<()>;

    /// Apply the regulator configuration (cold boot)
    fn configure(&mut self) -> HalResult<()>;

    /// Voltage of regulator `rail`
    fn voltage_mv(&self, rail: &str) -> HalResult<u16>;

    /// Set voltage of regulator `rail`
    fn set_voltage_mv(&mut self, rail: &str, voltage_mv: u16) -> HalResult<()>;

    /// PMIC silicon version
    fn version(&self) -> HalResult<u8>;
}

/// Reset controller
pub trait ResetController {
    /// Assert `line`, waiting at most `timeout_us` for it to take effect
    fn assert(&mut self, line: ResetId, timeout_us: u32) -> HalResult<()>;

    /// Deassert `line`, waiting at most `timeout_us`
    fn deassert(&mut self, line: ResetId, timeout_us: u32) -> HalResult<()>;
}

/// Console UART
pub trait UartConsole: LogSink {
    /// Register base of UART instance `instance` (1-based), if it exists
    fn instance_base(&self, instance: u16) -> Option<u32>;

    /// Stop the UART at `base` (programmer transport)
    fn stop(&mut self, base: u32);

    /// Register the UART at `base` as console
    fn register(&mut self, base: u32, clock_rate: u32, baudrate: u32) -> HalResult<()>;
}

/// Independent watchdog
pub trait WatchdogDriver {
    /// Initialize the watchdog
    fn init(&mut self) -> HalResult<()>;

    /// Refresh the counter
    fn refresh(&mut self);

    /// Freeze the secondary channel while the debugger halts the core
    fn freeze_secondary(&mut self) -> HalResult<()>;
}

/// Context retained in always-on memory across standby
pub trait BackupContext {
    /// Boot is an exit from standby
    fn wakeup_from_standby(&self) -> bool;

    /// Restore PLL1 settings saved before standby
    fn restore_pll_settings(&mut self) -> HalResult<()>;

    /// Save the boot interface for later stages
    fn save_boot_interface(&mut self, interface: BootInterface, instance: u16) -> HalResult<()>;

    /// TEE resume entry point saved before standby
    fn tee_entry_point(&self) -> u64;

    /// Save this stage's parameters for the resume path
    fn save_stage_params(&mut self) -> HalResult<()>;

    /// Erase the saved context
    fn clean(&mut self);
}

/// Bus firewall and memory partitioning
pub trait SecurityController {
    /// Early partitioning applied during bring-up
    fn arch_security_setup(&mut self) -> HalResult<()>;

    /// Final partitioning applied before leaving the stage
    fn security_setup(&mut self) -> HalResult<()>;
}

/// DRAM controller
pub trait DramDriver {
    /// Probe and initialize the controller
    fn probe(&mut self) -> HalResult<()>;

    /// DRAM contents were preserved in self-refresh across standby
    fn is_restored(&self) -> bool;
}

/// Storage setup for the image loader
pub trait IoSetup {
    /// Prepare the IO layer to fetch images from `device`
    fn setup(&mut self, device: BootDevice) -> HalResult<()>;
}

/// Data cache maintenance
pub trait CacheMaintenance {
    /// Clean and invalidate `[base, base + size)`
    fn flush_dcache_range(&mut self, base: u64, size: u64);
}

/// Read access to loaded image bytes
pub trait ImageMemory {
    /// `len` bytes at `address`, `None` if not readable
    fn bytes(&self, address: u64, len: usize) -> Option<&[u8]>;
}

/// Terminal halt
pub trait Halt {
    /// Stop execution permanently
    fn halt(&mut self, code: u16) -> !;
}
