// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! STM32MP15 memory map and boot stage constants

// =============================================================================
// DRAM
// =============================================================================

/// DRAM base address
pub const DDR_BASE: u64 = 0xC000_0000;

/// Largest supported DRAM size
pub const DDR_MAX_SIZE: u64 = 0x4000_0000;

/// Secure DRAM reserved at the top of DRAM for the TEE (30 MB)
pub const DDR_S_SIZE: u64 = 0x01E0_0000;

/// Shared memory reserved between secure and non-secure worlds (2 MB)
pub const DDR_SHMEM_SIZE: u64 = 0x0020_0000;

// =============================================================================
// SYSRAM
// =============================================================================

/// Internal SYSRAM base
pub const SYSRAM_BASE: u64 = 0x2FFC_0000;

/// Internal SYSRAM size
pub const SYSRAM_SIZE: u64 = 0x0004_0000;

/// Fixed TEE pager window in SYSRAM
pub const OPTEE_BASE: u64 = SYSRAM_BASE;

/// Size of the fixed TEE pager window
pub const OPTEE_SIZE: u64 = 0x0001_9000;

/// Device tree blob window (loaded by the boot ROM hand-off)
pub const DTB_BASE: u64 = OPTEE_BASE + OPTEE_SIZE;

/// Device tree blob window size
pub const DTB_SIZE: u64 = 0x0000_7000;

/// This stage's own code and data
pub const BL2_BASE: u64 = DTB_BASE + DTB_SIZE;

/// End of this stage's own code and data
pub const BL2_LIMIT: u64 = FW_CONFIG_BASE;

/// Firmware configuration window (last page of SYSRAM)
pub const FW_CONFIG_BASE: u64 = SYSRAM_BASE + SYSRAM_SIZE - FW_CONFIG_MAX_SIZE;

/// Firmware configuration window size
pub const FW_CONFIG_MAX_SIZE: u64 = 0x0000_1000;

// =============================================================================
// Always-on memory
// =============================================================================

/// Backup SRAM base (retained across standby)
pub const BKPSRAM_BASE: u64 = 0x5400_0000;

/// Backup SRAM size
pub const BKPSRAM_SIZE: u64 = 0x0000_1000;

// =============================================================================
// Boot stage constants
// =============================================================================

/// Console baud rate
pub const UART_BAUDRATE: u32 = 115_200;

/// Timeout for reset line assert/deassert
pub const RESET_TIMEOUT_US: u32 = 1_000;

/// Timeout for power-domain register transitions
pub const PWR_TIMEOUT_US: u32 = 1_000;

/// Low-power exit delay programmed into RCC (in HSI periods)
pub const PWRLP_TEMPO_5_HSI: u32 = 5;

/// Number of secure backup registers in TAMP
pub const TAMP_BKP_SEC_NUMBER: u32 = 10;

/// Width of the monotonic counter fuse word in bits
pub const MAX_MONOTONIC_VALUE: u32 = 32;

/// Sentinel entry point telling the TEE the non-secure image is resuming
pub const RESUME_ENTRY_POINT: u64 = 0;
