// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! STM32MP15 register map used by the boot stage

// ============================================================================
// RCC (Reset and Clock Control)
// ============================================================================

/// RCC register base
pub const RCC_BASE: u32 = 0x5000_0000;

/// TrustZone control register
pub const RCC_TZCR: u32 = RCC_BASE + 0x000;
/// MPU stop request clear register
pub const RCC_MP_SREQCLRR: u32 = RCC_BASE + 0x104;
/// Backup domain control register
pub const RCC_BDCR: u32 = RCC_BASE + 0x140;
/// MPU reset status clear register
pub const RCC_MP_RSTSCLRR: u32 = RCC_BASE + 0x408;
/// Low-power exit delay register
pub const RCC_PWRLPDLYCR: u32 = RCC_BASE + 0x41C;

/// Secure access to MCU clock and reset registers
pub const RCC_TZCR_MCKPROT: u32 = 1 << 1;

/// Stop request for MPU core 0
pub const RCC_MP_SREQCLRR_STPREQ_P0: u32 = 1 << 0;
/// Stop request for MPU core 1
pub const RCC_MP_SREQCLRR_STPREQ_P1: u32 = 1 << 1;

/// RTC clock source selection
pub const RCC_BDCR_RTCSRC_MASK: u32 = 0x3 << 16;
/// Backup domain software reset
pub const RCC_BDCR_VSWRST: u32 = 1 << 31;

/// Low-power exit delay field
pub const RCC_PWRLPDLYCR_PWRLP_DLY_MASK: u32 = 0x003F_FFFF;

/// Power-on reset
pub const RCC_MP_RSTSCLRR_PORRSTF: u32 = 1 << 0;
/// Brown-out reset
pub const RCC_MP_RSTSCLRR_BORRSTF: u32 = 1 << 1;
/// NRST pad reset
pub const RCC_MP_RSTSCLRR_PADRSTF: u32 = 1 << 2;
/// HSE clock security system reset
pub const RCC_MP_RSTSCLRR_HCSSRSTF: u32 = 1 << 3;
/// VDDCORE failure reset
pub const RCC_MP_RSTSCLRR_VCORERSTF: u32 = 1 << 4;
/// System reset requested by the MPU
pub const RCC_MP_RSTSCLRR_MPSYSRSTF: u32 = 1 << 6;
/// System reset requested by the MCU
pub const RCC_MP_RSTSCLRR_MCSYSRSTF: u32 = 1 << 7;
/// IWDG1 reset
pub const RCC_MP_RSTSCLRR_IWDG1RSTF: u32 = 1 << 8;
/// IWDG2 reset
pub const RCC_MP_RSTSCLRR_IWDG2RSTF: u32 = 1 << 9;
/// Exit from standby
pub const RCC_MP_RSTSCLRR_STDBYRSTF: u32 = 1 << 11;
/// MPU exit from CSTANDBY
pub const RCC_MP_RSTSCLRR_CSTDBYRSTF: u32 = 1 << 12;
/// MPU core 0 reset
pub const RCC_MP_RSTSCLRR_MPUP0RSTF: u32 = 1 << 13;
/// MPU core 1 reset
pub const RCC_MP_RSTSCLRR_MPUP1RSTF: u32 = 1 << 14;

// ============================================================================
// PWR (Power Control)
// ============================================================================

/// PWR register base
pub const PWR_BASE: u32 = 0x5000_1000;

/// Control register 1
pub const PWR_CR1: u32 = PWR_BASE + 0x00;
/// Control register 2
pub const PWR_CR2: u32 = PWR_BASE + 0x08;
/// MCU mode control register
pub const PWR_MCUCR: u32 = PWR_BASE + 0x14;

/// Disable backup domain write protection
pub const PWR_CR1_DBP: u32 = 1 << 8;
/// Backup RAM retention in standby
pub const PWR_CR2_BREN: u32 = 1 << 0;
/// Retention RAM retention in standby
pub const PWR_CR2_RREN: u32 = 1 << 1;
/// Power-down deep sleep for the MCU
pub const PWR_MCUCR_PDDS: u32 = 1 << 0;

// ============================================================================
// TAMP (Tamper and backup registers)
// ============================================================================

/// TAMP register base
pub const TAMP_BASE: u32 = 0x5C00_A000;

/// Secure mode control register
pub const TAMP_SMCR: u32 = TAMP_BASE + 0x20;
/// First backup register
pub const TAMP_BKP0R: u32 = TAMP_BASE + 0x100;

/// Write-protection boundary field
pub const TAMP_BKP_SEC_WDPROT_SHIFT: u32 = 16;
/// Read/write-protection boundary field
pub const TAMP_BKP_SEC_RWDPROT_SHIFT: u32 = 0;

/// Backup register holding the secondary-core magic number
pub const CORE1_MAGIC_NUMBER_BKP_IDX: u32 = 4;
/// Backup register holding the secondary-core branch address
pub const CORE1_BRANCH_ADDRESS_BKP_IDX: u32 = 5;

/// Address of TAMP backup register `index`
#[must_use]
pub const fn tamp_bkpr(index: u32) -> u32 {
    TAMP_BKP0R + (index << 2)
}

// ============================================================================
// UART instances
// ============================================================================

/// Register base of the 1-based USART/UART `instance`
#[must_use]
pub const fn uart_base(instance: u16) -> Option<u32> {
    match instance {
        1 => Some(0x5C00_0000),
        2 => Some(0x4000_E000),
        3 => Some(0x4000_F000),
        4 => Some(0x4001_0000),
        5 => Some(0x4001_1000),
        6 => Some(0x4400_3000),
        7 => Some(0x4001_8000),
        8 => Some(0x4001_9000),
        _ => None,
    }
}
