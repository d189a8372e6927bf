// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot reason and debug state reporting
//!
//! Read-only diagnostics. Nothing here changes the boot flow.

use core::fmt;

use bl2_common::log::LogBuffer;
use bl2_common::{log_error, log_info, log_notice, log_warn};
use bl2_hal::stm32mp1::regs::{
    RCC_MP_RSTSCLRR_BORRSTF, RCC_MP_RSTSCLRR_CSTDBYRSTF, RCC_MP_RSTSCLRR_HCSSRSTF,
    RCC_MP_RSTSCLRR_IWDG1RSTF, RCC_MP_RSTSCLRR_IWDG2RSTF, RCC_MP_RSTSCLRR_MCSYSRSTF,
    RCC_MP_RSTSCLRR_MPSYSRSTF, RCC_MP_RSTSCLRR_MPUP0RSTF, RCC_MP_RSTSCLRR_MPUP1RSTF,
    RCC_MP_RSTSCLRR_PADRSTF, RCC_MP_RSTSCLRR_PORRSTF, RCC_MP_RSTSCLRR_STDBYRSTF,
    RCC_MP_RSTSCLRR_VCORERSTF,
};

const MODULE: &str = "bl2";

/// Last reset cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Status register empty
    Unknown,
    /// System exit from standby
    Standby,
    /// MPU exit from CSTANDBY
    CStandby,
    /// Power-on reset
    PowerOn,
    /// Brown-out reset
    Brownout,
    /// System reset generated by the MCU
    McuSystem,
    /// Local reset generated by the MCU
    McuLocal,
    /// System reset generated by the MPU
    MpuSystem,
    /// HSE clock failure
    HseClockFailure,
    /// IWDG1 timeout
    Iwdg1,
    /// IWDG2 timeout
    Iwdg2,
    /// MPU core 0 reset
    MpuProcessor0,
    /// MPU core 1 reset
    MpuProcessor1,
    /// NRST pad
    Pad,
    /// VDDCORE failure
    VddCoreFailure,
    /// Flags set but none recognized
    Unidentified,
}

impl ResetReason {
    /// Decode `RCC_MP_RSTSCLRR`
    ///
    /// Flags are tested in priority order; the first match wins. Standby
    /// exits are only reported when the pad reset flag is clear.
    #[must_use]
    pub const fn decode(rstsr: u32) -> Self {
        const ORDER: [(u32, ResetReason); 8] = [
            (RCC_MP_RSTSCLRR_MPSYSRSTF, ResetReason::MpuSystem),
            (RCC_MP_RSTSCLRR_HCSSRSTF, ResetReason::HseClockFailure),
            (RCC_MP_RSTSCLRR_IWDG1RSTF, ResetReason::Iwdg1),
            (RCC_MP_RSTSCLRR_IWDG2RSTF, ResetReason::Iwdg2),
            (RCC_MP_RSTSCLRR_MPUP0RSTF, ResetReason::MpuProcessor0),
            (RCC_MP_RSTSCLRR_MPUP1RSTF, ResetReason::MpuProcessor1),
            (RCC_MP_RSTSCLRR_PADRSTF, ResetReason::Pad),
            (RCC_MP_RSTSCLRR_VCORERSTF, ResetReason::VddCoreFailure),
        ];

        if rstsr == 0 {
            return Self::Unknown;
        }
        let pad = rstsr & RCC_MP_RSTSCLRR_PADRSTF != 0;
        if !pad {
            if rstsr & RCC_MP_RSTSCLRR_STDBYRSTF != 0 {
                return Self::Standby;
            }
            if rstsr & RCC_MP_RSTSCLRR_CSTDBYRSTF != 0 {
                return Self::CStandby;
            }
        }
        if rstsr & RCC_MP_RSTSCLRR_PORRSTF != 0 {
            return Self::PowerOn;
        }
        if rstsr & RCC_MP_RSTSCLRR_BORRSTF != 0 {
            return Self::Brownout;
        }
        if rstsr & RCC_MP_RSTSCLRR_MCSYSRSTF != 0 {
            return if pad { Self::McuSystem } else { Self::McuLocal };
        }

        let mut i = 0;
        while i < ORDER.len() {
            if rstsr & ORDER[i].0 != 0 {
                return ORDER[i].1;
            }
            i += 1;
        }
        Self::Unidentified
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Unknown => "Reset reason unknown",
            Self::Standby => "System exits from STANDBY",
            Self::CStandby => "MPU exits from CSTANDBY",
            Self::PowerOn => "Power-on Reset (rst_por)",
            Self::Brownout => "Brownout Reset (rst_bor)",
            Self::McuSystem => "System reset generated by MCU (MCSYSRST)",
            Self::McuLocal => "Local reset generated by MCU (MCSYSRST)",
            Self::MpuSystem => "System reset generated by MPU (MPSYSRST)",
            Self::HseClockFailure => "Reset due to a clock failure on HSE",
            Self::Iwdg1 => "IWDG1 Reset (rst_iwdg1)",
            Self::Iwdg2 => "IWDG2 Reset (rst_iwdg2)",
            Self::MpuProcessor0 => "MPU Processor 0 Reset",
            Self::MpuProcessor1 => "MPU Processor 1 Reset",
            Self::Pad => "Pad Reset from NRST",
            Self::VddCoreFailure => "Reset due to a failure of VDD_CORE",
            Self::Unidentified => "Unidentified reset reason",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Decode and log the reset status register
pub fn print_reset_reason(rstsr: u32, log: &mut LogBuffer) -> ResetReason {
    let reason = ResetReason::decode(rstsr);
    match reason {
        ResetReason::Unknown => log_warn!(log, MODULE, "{}", reason),
        ResetReason::Standby | ResetReason::CStandby => {
            log_info!(log, MODULE, "Reset reason (0x{:x}):", rstsr);
            log_info!(log, MODULE, "{}", reason);
        }
        ResetReason::Unidentified => {
            log_info!(log, MODULE, "Reset reason (0x{:x}):", rstsr);
            log_error!(log, MODULE, "  {}", reason);
        }
        _ => {
            log_info!(log, MODULE, "Reset reason (0x{:x}):", rstsr);
            log_info!(log, MODULE, "  {}", reason);
        }
    }
    reason
}

/// Debug access port state observed during bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugPortState {
    /// Some debug access is enabled by fuses
    pub open: bool,
    /// Device is fused closed
    pub closed_device: bool,
}

impl DebugPortState {
    /// An open debug port on a production part
    #[must_use]
    pub const fn is_security_warning(&self) -> bool {
        self.open && self.closed_device
    }
}

/// Warning shown when a closed device boots with its debug port open
pub const DEBUG_PORT_BANNER: [&str; 12] = [
    "***************************************************",
    "** NOTICE   NOTICE   NOTICE   NOTICE   NOTICE    **",
    "**                                               **",
    "** DEBUG ACCESS PORT IS OPEN!                    **",
    "** This boot image is only for debugging purpose **",
    "** and is unsafe for production use.             **",
    "**                                               **",
    "** If you see this message and you are not       **",
    "** debugging report this immediately to your     **",
    "** vendor!                                       **",
    "**                                               **",
    "***************************************************",
];

/// Emit the debug port warning
pub fn print_debug_banner(log: &mut LogBuffer) {
    for line in DEBUG_PORT_BANNER {
        log_notice!(log, MODULE, "{}", line);
    }
}
