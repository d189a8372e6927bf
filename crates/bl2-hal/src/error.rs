// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Driver-level failures reported through the collaborator traits

use core::fmt;

/// Failure returned by a board driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Block refused to come up
    InitFailed,
    /// Polled condition never settled
    Timeout,
    /// Device or property not present
    NotPresent,
    /// Argument outside what the block accepts
    InvalidParameter,
    /// Read access failed
    ReadFailed,
    /// Program/write access failed
    ProgramFailed,
    /// Block still owned by a previous request
    Busy,
    /// Not implemented on this board
    NotSupported,
    /// Block reported an internal fault
    HardwareFault,
}

impl HalError {
    /// Numeric code in the 0x08xx driver range
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InitFailed => 0x0802,
            Self::Timeout => 0x08F1,
            Self::NotPresent => 0x0810,
            Self::InvalidParameter => 0x08F0,
            Self::ReadFailed => 0x0820,
            Self::ProgramFailed => 0x0821,
            Self::Busy => 0x08F2,
            Self::NotSupported => 0x08FF,
            Self::HardwareFault => 0x08D0,
        }
    }

    /// Short lowercase text for console output
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InitFailed => "initialization failed",
            Self::Timeout => "timeout",
            Self::NotPresent => "not present",
            Self::InvalidParameter => "invalid parameter",
            Self::ReadFailed => "read failed",
            Self::ProgramFailed => "program failed",
            Self::Busy => "busy",
            Self::NotSupported => "not supported",
            Self::HardwareFault => "hardware fault detected",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

/// Generic mapping; boot steps map driver failures to their own variants
impl From<HalError> for bl2_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::Timeout => Self::Timeout,
            HalError::InvalidParameter => Self::InvalidParameter,
            HalError::NotSupported => Self::NotSupported,
            HalError::ReadFailed => Self::FuseReadFailed,
            HalError::ProgramFailed => Self::FuseProgramFailed,
            HalError::InitFailed
            | HalError::NotPresent
            | HalError::Busy
            | HalError::HardwareFault => Self::InternalError,
        }
    }
}

/// Result of a driver call
pub type HalResult<T> = Result<T, HalError>;
