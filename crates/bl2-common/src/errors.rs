// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the second-stage boot loader
//!
//! The boot stage knows exactly two outcomes for a failed operation:
//!
//! - **Fatal**: the boot flow halts and no further code executes. Anything that
//!   could leave memory isolation, anti-rollback or authenticated execution
//!   unsatisfied is fatal.
//! - **Degraded**: the operation is logged and boot continues with reduced
//!   diagnostics (no console, no debug freeze, no persisted boot interface).
//!
//! All errors are `no_std` compatible and carry no heap data.

use core::fmt;

/// Result type alias for boot loader operations
pub type Result<T> = core::result::Result<T, Error>;

/// How the boot flow reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Halt the boot process immediately
    Fatal,
    /// Log and continue with reduced capability
    Degraded,
}

/// Unified error type for the boot loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Hardware Bring-up Errors (0x01xx)
    // =========================================================================
    /// Fuse/OTP controller could not be probed
    FuseProbeFailed,
    /// Fuse word or index could not be read
    FuseReadFailed,
    /// Programming a fuse word failed
    FuseProgramFailed,
    /// Translation table setup failed
    MmuConfigFailed,
    /// Platform configuration tree is missing or malformed
    ConfigTreeInvalid,
    /// Clock tree probe or initialization failed
    ClockInitFailed,
    /// No usable CPU operating point could be determined
    OperatingPointUnavailable,
    /// Power-management IC access failed
    PmicError,
    /// A reset line did not change state in time
    ResetLineTimeout,
    /// Independent watchdog initialization failed
    WatchdogInitFailed,
    /// Console transport registration failed
    ConsoleRegistrationFailed,
    /// Memory/bus security partitioning failed
    SecurityPartitionFailed,
    /// DRAM controller probe failed
    DramInitFailed,
    /// DRAM could not be mapped for payload loading
    DramMappingFailed,
    /// Storage/IO setup for image loading failed
    IoSetupFailed,
    /// A hardware register did not reach its expected state in time
    Timeout,
    /// Closed (production-locked) device booted without authentication
    AuthenticationRequired,

    // =========================================================================
    // Anti-Rollback Errors (0x02xx)
    // =========================================================================
    /// Running firmware is older than a previously recorded version
    RollbackAttempted,

    // =========================================================================
    // Image Placement Errors (0x03xx)
    // =========================================================================
    /// Image identifier is not handled at this point of the flow
    UnknownImage,
    /// Two regions with distinct purposes overlap
    RegionOverlap,
    /// Region bounds are empty or overflow the address space
    InvalidRegion,
    /// TEE container header is present but inconsistent
    TeeHeaderInvalid,
    /// No usable TEE entry point could be derived
    NoTeeEntryPoint,
    /// Fixed-capacity table is full
    TableFull,

    // =========================================================================
    // Degraded Errors (0x04xx)
    // =========================================================================
    /// Console device is disabled, unavailable or in use
    ConsoleUnavailable,
    /// Secondary watchdog channel could not be frozen
    DebugFreezeFailed,
    /// Advisory context could not be persisted
    ContextSaveFailed,
    /// PMIC status could not be reported
    PmicStatusUnavailable,

    // =========================================================================
    // Sequencing Errors (0x05xx)
    // =========================================================================
    /// A step ran before its prerequisites or ran twice
    StepOrderViolation,
    /// A stage singleton was initialized a second time
    AlreadyInitialized,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Invalid parameter provided
    InvalidParameter,
    /// Operation not supported by this platform
    NotSupported,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Hardware bring-up errors
    /// - 0x02xx: Anti-rollback errors
    /// - 0x03xx: Image placement errors
    /// - 0x04xx: Degraded (non-fatal) errors
    /// - 0x05xx: Sequencing errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::FuseProbeFailed => 0x0101,
            Self::FuseReadFailed => 0x0102,
            Self::FuseProgramFailed => 0x0103,
            Self::MmuConfigFailed => 0x0104,
            Self::ConfigTreeInvalid => 0x0105,
            Self::ClockInitFailed => 0x0106,
            Self::OperatingPointUnavailable => 0x0107,
            Self::PmicError => 0x0108,
            Self::ResetLineTimeout => 0x0109,
            Self::WatchdogInitFailed => 0x010A,
            Self::ConsoleRegistrationFailed => 0x010B,
            Self::SecurityPartitionFailed => 0x010C,
            Self::DramInitFailed => 0x010D,
            Self::DramMappingFailed => 0x010E,
            Self::IoSetupFailed => 0x010F,
            Self::Timeout => 0x0110,
            Self::AuthenticationRequired => 0x0111,

            Self::RollbackAttempted => 0x0201,

            Self::UnknownImage => 0x0301,
            Self::RegionOverlap => 0x0302,
            Self::InvalidRegion => 0x0303,
            Self::TeeHeaderInvalid => 0x0304,
            Self::NoTeeEntryPoint => 0x0305,
            Self::TableFull => 0x0306,

            Self::ConsoleUnavailable => 0x0401,
            Self::DebugFreezeFailed => 0x0402,
            Self::ContextSaveFailed => 0x0403,
            Self::PmicStatusUnavailable => 0x0404,

            Self::StepOrderViolation => 0x0501,
            Self::AlreadyInitialized => 0x0502,

            Self::InvalidParameter => 0xFF01,
            Self::NotSupported => 0xFF02,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Classify the error as fatal or degraded
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ConsoleUnavailable
            | Self::DebugFreezeFailed
            | Self::ContextSaveFailed
            | Self::PmicStatusUnavailable => Severity::Degraded,
            _ => Severity::Fatal,
        }
    }

    /// Check if this error halts the boot flow
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }

    /// Check if this is a security-critical error
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::FuseProgramFailed
                | Self::RollbackAttempted
                | Self::SecurityPartitionFailed
                | Self::RegionOverlap
                | Self::AuthenticationRequired
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FuseProbeFailed => "fuse controller probe failed",
            Self::FuseReadFailed => "fuse read failed",
            Self::FuseProgramFailed => "fuse program failed",
            Self::MmuConfigFailed => "MMU configuration failed",
            Self::ConfigTreeInvalid => "invalid platform configuration",
            Self::ClockInitFailed => "clock init failed",
            Self::OperatingPointUnavailable => "no operating point",
            Self::PmicError => "PMIC error",
            Self::ResetLineTimeout => "reset line timeout",
            Self::WatchdogInitFailed => "watchdog init failed",
            Self::ConsoleRegistrationFailed => "console registration failed",
            Self::SecurityPartitionFailed => "security partitioning failed",
            Self::DramInitFailed => "DRAM init failed",
            Self::DramMappingFailed => "DRAM mapping failed",
            Self::IoSetupFailed => "IO setup failed",
            Self::Timeout => "timeout",
            Self::AuthenticationRequired => "closed device requires authentication",
            Self::RollbackAttempted => "rollback attempted",
            Self::UnknownImage => "unknown image id",
            Self::RegionOverlap => "memory regions overlap",
            Self::InvalidRegion => "invalid memory region",
            Self::TeeHeaderInvalid => "TEE header parse error",
            Self::NoTeeEntryPoint => "no TEE entry point",
            Self::TableFull => "table full",
            Self::ConsoleUnavailable => "console unavailable",
            Self::DebugFreezeFailed => "watchdog freeze failed",
            Self::ContextSaveFailed => "context save failed",
            Self::PmicStatusUnavailable => "PMIC status unavailable",
            Self::StepOrderViolation => "bring-up step order violation",
            Self::AlreadyInitialized => "already initialized",
            Self::InvalidParameter => "invalid parameter",
            Self::NotSupported => "not supported",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}
