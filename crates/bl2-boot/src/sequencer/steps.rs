// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Bring-up steps and their ordering ledger

use core::fmt;

use bl2_common::{Error, Result};
use heapless::Vec;

/// Number of bring-up steps
pub const STEP_COUNT: usize = 18;

/// Bring-up steps in nominal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Step {
    /// Probe the fuse controller
    FuseProbe,
    /// Map the stage's own regions and enable translation
    MemoryProtection,
    /// Open the platform configuration tree
    ConfigTree,
    /// Normalize power-domain registers
    PowerDomain,
    /// Classify the boot device and probe the clock tree
    ClockTree,
    /// Select the CPU operating point and initialize clocks
    OperatingPoint,
    /// Bring up the console
    Console,
    /// Start and refresh the independent watchdog
    Watchdog,
    /// Evaluate the debug port policy
    DebugPolicy,
    /// Persist the boot interface
    BootInterfacePersist,
    /// Apply bus security partitioning
    SecurityPartition,
    /// Report the last reset reason
    ResetReason,
    /// Enforce the monotonic counter
    AntiRollback,
    /// Re-initialize the PMIC and report its status
    PmicRefresh,
    /// Prepare the image loader IO layer
    IoSetup,
    /// Probe DRAM
    DramProbe,
    /// Map DRAM for payload loading
    DramMapping,
    /// Final security setup before leaving the stage
    PrepareExit,
}

impl Step {
    /// Every step in nominal order
    pub const ALL: [Step; STEP_COUNT] = [
        Self::FuseProbe,
        Self::MemoryProtection,
        Self::ConfigTree,
        Self::PowerDomain,
        Self::ClockTree,
        Self::OperatingPoint,
        Self::Console,
        Self::Watchdog,
        Self::DebugPolicy,
        Self::BootInterfacePersist,
        Self::SecurityPartition,
        Self::ResetReason,
        Self::AntiRollback,
        Self::PmicRefresh,
        Self::IoSetup,
        Self::DramProbe,
        Self::DramMapping,
        Self::PrepareExit,
    ];

    const fn bit(self) -> u32 {
        1 << self as u8
    }

    /// Steps that must have completed before this one starts
    #[must_use]
    pub const fn prerequisites(self) -> &'static [Step] {
        match self {
            Self::FuseProbe => &[],
            Self::MemoryProtection => &[Self::FuseProbe],
            Self::ConfigTree => &[Self::MemoryProtection],
            Self::PowerDomain => &[Self::ConfigTree],
            Self::ClockTree => &[Self::PowerDomain],
            Self::OperatingPoint => &[Self::ClockTree, Self::ConfigTree],
            Self::Console => &[Self::OperatingPoint],
            Self::Watchdog => &[Self::ClockTree],
            Self::DebugPolicy => &[Self::FuseProbe, Self::Watchdog],
            Self::BootInterfacePersist => &[Self::PowerDomain],
            Self::SecurityPartition => &[Self::DebugPolicy],
            Self::ResetReason => &[Self::ConfigTree],
            Self::AntiRollback => &[Self::FuseProbe],
            Self::PmicRefresh => &[Self::OperatingPoint],
            Self::IoSetup => &[Self::SecurityPartition, Self::AntiRollback],
            Self::DramProbe => &[Self::ClockTree],
            Self::DramMapping => &[Self::DramProbe, Self::MemoryProtection],
            Self::PrepareExit => &[Self::IoSetup, Self::DramMapping],
        }
    }

    /// Short name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FuseProbe => "fuse probe",
            Self::MemoryProtection => "memory protection",
            Self::ConfigTree => "config tree",
            Self::PowerDomain => "power domain",
            Self::ClockTree => "clock tree",
            Self::OperatingPoint => "operating point",
            Self::Console => "console",
            Self::Watchdog => "watchdog",
            Self::DebugPolicy => "debug policy",
            Self::BootInterfacePersist => "boot interface",
            Self::SecurityPartition => "security partition",
            Self::ResetReason => "reset reason",
            Self::AntiRollback => "anti-rollback",
            Self::PmicRefresh => "PMIC refresh",
            Self::IoSetup => "IO setup",
            Self::DramProbe => "DRAM probe",
            Self::DramMapping => "DRAM mapping",
            Self::PrepareExit => "prepare exit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record of started and completed steps
///
/// A step may start once, and only after all its prerequisites completed.
#[derive(Debug, Default)]
pub struct StepLedger {
    started: u32,
    completed: u32,
    order: Vec<Step, STEP_COUNT>,
}

impl StepLedger {
    /// Empty ledger
    #[must_use]
    pub const fn new() -> Self {
        Self {
            started: 0,
            completed: 0,
            order: Vec::new(),
        }
    }

    /// First prerequisite of `step` that has not completed
    #[must_use]
    pub fn missing_prerequisite(&self, step: Step) -> Option<Step> {
        step.prerequisites()
            .iter()
            .copied()
            .find(|p| !self.is_complete(*p))
    }

    /// Start `step`
    ///
    /// # Errors
    ///
    /// Returns `Error::StepOrderViolation` if the step already started or a
    /// prerequisite has not completed.
    pub fn begin(&mut self, step: Step) -> Result<()> {
        if self.started & step.bit() != 0 || self.missing_prerequisite(step).is_some() {
            return Err(Error::StepOrderViolation);
        }
        self.started |= step.bit();
        Ok(())
    }

    /// Mark a started step complete
    pub fn complete(&mut self, step: Step) {
        if self.started & step.bit() == 0 || self.is_complete(step) {
            return;
        }
        self.completed |= step.bit();
        // Cannot overflow: each step completes at most once
        let _ = self.order.push(step);
    }

    /// Check whether `step` completed
    #[must_use]
    pub const fn is_complete(&self, step: Step) -> bool {
        self.completed & step.bit() != 0
    }

    /// Completed steps in completion order
    #[must_use]
    pub fn completed(&self) -> &[Step] {
        &self.order
    }
}
