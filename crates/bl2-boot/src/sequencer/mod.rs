// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Platform bring-up sequencer
//!
//! Runs the early hardware initialization in a fixed order. Each step is
//! started through the [`StepLedger`], so a step whose prerequisites have
//! not completed cannot run.
//!
//! # Failure policy
//!
//! - A fatal error stops the sequence. The step and error are returned and
//!   nothing after the failed step runs.
//! - A degraded error (console, debug freeze, context save, PMIC status) is
//!   logged and recorded in the [`BringUpReport`]; the step still completes.

mod clock;
mod console;
mod platform;
mod power;
mod steps;

pub use steps::{Step, StepLedger, STEP_COUNT};

use core::fmt;

use bl2_common::version::MonotonicVersion;
use bl2_common::{log_error, log_info, log_warn};
use bl2_common::{Bl2Config, Error, MemoryAttributes, MemoryRegion, Result, TeeLayout};
use bl2_hal::stm32mp1::regs::RCC_MP_RSTSCLRR;
use bl2_hal::Halt;
use heapless::Vec;

use crate::board::Board;
use crate::context::{BootContext, RawBootContext, StageState};
use crate::memory::MemoryMap;
use crate::report::{print_debug_banner, print_reset_reason, DebugPortState, ResetReason};
use crate::rollback::{update_monotonic_counter, CounterUpdate};

const MODULE: &str = "bl2";

/// Maximum number of degraded outcomes recorded
pub const MAX_DEGRADED: usize = 8;

/// A step failed and bring-up stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalError {
    /// Step that failed
    pub step: Step,
    /// Failure
    pub error: Error,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Observations collected during bring-up
#[derive(Debug, Clone, Default)]
pub struct BringUpReport {
    /// Decoded last reset cause
    pub reset_reason: Option<ResetReason>,
    /// Debug port state
    pub debug_port: Option<DebugPortState>,
    /// Monotonic counter outcome
    pub counter: Option<CounterUpdate>,
    /// Non-fatal failures, in occurrence order
    pub degraded: Vec<(Step, Error), MAX_DEGRADED>,
}

impl BringUpReport {
    /// Check whether `error` was recorded as degraded
    #[must_use]
    pub fn has_degraded(&self, error: Error) -> bool {
        self.degraded.iter().any(|(_, e)| *e == error)
    }
}

/// Bring-up sequencer
pub struct Sequencer {
    config: Bl2Config,
    state: StageState,
    ledger: StepLedger,
    memory_map: MemoryMap,
    report: BringUpReport,
}

impl Sequencer {
    /// Create a sequencer for this boot
    #[must_use]
    pub fn new(config: Bl2Config, boot_context: BootContext) -> Self {
        let mut state = StageState::new(boot_context);
        state.log.set_min_level(config.log_level);
        Self {
            config,
            state,
            ledger: StepLedger::new(),
            memory_map: MemoryMap::new(),
            report: BringUpReport::default(),
        }
    }

    /// Create a sequencer from the boot ROM structure
    #[must_use]
    pub fn from_raw_context(config: Bl2Config, raw: &RawBootContext) -> Self {
        Self::new(config, BootContext::from_raw(raw))
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &Bl2Config {
        &self.config
    }

    /// Stage state
    #[must_use]
    pub const fn state(&self) -> &StageState {
        &self.state
    }

    /// Mutable stage state
    pub fn state_mut(&mut self) -> &mut StageState {
        &mut self.state
    }

    /// Step ledger
    #[must_use]
    pub const fn ledger(&self) -> &StepLedger {
        &self.ledger
    }

    /// Installed memory map
    #[must_use]
    pub const fn memory_map(&self) -> &MemoryMap {
        &self.memory_map
    }

    /// Bring-up observations
    #[must_use]
    pub const fn report(&self) -> &BringUpReport {
        &self.report
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Run the architecture setup phase
    ///
    /// # Errors
    ///
    /// Returns the first fatal step failure.
    pub fn arch_setup(&mut self, board: &mut Board<'_>) -> core::result::Result<(), FatalError> {
        self.run_step(board, Step::FuseProbe, Self::probe_fuses)?;
        self.run_step(board, Step::MemoryProtection, Self::protect_memory)?;
        self.run_step(board, Step::ConfigTree, Self::open_config_tree)?;
        self.run_step(board, Step::PowerDomain, Self::normalize_power_domain)?;
        self.run_step(board, Step::ClockTree, Self::setup_clock_tree)?;
        self.run_step(board, Step::OperatingPoint, Self::select_operating_point)?;
        self.run_step(board, Step::Console, Self::select_console)?;
        self.run_step(board, Step::Watchdog, Self::start_watchdog)?;
        self.run_step(board, Step::DebugPolicy, Self::apply_debug_policy)?;
        self.run_step(board, Step::BootInterfacePersist, Self::persist_boot_interface)?;
        self.run_step(board, Step::SecurityPartition, Self::partition_security)?;
        self.run_step(board, Step::ResetReason, Self::report_reset_reason)?;
        self.run_step(board, Step::AntiRollback, Self::enforce_anti_rollback)?;
        self.run_step(board, Step::PmicRefresh, Self::refresh_pmic)?;
        self.run_step(board, Step::IoSetup, Self::setup_io)?;
        Ok(())
    }

    /// Run the platform setup phase
    ///
    /// # Errors
    ///
    /// Returns the first fatal step failure.
    pub fn platform_setup(
        &mut self,
        board: &mut Board<'_>,
    ) -> core::result::Result<(), FatalError> {
        self.run_step(board, Step::DramProbe, Self::probe_dram)?;
        self.run_step(board, Step::DramMapping, Self::map_dram)?;
        Ok(())
    }

    /// Run both phases
    ///
    /// # Errors
    ///
    /// Returns the first fatal step failure.
    pub fn run(&mut self, board: &mut Board<'_>) -> core::result::Result<(), FatalError> {
        self.arch_setup(board)?;
        self.platform_setup(board)
    }

    /// Run both phases and halt the platform on a fatal failure
    pub fn run_or_halt(&mut self, board: &mut Board<'_>, halt: &mut dyn Halt) {
        if let Err(fatal) = self.run(board) {
            halt.halt(fatal.error.code());
        }
    }

    /// Final security setup before leaving the stage
    ///
    /// # Errors
    ///
    /// Returns `Error::SecurityPartitionFailed` if the bus firewall could not
    /// be configured.
    pub fn prepare_exit(&mut self, board: &mut Board<'_>) -> core::result::Result<(), FatalError> {
        self.run_step(board, Step::PrepareExit, |_, board| {
            board
                .security
                .security_setup()
                .map_err(|_| Error::SecurityPartitionFailed)
        })
    }

    // ========================================================================
    // Step execution
    // ========================================================================

    fn run_step<'b, F>(
        &mut self,
        board: &mut Board<'b>,
        step: Step,
        action: F,
    ) -> core::result::Result<(), FatalError>
    where
        F: FnOnce(&mut Self, &mut Board<'b>) -> Result<()>,
    {
        if let Err(error) = self.ledger.begin(step) {
            log_error!(self.state.log, MODULE, "{} started out of order", step);
            self.flush_console(board);
            return Err(FatalError { step, error });
        }

        match action(self, board) {
            Ok(()) => {}
            Err(error) if !error.is_fatal() => self.degrade(step, error),
            Err(error) => {
                log_error!(self.state.log, MODULE, "{}: {}", step, error);
                self.flush_console(board);
                return Err(FatalError { step, error });
            }
        }

        self.ledger.complete(step);
        self.flush_console(board);
        Ok(())
    }

    fn degrade(&mut self, step: Step, error: Error) {
        log_warn!(self.state.log, MODULE, "{}: {}", step, error);
        // Beyond capacity the log line is the only record
        let _ = self.report.degraded.push((step, error));
    }

    fn flush_console(&mut self, board: &mut Board<'_>) {
        if self.state.console().is_some() {
            self.state.log.flush(&mut *board.uart);
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    fn probe_fuses(&mut self, board: &mut Board<'_>) -> Result<()> {
        board.fuses.probe().map_err(|_| Error::FuseProbeFailed)
    }

    fn protect_memory(&mut self, board: &mut Board<'_>) -> Result<()> {
        let layout = self.config.layout;
        self.memory_map.add_region(layout.bl2);
        self.memory_map.add_region(layout.dtb);
        self.memory_map.add_region(MemoryRegion::new(
            layout.fw_config.base,
            layout.fw_config.size,
            MemoryAttributes::RO_DATA | MemoryAttributes::SECURE,
        ));
        self.memory_map
            .install(board.mmu)
            .map_err(|_| Error::MmuConfigFailed)
    }

    fn open_config_tree(&mut self, board: &mut Board<'_>) -> Result<()> {
        board
            .config
            .open_and_check()
            .map_err(|_| Error::ConfigTreeInvalid)
    }

    fn start_watchdog(&mut self, board: &mut Board<'_>) -> Result<()> {
        board
            .watchdog
            .init()
            .map_err(|_| Error::WatchdogInitFailed)?;
        board.watchdog.refresh();
        Ok(())
    }

    fn apply_debug_policy(&mut self, board: &mut Board<'_>) -> Result<()> {
        let state = DebugPortState {
            open: board.fuses.read_debug_config().is_open(),
            closed_device: board.fuses.is_closed_device(),
        };
        self.report.debug_port = Some(state);

        if state.open {
            if let Err(e) = board.watchdog.freeze_secondary() {
                log_info!(self.state.log, MODULE, "IWDG2 freeze error : {}", e);
                self.degrade(Step::DebugPolicy, Error::DebugFreezeFailed);
            }
            if state.closed_device {
                print_debug_banner(&mut self.state.log);
            }
        }
        Ok(())
    }

    fn persist_boot_interface(&mut self, board: &mut Board<'_>) -> Result<()> {
        let ctx = *self.state.boot_context();
        board
            .backup
            .save_boot_interface(ctx.interface, ctx.instance)
            .map_err(|_| Error::ContextSaveFailed)
    }

    fn partition_security(&mut self, board: &mut Board<'_>) -> Result<()> {
        board
            .security
            .arch_security_setup()
            .map_err(|_| Error::SecurityPartitionFailed)
    }

    fn report_reset_reason(&mut self, board: &mut Board<'_>) -> Result<()> {
        let rstsr = board.mmio.read32(RCC_MP_RSTSCLRR);
        self.report.reset_reason = Some(print_reset_reason(rstsr, &mut self.state.log));
        Ok(())
    }

    fn enforce_anti_rollback(&mut self, board: &mut Board<'_>) -> Result<()> {
        let version: MonotonicVersion = self.config.firmware_version;
        let update = update_monotonic_counter(board.fuses, version, &mut self.state.log)?;
        self.report.counter = Some(update);
        Ok(())
    }

    fn refresh_pmic(&mut self, board: &mut Board<'_>) -> Result<()> {
        if !board.config.pmic_present() {
            return Ok(());
        }
        board
            .pmic
            .initialize()
            .map_err(|_| Error::PmicStatusUnavailable)?;
        let version = board
            .pmic
            .version()
            .map_err(|_| Error::PmicStatusUnavailable)?;
        log_info!(self.state.log, MODULE, "PMIC version = 0x{:02x}", version);
        Ok(())
    }

    fn setup_io(&mut self, board: &mut Board<'_>) -> Result<()> {
        if self.config.tee_layout == TeeLayout::DramTop && board.dram.is_restored() {
            return Ok(());
        }
        let device = self.state.boot_device();
        board.io.setup(device).map_err(|_| Error::IoSetupFailed)
    }
}
