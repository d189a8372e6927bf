// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Console bring-up

use bl2_common::{log_error, log_notice, AuthStatus, Error, Result};
use bl2_hal::{NodeStatus, ResetId};

use super::{Sequencer, MODULE};
use crate::board::Board;
use crate::context::ConsoleHandle;

/// Settle time with the UART held in reset
const UART_RESET_HOLD_US: u32 = 2;

/// Settle time after releasing the UART reset
const UART_RESET_RELEASE_MS: u32 = 1;

impl Sequencer {
    /// Bring up the console, then check the boot authentication policy
    ///
    /// A closed device must run with trusted board boot. That check is made
    /// whether or not a console came up.
    pub(super) fn select_console(&mut self, board: &mut Board<'_>) -> Result<()> {
        let outcome = self.init_console(board);

        if !self.config.trusted_board_boot && board.fuses.is_closed_device() {
            log_error!(
                self.state.log,
                MODULE,
                "Secured chip must enable trusted board boot"
            );
            return Err(Error::AuthenticationRequired);
        }
        outcome
    }

    fn init_console(&mut self, board: &mut Board<'_>) -> Result<()> {
        let ctx = *self.state.boot_context();

        let node = board
            .config
            .stdout_uart()
            .map_err(|_| Error::ConsoleUnavailable)?;
        if node.status == NodeStatus::Disabled {
            return Err(Error::ConsoleUnavailable);
        }

        // Never share the UART the programmer is talking on
        if self.config.uart_programmer
            && ctx.is_serial_uart()
            && board.uart.instance_base(ctx.instance) == Some(node.base)
        {
            return Err(Error::ConsoleUnavailable);
        }

        let (Some(clock), Some(reset)) = (node.clock, node.reset) else {
            return Err(Error::ConsoleUnavailable);
        };
        board
            .config
            .set_stdout_pinctrl()
            .map_err(|_| Error::ConsoleUnavailable)?;

        board.clock.enable(clock);
        self.reset_uart(board, reset)?;

        let clock_rate = board.clock.rate(clock);
        let baudrate = self.config.console_baudrate;
        board
            .uart
            .register(node.base, clock_rate, baudrate)
            .map_err(|_| Error::ConsoleRegistrationFailed)?;
        self.state.set_console(ConsoleHandle {
            base: node.base,
            clock_rate,
            baudrate,
        })?;

        if let Some(model) = board.config.board_model() {
            log_notice!(self.state.log, MODULE, "Model: {}", model);
        }

        if self.config.trusted_board_boot && ctx.auth_status != AuthStatus::NotDone {
            let result = if ctx.auth_status == AuthStatus::Failed {
                "failed"
            } else {
                "succeeded"
            };
            log_notice!(self.state.log, MODULE, "Bootrom authentication {}", result);
        }
        Ok(())
    }

    fn reset_uart(&mut self, board: &mut Board<'_>, line: ResetId) -> Result<()> {
        let timeout = self.config.reset_timeout_us;
        board
            .reset
            .assert(line, timeout)
            .map_err(|_| Error::ResetLineTimeout)?;
        board.timer.delay_us(UART_RESET_HOLD_US);
        board
            .reset
            .deassert(line, timeout)
            .map_err(|_| Error::ResetLineTimeout)?;
        board.timer.delay_ms(UART_RESET_RELEASE_MS);
        Ok(())
    }
}
