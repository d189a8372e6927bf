// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot device classification, clock tree and CPU operating point

use bl2_common::{log_debug, BootDevice, Error, Result};

use super::{Sequencer, MODULE};
use crate::board::Board;

impl Sequencer {
    pub(super) fn setup_clock_tree(&mut self, board: &mut Board<'_>) -> Result<()> {
        let ctx = *self.state.boot_context();

        // The programmer UART must not keep running under the console
        if self.config.uart_programmer && ctx.is_serial_uart() {
            if let Some(base) = board.uart.instance_base(ctx.instance) {
                board.uart.stop(base);
            }
        }

        let device = if self.config.usb_programmer && ctx.is_serial_usb() {
            BootDevice::Usb
        } else {
            BootDevice::Board
        };
        self.state.set_boot_device(device)?;

        board.clock.probe().map_err(|_| Error::ClockInitFailed)
    }

    /// Pick the CPU frequency, adjust the supply, then start the clocks
    ///
    /// After a standby exit the PLL settings saved before suspend are
    /// restored and the maximum operating point comes from the clock driver
    /// rather than the configuration tree.
    pub(super) fn select_operating_point(&mut self, board: &mut Board<'_>) -> Result<()> {
        let pmic = board.config.pmic_present();
        if pmic {
            board.pmic.initialize().map_err(|_| Error::PmicError)?;
        }

        let standby = board.backup.wakeup_from_standby();
        if standby {
            board
                .backup
                .restore_pll_settings()
                .map_err(|_| Error::OperatingPointUnavailable)?;
        }

        let mut freq_khz = 0;
        if !board.config.pll1_predefined() {
            let opp = if standby {
                board.clock.max_freq_opp()
            } else {
                board.config.max_opp()
            }
            .map_err(|_| Error::OperatingPointUnavailable)?;

            if pmic {
                self.apply_cpu_voltage(board, opp.voltage_mv)?;
            }
            freq_khz = opp.freq_khz;
        }

        board.clock.init(freq_khz).map_err(|_| Error::ClockInitFailed)
    }

    fn apply_cpu_voltage(&mut self, board: &mut Board<'_>, voltage_mv: u16) -> Result<()> {
        let rail = board.config.cpu_supply_name().ok_or(Error::PmicError)?;
        let current = board.pmic.voltage_mv(rail).map_err(|_| Error::PmicError)?;
        if current == voltage_mv {
            return Ok(());
        }
        log_debug!(
            self.state.log,
            MODULE,
            "{}: {} mV -> {} mV",
            rail,
            current,
            voltage_mv
        );
        board
            .pmic
            .set_voltage_mv(rail, voltage_mv)
            .map_err(|_| Error::PmicError)
    }
}
