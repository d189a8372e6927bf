// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! DRAM bring-up and mapping

use bl2_common::{log_info, Error, Result};
use bl2_hal::stm32mp1::regs::{
    tamp_bkpr, CORE1_BRANCH_ADDRESS_BKP_IDX, CORE1_MAGIC_NUMBER_BKP_IDX,
};

use super::{Sequencer, MODULE};
use crate::board::Board;

impl Sequencer {
    /// Probe DRAM; on a cold boot drop any resume state
    pub(super) fn probe_dram(&mut self, board: &mut Board<'_>) -> Result<()> {
        board.dram.probe().map_err(|_| Error::DramInitFailed)?;

        if board.dram.is_restored() {
            log_info!(self.state.log, MODULE, "DDR content restored");
            return Ok(());
        }

        // Secondary core must not branch to a stale address
        board
            .mmio
            .write32(tamp_bkpr(CORE1_BRANCH_ADDRESS_BKP_IDX), 0);
        board.mmio.write32(tamp_bkpr(CORE1_MAGIC_NUMBER_BKP_IDX), 0);
        board.backup.clean();

        if board.config.pmic_present() {
            board.pmic.configure().map_err(|_| Error::PmicError)?;
        }
        Ok(())
    }

    pub(super) fn map_dram(&mut self, board: &mut Board<'_>) -> Result<()> {
        let size = board.config.dram_size();
        if size == 0 {
            return Err(Error::DramMappingFailed);
        }
        let region = self.config.layout.dram(size);
        self.memory_map.map_dynamic(region, board.mmu)
    }
}
