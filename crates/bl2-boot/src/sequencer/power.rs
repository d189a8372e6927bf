// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Power-domain normalization

use bl2_common::constants::{PWRLP_TEMPO_5_HSI, TAMP_BKP_SEC_NUMBER};
use bl2_common::{Error, Result};
use bl2_hal::stm32mp1::regs::{
    PWR_CR1, PWR_CR1_DBP, PWR_CR2, PWR_CR2_BREN, PWR_CR2_RREN, PWR_MCUCR, PWR_MCUCR_PDDS,
    RCC_BDCR, RCC_BDCR_RTCSRC_MASK, RCC_BDCR_VSWRST, RCC_MP_SREQCLRR, RCC_MP_SREQCLRR_STPREQ_P0,
    RCC_MP_SREQCLRR_STPREQ_P1, RCC_PWRLPDLYCR, RCC_PWRLPDLYCR_PWRLP_DLY_MASK, RCC_TZCR,
    RCC_TZCR_MCKPROT, TAMP_BKP_SEC_RWDPROT_SHIFT, TAMP_BKP_SEC_WDPROT_SHIFT, TAMP_SMCR,
};
use bl2_hal::{wait_for_bits, BitState};

use super::Sequencer;
use crate::board::Board;

impl Sequencer {
    /// Put the power and backup domains in a known state
    ///
    /// Register writes happen in this order: stop-request clear, backup
    /// domain write access, deep-sleep select, optional backup domain reset,
    /// power-down delay, backup regulators off, MCU clock protection off,
    /// backup register secure zones.
    pub(super) fn normalize_power_domain(&mut self, board: &mut Board<'_>) -> Result<()> {
        let timeout = self.config.power_timeout_us;

        // Clear stop requests left by the ROM
        board.mmio.write32(
            RCC_MP_SREQCLRR,
            RCC_MP_SREQCLRR_STPREQ_P0 | RCC_MP_SREQCLRR_STPREQ_P1,
        );

        board.mmio.set_bits(PWR_CR1, PWR_CR1_DBP);
        wait_for_bits(
            &*board.mmio,
            &*board.timer,
            PWR_CR1,
            PWR_CR1_DBP,
            BitState::Set,
            timeout,
        )
        .map_err(|_| Error::Timeout)?;

        board.mmio.set_bits(PWR_MCUCR, PWR_MCUCR_PDDS);

        // No RTC clock selected: the backup domain was never initialized
        if board.mmio.read32(RCC_BDCR) & RCC_BDCR_RTCSRC_MASK == 0 {
            board.mmio.set_bits(RCC_BDCR, RCC_BDCR_VSWRST);
            wait_for_bits(
                &*board.mmio,
                &*board.timer,
                RCC_BDCR,
                RCC_BDCR_VSWRST,
                BitState::Set,
                timeout,
            )
            .map_err(|_| Error::Timeout)?;
            board.mmio.clear_bits(RCC_BDCR, RCC_BDCR_VSWRST);
        }

        board.mmio.clear_set_bits(
            RCC_PWRLPDLYCR,
            RCC_PWRLPDLYCR_PWRLP_DLY_MASK,
            PWRLP_TEMPO_5_HSI,
        );
        board.mmio.clear_bits(PWR_CR2, PWR_CR2_BREN | PWR_CR2_RREN);
        board.mmio.clear_bits(RCC_TZCR, RCC_TZCR_MCKPROT);
        board.mmio.write32(
            TAMP_SMCR,
            (TAMP_BKP_SEC_NUMBER << TAMP_BKP_SEC_WDPROT_SHIFT)
                | (TAMP_BKP_SEC_NUMBER << TAMP_BKP_SEC_RWDPROT_SHIFT),
        );
        Ok(())
    }
}
