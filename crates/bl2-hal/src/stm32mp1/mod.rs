// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! STM32MP15 platform support
//!
//! The register map is always available so host tests can drive the boot
//! core against a fake register file. Real volatile access is gated on the
//! `stm32mp1` feature.

pub mod regs;

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32mp1")] {
        pub mod mmio;

        pub use mmio::VolatileMmio;
    }
}
