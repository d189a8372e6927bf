// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the STM32MP1 second-stage boot loader
//!
//! The boot core never touches a driver's internals. It consumes the
//! pass/fail contracts defined here:
//!
//! 1. **Traits**: collaborator contracts (`traits` module)
//! 2. **Poll**: bounded waits on register transitions (`poll` module)
//! 3. **Platform**: STM32MP15 register map and volatile access (`stm32mp1`)
//!
//! # Security
//!
//! - Fuse programming is one-way; the trait exposes only a raw program
//!   primitive and the caller treats any failure as fatal
//! - Every register wait is bounded by a microsecond timeout

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod traits;
pub mod error;
pub mod poll;
pub mod stm32mp1;

// Re-export main traits
pub use traits::*;
pub use error::{HalError, HalResult};
pub use poll::{poll_until, wait_for_bits, BitState};
