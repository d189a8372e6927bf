// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common definitions for the STM32MP1 second-stage boot loader
//!
//! This crate provides the error type, log buffer, shared data model and
//! build-time configuration used by the HAL contracts and the boot core.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting of errors and log levels
//!
//! No heap allocations are performed - all buffers use fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod types;
pub mod errors;
pub mod config;
pub mod log;
pub mod constants;
pub mod time;
pub mod version;
pub mod once;

// Re-export commonly used items
pub use errors::{Error, Result, Severity};
pub use types::*;
pub use config::{Bl2Config, MemoryLayout, TeeLayout};
pub use version::MonotonicVersion;
pub use once::InitOnce;
