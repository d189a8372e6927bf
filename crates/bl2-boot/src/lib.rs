// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! STM32MP1 Second-Stage Boot Loader Core
//!
//! This crate provides the boot flow between the ROM and the TEE:
//!
//! - **Sequencer**: Ordered hardware bring-up with fail-fast policy
//! - **Memory**: Static memory map with overlap checking
//! - **Rollback**: Anti-rollback monotonic counter
//! - **Placement**: Image placement and entry point resolution
//! - **TEE Header**: OP-TEE container parsing
//! - **Report**: Reset reason and debug port reporting
//!
//! The core owns no hardware. Every driver is reached through the
//! [`Board`] bundle of `bl2-hal` collaborator traits.

#![no_std]
#![warn(missing_docs)]

pub mod board;
pub mod context;
pub mod images;
pub mod memory;
pub mod placement;
pub mod report;
pub mod rollback;
pub mod sequencer;
pub mod tee_header;

pub use board::Board;
pub use context::{BootContext, ConsoleHandle, RawBootContext, StageState};
pub use images::{DescriptorTable, EntryPointInfo, ExecutionArch, ImageAttributes, ImageDescriptor};
pub use memory::MemoryMap;
pub use placement::PlacementResolver;
pub use report::{DebugPortState, ResetReason};
pub use rollback::{update_monotonic_counter, AntiRollbackState, CounterUpdate};
pub use sequencer::{BringUpReport, FatalError, Sequencer, Step, StepLedger};
pub use tee_header::{SplitBounds, SplitImage, TeeHeader};
