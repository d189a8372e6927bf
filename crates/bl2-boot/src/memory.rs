// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Memory map of the boot stage
//!
//! Regions are collected here before they reach the translation tables.
//! Every region must be exclusive: an overlap between two regions with
//! distinct purposes is an invariant violation caught before anything is
//! mapped.

use bl2_common::{Error, MemoryRegion, Result};
use bl2_hal::{HalResult, Mmu};
use heapless::Vec;

/// Maximum number of regions in the map
pub const MAX_REGIONS: usize = 8;

/// Non-overlapping set of mapped regions
#[derive(Debug, Default)]
pub struct MemoryMap {
    regions: Vec<MemoryRegion, MAX_REGIONS>,
}

impl MemoryMap {
    /// Create an empty map
    #[must_use]
    pub const fn new() -> Self {
        Self { regions: Vec::new() }
    }

    /// Add a region, rejecting invalid or overlapping bounds
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRegion` if the region is empty or wraps
    /// - `Error::RegionOverlap` if it overlaps a region already in the map
    /// - `Error::TableFull` if the map is full
    pub fn try_add_region(&mut self, region: MemoryRegion) -> Result<()> {
        if !region.is_valid() {
            return Err(Error::InvalidRegion);
        }
        if self.regions.iter().any(|r| r.overlaps(&region)) {
            return Err(Error::RegionOverlap);
        }
        self.regions.push(region).map_err(|_| Error::TableFull)
    }

    /// Add a region
    ///
    /// # Panics
    ///
    /// Panics if [`MemoryMap::try_add_region`] would fail. Static regions are
    /// fixed at build time, so a failure here is a layout defect.
    pub fn add_region(&mut self, region: MemoryRegion) {
        if let Err(e) = self.try_add_region(region) {
            panic!("cannot map {region}: {e}");
        }
    }

    /// Regions in insertion order
    #[must_use]
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    /// Hand every region to the translation tables and enable them
    ///
    /// # Errors
    ///
    /// Propagates the first MMU failure.
    pub fn install(&self, mmu: &mut dyn Mmu) -> HalResult<()> {
        for region in &self.regions {
            mmu.add_region(region)?;
        }
        mmu.enable()
    }

    /// Add a region to the map and to the live translation tables
    ///
    /// # Errors
    ///
    /// Returns the [`MemoryMap::try_add_region`] error, or
    /// `Error::DramMappingFailed` if the MMU rejects the region.
    pub fn map_dynamic(&mut self, region: MemoryRegion, mmu: &mut dyn Mmu) -> Result<()> {
        self.try_add_region(region)?;
        mmu.add_dynamic_region(&region)
            .map_err(|_| Error::DramMappingFailed)
    }
}
