// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Image descriptor table handed to the external loader

use core::ops::{Index, IndexMut};

use bl2_common::{ImageId, MemoryRegion};

bitflags::bitflags! {
    /// Per-image loader attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ImageAttributes: u32 {
        /// The loader must not fetch this image
        const SKIP_LOADING = 1 << 1;
    }
}

/// Execution state the next stage runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionArch {
    /// AArch32
    #[default]
    Aarch32,
    /// AArch64
    Aarch64,
}

/// Entry point and hand-off arguments of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryPointInfo {
    /// Entry address
    pub pc: u64,
    /// Address the monitor returns to after boot (non-secure entry)
    pub lr_svc: u64,
    /// Hand-off arguments
    pub args: [u64; 3],
    /// Execution state
    pub arch: ExecutionArch,
}

/// Placement of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Image role
    pub id: ImageId,
    /// Load base and maximum size
    pub region: MemoryRegion,
    /// Actual size once known
    pub image_size: u64,
    /// Loader attributes
    pub attributes: ImageAttributes,
    /// Entry point
    pub entry: EntryPointInfo,
}

impl ImageDescriptor {
    /// Descriptor with nothing resolved; the loader skips it
    #[must_use]
    pub fn unresolved(id: ImageId) -> Self {
        Self {
            id,
            region: MemoryRegion::default(),
            image_size: 0,
            attributes: ImageAttributes::SKIP_LOADING,
            entry: EntryPointInfo::default(),
        }
    }

    /// The loader will skip this image
    #[must_use]
    pub const fn skips_loading(&self) -> bool {
        self.attributes.contains(ImageAttributes::SKIP_LOADING)
    }
}

/// One descriptor per image role
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    entries: [ImageDescriptor; ImageId::COUNT],
}

impl DescriptorTable {
    /// Table with every image unresolved
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: ImageId::ALL.map(ImageDescriptor::unresolved),
        }
    }

    /// Iterate in image id order
    pub fn iter(&self) -> impl Iterator<Item = &ImageDescriptor> {
        self.entries.iter()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<ImageId> for DescriptorTable {
    type Output = ImageDescriptor;

    fn index(&self, id: ImageId) -> &Self::Output {
        &self.entries[id.index()]
    }
}

impl IndexMut<ImageId> for DescriptorTable {
    fn index_mut(&mut self, id: ImageId) -> &mut Self::Output {
        &mut self.entries[id.index()]
    }
}
