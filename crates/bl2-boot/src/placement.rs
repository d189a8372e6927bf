// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Image placement
//!
//! Called by the external loader after each image is loaded. Resolves load
//! regions and entry points in the [`DescriptorTable`] and propagates them
//! to dependent images.
//!
//! | Image         | Action                                                   |
//! |---------------|----------------------------------------------------------|
//! | FW_CONFIG     | Populate the table from the firmware configuration       |
//! | BL32 (TEE)    | Parse the TEE header, fix up pager/paged, hand-off args  |
//! | BL33          | Record the monitor return address, flush the image range |
//! | anything else | Nothing                                                  |

use bl2_common::constants::RESUME_ENTRY_POINT;
use bl2_common::log::LogBuffer;
use bl2_common::{log_debug, log_error, log_warn};
use bl2_common::{Bl2Config, Error, ImageId, MemoryRegion, Result, TeeLayout};
use bl2_hal::ClockId;
use heapless::Vec;

use crate::board::Board;
use crate::images::{DescriptorTable, ImageAttributes, ImageDescriptor};
use crate::tee_header::{SplitBounds, SplitImage, TeeHeader, TEE_HEADER_MAX_LEN};

const MODULE: &str = "bl2";

/// Images described by the firmware configuration, in walk order
pub const FW_CONFIG_IMAGES: [ImageId; 4] = [
    ImageId::Tee,
    ImageId::NonSecureFw,
    ImageId::HwConfig,
    ImageId::TeeConfig,
];

/// Maximum number of degraded outcomes recorded
pub const MAX_PLACEMENT_DEGRADED: usize = 4;

/// Resolves image placement as images are loaded
pub struct PlacementResolver {
    config: Bl2Config,
    table: DescriptorTable,
    degraded: Vec<(ImageId, Error), MAX_PLACEMENT_DEGRADED>,
}

impl PlacementResolver {
    /// Resolver with every image unresolved
    #[must_use]
    pub fn new(config: Bl2Config) -> Self {
        Self::with_table(config, DescriptorTable::new())
    }

    /// Resolver over an existing table
    #[must_use]
    pub fn with_table(config: Bl2Config, table: DescriptorTable) -> Self {
        Self {
            config,
            table,
            degraded: Vec::new(),
        }
    }

    /// Descriptor table
    #[must_use]
    pub const fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Mutable descriptor table, for the loader's bookkeeping
    pub fn table_mut(&mut self) -> &mut DescriptorTable {
        &mut self.table
    }

    /// Descriptor of `id`
    #[must_use]
    pub fn descriptor(&self, id: ImageId) -> &ImageDescriptor {
        &self.table[id]
    }

    /// Non-fatal failures, in occurrence order
    #[must_use]
    pub fn degraded(&self) -> &[(ImageId, Error)] {
        &self.degraded
    }

    /// [`post_image_load`](Self::post_image_load) for a raw loader image id
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownImage` for an id this stage does not know, or
    /// the placement error.
    pub fn post_image_load_raw(
        &mut self,
        raw_id: u32,
        board: &mut Board<'_>,
        log: &mut LogBuffer,
    ) -> Result<()> {
        let id = ImageId::try_from(raw_id)?;
        self.post_image_load(id, board, log)
    }

    /// Finalize placement after `id` was loaded
    ///
    /// # Errors
    ///
    /// - `Error::ConfigTreeInvalid` if the firmware configuration cannot be
    ///   populated
    /// - `Error::UnknownImage` if the configuration walk meets an image with
    ///   no placement rule
    /// - `Error::InvalidRegion` if DRAM is too small for the secure window
    /// - `Error::TeeHeaderInvalid` if the TEE header is present but invalid
    /// - `Error::NoTeeEntryPoint` if a monolithic TEE has no load region
    pub fn post_image_load(
        &mut self,
        id: ImageId,
        board: &mut Board<'_>,
        log: &mut LogBuffer,
    ) -> Result<()> {
        match id {
            ImageId::FwConfig => self.load_fw_config(board, log),
            ImageId::Tee => self.place_tee(board, log),
            ImageId::NonSecureFw => {
                self.hand_off_non_secure(board);
                Ok(())
            }
            ImageId::TeePager | ImageId::TeePaged | ImageId::HwConfig | ImageId::TeeConfig => {
                Ok(())
            }
        }
    }

    // ========================================================================
    // FW_CONFIG
    // ========================================================================

    fn load_fw_config(&mut self, board: &mut Board<'_>, log: &mut LogBuffer) -> Result<()> {
        let window = self.config.layout.fw_config;
        board
            .config
            .populate_fw_config(&window)
            .map_err(|_| Error::ConfigTreeInvalid)?;
        self.table[ImageId::FwConfig].region = window;

        self.apply_fw_config(&FW_CONFIG_IMAGES, board, log)
    }

    fn apply_fw_config(
        &mut self,
        ids: &[ImageId],
        board: &mut Board<'_>,
        log: &mut LogBuffer,
    ) -> Result<()> {
        let layout = self.config.layout;
        let restored = board.dram.is_restored();

        for &id in ids {
            let Some(entry) = board.config.image_config(id) else {
                continue;
            };

            let desc = &mut self.table[id];
            desc.region = MemoryRegion::window(entry.address, entry.max_size);
            // DRAM contents survived a low-power exit: keep what is there
            if !(restored && layout.is_dram_address(entry.address)) {
                desc.attributes.remove(ImageAttributes::SKIP_LOADING);
            }
            log_debug!(log, MODULE, "{} at {}", id, desc.region);

            match id {
                ImageId::Tee => {
                    desc.entry.pc = entry.address;
                    let region = desc.region;
                    self.table[ImageId::TeePager].region = region;
                    self.table[ImageId::TeePaged].region = layout
                        .dram_top_window(board.config.dram_size())
                        .ok_or(Error::InvalidRegion)?;
                }
                ImageId::NonSecureFw => {
                    desc.entry.pc = if restored {
                        RESUME_ENTRY_POINT
                    } else {
                        entry.address
                    };
                }
                ImageId::HwConfig | ImageId::TeeConfig => {}
                _ => {
                    log_error!(log, MODULE, "No placement rule for {}", id);
                    return Err(Error::UnknownImage);
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // BL32
    // ========================================================================

    fn place_tee(&mut self, board: &mut Board<'_>, log: &mut LogBuffer) -> Result<()> {
        let base = self.table[ImageId::Tee].region.base;
        self.table[ImageId::Tee].entry.pc = base;

        let images = board.images;
        let bytes = images.bytes(base, TEE_HEADER_MAX_LEN).unwrap_or(&[]);

        if TeeHeader::has_signature(bytes) {
            if board.dram.is_restored() {
                self.resume_tee(board);
                return Ok(());
            }

            let bounds = self.split_bounds(bytes, board)?;
            let reserved = self.config.reserved_regions();
            match TeeHeader::parse(bytes, base, &bounds, &reserved) {
                Ok(TeeHeader::Split(split)) => self.apply_split(split),
                Ok(TeeHeader::Monolithic { .. }) => self.apply_monolithic()?,
                Err(e) => {
                    log_error!(log, MODULE, "OPTEE header parse error.");
                    return Err(e);
                }
            }
        } else {
            self.apply_monolithic()?;
        }

        let pc = self.table[ImageId::Tee].entry.pc;
        if self.config.layout.is_dram_address(pc) {
            if let Err(e) = board.backup.save_stage_params() {
                log_warn!(log, MODULE, "Cannot save stage parameters: {}", e);
                // Beyond capacity the log line is the only record
                let _ = self.degraded.push((ImageId::Tee, Error::ContextSaveFailed));
            }
        }
        Ok(())
    }

    /// Image already resident: only the entry point comes back
    fn resume_tee(&mut self, board: &mut Board<'_>) {
        let pc = board.backup.tee_entry_point();
        self.table[ImageId::Tee].entry.pc = pc;
        if self.config.layout.backup_sram.contains(pc) {
            board.clock.enable(ClockId::BACKUP_SRAM);
        }
    }

    fn split_bounds(&self, bytes: &[u8], board: &Board<'_>) -> Result<SplitBounds> {
        let layout = self.config.layout;
        match self.config.tee_layout {
            TeeLayout::FixedWindows => Ok(SplitBounds {
                pager: self.table[ImageId::TeePager].region,
                paged: self.table[ImageId::TeePaged].region,
            }),
            TeeLayout::DramTop => {
                let top = layout
                    .dram_top_window(board.config.dram_size())
                    .ok_or(Error::InvalidRegion)?;
                let pager = match TeeHeader::probe_entry_point(bytes) {
                    Some(ep) if layout.tee_pager.contains(ep) => layout.tee_pager,
                    _ => top,
                };
                Ok(SplitBounds { pager, paged: top })
            }
        }
    }

    fn apply_split(&mut self, split: SplitImage) {
        let tee = &mut self.table[ImageId::Tee];
        tee.entry.pc = split.entry_point;
        tee.entry.arch = split.arch;
        tee.entry.args = [split.paged.base, 0, 0];

        fix_sub_image(&mut self.table[ImageId::TeePager], split.pager);
        fix_sub_image(&mut self.table[ImageId::TeePaged], split.paged);
    }

    fn apply_monolithic(&mut self) -> Result<()> {
        if !self.table[ImageId::Tee].region.is_valid() {
            return Err(Error::NoTeeEntryPoint);
        }

        match self.config.tee_layout {
            TeeLayout::FixedWindows => {
                // Image and its config blob may be contiguous
                let extra = self.table[ImageId::TeeConfig].region.size;
                let tee = &mut self.table[ImageId::Tee];
                let size = tee
                    .region
                    .size
                    .checked_add(extra)
                    .ok_or(Error::InvalidRegion)?;
                tee.region = MemoryRegion::new(tee.region.base, size, tee.region.attributes);
            }
            TeeLayout::DramTop => {
                self.table[ImageId::Tee].entry.pc = self.config.layout.tee_pager.base;
            }
        }
        self.table[ImageId::Tee].entry.args[0] = 0;
        Ok(())
    }

    // ========================================================================
    // BL33
    // ========================================================================

    fn hand_off_non_secure(&mut self, board: &mut Board<'_>) {
        let ns = self.table[ImageId::NonSecureFw];
        self.table[ImageId::Tee].entry.lr_svc = ns.entry.pc;
        board
            .cache
            .flush_dcache_range(ns.region.base, ns.region.size);
    }
}

/// Record a parsed sub-image; an empty paged part stays skipped
fn fix_sub_image(desc: &mut ImageDescriptor, region: MemoryRegion) {
    desc.region = region;
    desc.image_size = region.size;
    if region.size != 0 {
        desc.attributes.remove(ImageAttributes::SKIP_LOADING);
    }
}
