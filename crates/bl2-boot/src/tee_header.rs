// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! OP-TEE container header (version 2)
//!
//! # Layout (little-endian)
//!
//! | Offset      | Size | Field                                   |
//! |-------------|------|-----------------------------------------|
//! | 0           | 4    | magic `"OPTE"`                          |
//! | 4           | 1    | version (2)                             |
//! | 5           | 1    | arch (0 = AArch32, 1 = AArch64)         |
//! | 6           | 2    | flags                                   |
//! | 8           | 4    | number of segments (1 or 2)             |
//! | 12 + 16 * i | 16   | load address hi, lo; segment id; size   |
//!
//! Segment id 0 is the pager, 1 the paged area. A load address of
//! `0xFFFF_FFFF` means "at the base of the window". A segment that does not
//! fit its window, or that touches a region reserved by this stage, fails
//! the parse; nothing is ever truncated.

use bl2_common::{Error, MemoryAttributes, MemoryRegion, Result};

use crate::images::ExecutionArch;

/// Container signature
pub const TEE_MAGIC: u32 = 0x4554_504F;

/// Supported header version
pub const TEE_HEADER_VERSION: u8 = 2;

/// Maximum number of segments
pub const TEE_MAX_SEGMENTS: usize = 2;

const HEADER_LEN: usize = 12;
const SEGMENT_LEN: usize = 16;

/// Bytes to read from the image base to cover any valid header
pub const TEE_HEADER_MAX_LEN: usize = HEADER_LEN + TEE_MAX_SEGMENTS * SEGMENT_LEN;

/// Load address meaning "at the window base"
const LOAD_AT_WINDOW_BASE: u64 = 0xFFFF_FFFF;

/// Windows each segment must fit in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBounds {
    /// Pager window
    pub pager: MemoryRegion,
    /// Paged window
    pub paged: MemoryRegion,
}

/// Resolved split image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitImage {
    /// Pager segment (code)
    pub pager: MemoryRegion,
    /// Paged segment (writable); empty when the container has no paged part
    pub paged: MemoryRegion,
    /// Entry point (pager base)
    pub entry_point: u64,
    /// Runtime execution state
    pub arch: ExecutionArch,
}

/// Parsed TEE image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeHeader {
    /// No container: the image runs where it was loaded
    Monolithic {
        /// Load address
        load_address: u64,
    },
    /// Pager/paged container
    Split(SplitImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Pager,
    Paged,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    kind: SegmentKind,
    load_address: u64,
    size: u64,
}

struct RawHeader {
    arch: ExecutionArch,
    segments: [Option<Segment>; TEE_MAX_SEGMENTS],
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

impl RawHeader {
    /// `Ok(None)` when there is no signature
    fn read(bytes: &[u8]) -> Result<Option<Self>> {
        if read_u32(bytes, 0) != Some(TEE_MAGIC) {
            return Ok(None);
        }
        if bytes.len() < HEADER_LEN || bytes[4] != TEE_HEADER_VERSION {
            return Err(Error::TeeHeaderInvalid);
        }
        let arch = match bytes[5] {
            0 => ExecutionArch::Aarch32,
            1 => ExecutionArch::Aarch64,
            _ => return Err(Error::TeeHeaderInvalid),
        };
        let count = read_u32(bytes, 8).ok_or(Error::TeeHeaderInvalid)? as usize;
        if count == 0 || count > TEE_MAX_SEGMENTS {
            return Err(Error::TeeHeaderInvalid);
        }

        let mut segments = [None; TEE_MAX_SEGMENTS];
        for (i, slot) in segments.iter_mut().take(count).enumerate() {
            let at = HEADER_LEN + i * SEGMENT_LEN;
            let field = |n: usize| read_u32(bytes, at + 4 * n).ok_or(Error::TeeHeaderInvalid);
            let kind = match field(2)? {
                0 => SegmentKind::Pager,
                1 => SegmentKind::Paged,
                _ => return Err(Error::TeeHeaderInvalid),
            };
            *slot = Some(Segment {
                kind,
                load_address: (u64::from(field(0)?) << 32) | u64::from(field(1)?),
                size: u64::from(field(3)?),
            });
        }
        Ok(Some(Self { arch, segments }))
    }

    fn segment(&self, kind: SegmentKind) -> Result<Option<Segment>> {
        let mut found = self.segments.iter().flatten().filter(|s| s.kind == kind);
        let first = found.next().copied();
        if found.next().is_some() {
            return Err(Error::TeeHeaderInvalid);
        }
        Ok(first)
    }
}

/// Place `segment` in `window`
fn place(segment: Segment, window: &MemoryRegion, reserved: &[MemoryRegion]) -> Result<u64> {
    let base = if segment.load_address == LOAD_AT_WINDOW_BASE {
        window.base
    } else {
        segment.load_address
    };
    if segment.size == 0 || !window.contains_range(base, segment.size) {
        return Err(Error::TeeHeaderInvalid);
    }
    let placed = MemoryRegion::window(base, segment.size);
    if reserved.iter().any(|r| r.overlaps(&placed)) {
        return Err(Error::TeeHeaderInvalid);
    }
    Ok(base)
}

impl TeeHeader {
    /// Check for the container signature
    #[must_use]
    pub fn has_signature(bytes: &[u8]) -> bool {
        read_u32(bytes, 0) == Some(TEE_MAGIC)
    }

    /// Pager load address declared by a well-formed container
    ///
    /// The window-base sentinel is returned as is; callers use this only to
    /// pick the pager window.
    #[must_use]
    pub fn probe_entry_point(bytes: &[u8]) -> Option<u64> {
        let header = RawHeader::read(bytes).ok()??;
        header
            .segment(SegmentKind::Pager)
            .ok()?
            .map(|s| s.load_address)
    }

    /// Parse the image at `image_base`
    ///
    /// Returns `Monolithic` when `bytes` carries no signature.
    ///
    /// # Errors
    ///
    /// Returns `Error::TeeHeaderInvalid` when the signature is present but
    /// the header is malformed, lacks a pager segment, or places a segment
    /// outside its window or over a `reserved` region.
    pub fn parse(
        bytes: &[u8],
        image_base: u64,
        bounds: &SplitBounds,
        reserved: &[MemoryRegion],
    ) -> Result<Self> {
        let Some(header) = RawHeader::read(bytes)? else {
            return Ok(Self::Monolithic {
                load_address: image_base,
            });
        };

        let pager = header
            .segment(SegmentKind::Pager)?
            .ok_or(Error::TeeHeaderInvalid)?;
        let pager_base = place(pager, &bounds.pager, reserved)?;
        let pager = MemoryRegion::new(
            pager_base,
            pager.size,
            MemoryAttributes::CODE | MemoryAttributes::SECURE,
        );

        let paged = match header.segment(SegmentKind::Paged)? {
            Some(segment) => MemoryRegion::new(
                place(segment, &bounds.paged, reserved)?,
                segment.size,
                MemoryAttributes::RW | MemoryAttributes::SECURE,
            ),
            None => MemoryRegion::new(
                bounds.paged.base,
                0,
                MemoryAttributes::RW | MemoryAttributes::SECURE,
            ),
        };
        if paged.overlaps(&pager) {
            return Err(Error::TeeHeaderInvalid);
        }

        Ok(Self::Split(SplitImage {
            pager,
            paged,
            entry_point: pager_base,
            arch: header.arch,
        }))
    }

    /// Entry point of the image
    #[must_use]
    pub const fn entry_point(&self) -> u64 {
        match self {
            Self::Monolithic { load_address } => *load_address,
            Self::Split(split) => split.entry_point,
        }
    }
}
