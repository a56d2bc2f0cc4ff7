// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::bitstream::BitReader;
use crate::eiff::{DataChunk, Form, Source, Tag};
use crate::error::{Error, Result};
use crate::geo::{Point, WgsBounds};
use crate::PackageId;

/// The only package format version understood by this crate.
pub const VERSION: u32 = 0;

pub const HEAD: Tag = Tag(*b"HEAD");
pub const NODE: Tag = Tag(*b"NODE");
pub const GEOM: Tag = Tag(*b"GEOM");
pub const NAME: Tag = Tag(*b"NAME");
pub const LINK: Tag = Tag(*b"LINK");
pub const RTRE: Tag = Tag(*b"RTRE");

/// Handle to one blocked section of a package.
///
/// A section starts with a little-endian `u32` block count, followed by
/// `count + 1` little-endian `u64` offsets (relative to the section start);
/// block `i` spans `[offset[i], offset[i + 1])`.
#[derive(Debug, Clone)]
pub struct Section {
    chunk: DataChunk,
    block_count: u32,
}

impl Section {
    fn open(chunk: DataChunk) -> Result<Self> {
        let mut count = [0u8; 4];
        chunk.read(&mut count, 0)?;
        let block_count = u32::from_le_bytes(count);

        let table_end = 4 + (block_count as u64 + 1) * 8;
        if table_end > chunk.size() {
            return Err(Error::TruncatedChunk {
                tag: chunk.tag(),
                offset: 0,
            });
        }

        Ok(Self { chunk, block_count })
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Reads the payload of a single block.
    pub fn read_block(&self, block_index: u32) -> Result<BitReader> {
        if block_index >= self.block_count {
            return Err(Error::out_of_range(
                "block",
                block_index,
                self.block_count as usize,
            ));
        }

        let mut offsets = [0u8; 16];
        self.chunk.read(&mut offsets, 4 + block_index as u64 * 8)?;
        let mut start = [0u8; 8];
        let mut end = [0u8; 8];
        start.copy_from_slice(&offsets[..8]);
        end.copy_from_slice(&offsets[8..]);
        let start = u64::from_le_bytes(start);
        let end = u64::from_le_bytes(end);

        if end < start || end > self.chunk.size() {
            return Err(Error::BadBlockOffsets {
                tag: self.chunk.tag(),
                block: block_index,
                start,
                end,
            });
        }

        let data = self.chunk.read_vec(start, end - start)?;
        Ok(BitReader::new(data))
    }
}

/// Decoded contents of the `HEAD` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u32,
    pub name: String,
    pub bounds: WgsBounds,
}

impl Header {
    pub fn decode(data: Vec<u8>) -> Result<Self> {
        let mut bs = BitReader::new(data);

        let version: u32 = bs.read_bits(32)?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                got: version,
                expected: VERSION,
            });
        }

        let name_len: u16 = bs.read_bits(16)?;
        let mut name = Vec::with_capacity(name_len as usize);
        for _ in 0..name_len {
            name.push(bs.read_bits::<u8>(8)?);
        }

        let lat0: i32 = bs.read_bits(32)?;
        let lon0: i32 = bs.read_bits(32)?;
        let lat1: i32 = bs.read_bits(32)?;
        let lon1: i32 = bs.read_bits(32)?;

        Ok(Self {
            version,
            name: String::from_utf8_lossy(&name).into_owned(),
            bounds: WgsBounds::new(
                Point::new(lat0, lon0).to_wgs(),
                Point::new(lat1, lon1).to_wgs(),
            ),
        })
    }
}

/// One imported routing graph file.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub bounds: WgsBounds,
    pub nodes: Section,
    pub geometries: Section,
    pub names: Section,
    pub global_nodes: Section,
    pub rtree_nodes: Section,
}

impl Package {
    /// Opens a package file, validating its container structure and header.
    /// Block payloads are not read.
    pub fn open(id: PackageId, source: Arc<dyn Source>) -> Result<Self> {
        let form = Form::open(source)?;
        let header = Header::decode(form.require(HEAD)?.read_all()?)?;

        let section = |tag: Tag| -> Result<Section> { Section::open(form.require(tag)?.clone()) };

        Ok(Self {
            id,
            name: header.name,
            bounds: header.bounds,
            nodes: section(NODE)?,
            geometries: section(GEOM)?,
            names: section(NAME)?,
            global_nodes: section(LINK)?,
            rtree_nodes: section(RTRE)?,
        })
    }
}

/// Summary of an imported [Package].
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub id: PackageId,
    pub name: String,
    pub bounds: WgsBounds,
}

impl From<&Package> for PackageInfo {
    fn from(p: &Package) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            bounds: p.bounds,
        }
    }
}
