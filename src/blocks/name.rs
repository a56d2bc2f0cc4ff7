// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{element, read_count, read_string};
use crate::bitstream::BitReader;
use crate::error::Result;
use crate::BlockId;

/// Decoded contents of a single block of the `NAME` section.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameBlock {
    pub names: Vec<String>,
}

impl NameBlock {
    pub fn name(&self, index: u32) -> Result<&str> {
        element(&self.names, "name", index).map(String::as_str)
    }
}

/// Decodes a block of the `NAME` section: length-prefixed byte strings.
pub fn decode_name_block(bs: &mut BitReader, block_id: BlockId) -> Result<NameBlock> {
    let length_bits = bs.read_width()?;
    let (count, capacity) = read_count(bs)?;
    let mut names = Vec::with_capacity(capacity);
    for _ in 0..count {
        let len: u32 = bs.read_bits(length_bits)?;
        names.push(read_string(bs, len)?);
    }

    log::debug!("decoded name block {}: {} names", block_id, names.len());
    Ok(NameBlock { names })
}
