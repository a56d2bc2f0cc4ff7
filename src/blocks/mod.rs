// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Decoders for the bit-packed blocks of the five package sections.
//!
//! Every block starts with a header of 6-bit fields declaring how many bits
//! the subsequent record fields occupy. The widths are picked per block when
//! the package is built, so they must be honored exactly.

mod geometry;
mod global;
mod name;
mod node;
mod rtree;

pub use geometry::{decode_geometry_block, GeometryBlock};
pub use global::{decode_global_node_block, GlobalNodeBlock};
pub use name::{decode_name_block, NameBlock};
pub use node::{decode_node_block, Edge, Node, NodeBlock, TravelMode, TurnInstruction};
pub use rtree::{decode_rtree_node_block, RTreeNode, RTreeNodeBlock};

use crate::bitstream::BitReader;
use crate::error::{Error, Result};

/// Reads a 32-bit record count, returning it with a capacity hint
/// which can't exceed the number of remaining bits.
fn read_count(bs: &mut BitReader) -> Result<(u32, usize)> {
    let count: u32 = bs.read_bits(32)?;
    Ok((count, (count as usize).min(bs.remaining())))
}

/// Reads a run of `len` bytes as a string.
fn read_string(bs: &mut BitReader, len: u32) -> Result<String> {
    let mut bytes = Vec::with_capacity((len as usize).min(bs.remaining() / 8));
    for _ in 0..len {
        bytes.push(bs.read_bits::<u8>(8)?);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Looks up `index` in `items`, failing with [Error::OutOfRange].
fn element<'a, T>(items: &'a [T], what: &'static str, index: u32) -> Result<&'a T> {
    items
        .get(index as usize)
        .ok_or_else(|| Error::out_of_range(what, index, items.len()))
}
