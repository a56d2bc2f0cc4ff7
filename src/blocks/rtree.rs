// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{element, read_count};
use crate::bitstream::BitReader;
use crate::error::Result;
use crate::geo::{Point, WgsBounds};
use crate::{BlockId, RTreeNodeId};

/// A node of the per-package R-tree spatial index.
#[derive(Debug, Clone, PartialEq)]
pub enum RTreeNode {
    /// Child R-tree nodes with their bounds.
    Internal(Vec<(WgsBounds, RTreeNodeId)>),

    /// Blocks of the `NODE` section with the bounds of their geometries.
    Leaf(Vec<(WgsBounds, BlockId)>),
}

/// Decoded contents of a single block of the `RTRE` section.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RTreeNodeBlock {
    pub rtree_nodes: Vec<RTreeNode>,
}

impl RTreeNodeBlock {
    pub fn rtree_node(&self, index: u32) -> Result<&RTreeNode> {
        element(&self.rtree_nodes, "r-tree node", index)
    }
}

/// Decodes a block of the `RTRE` section.
///
/// Bounds are stored as the offset of the minimum corner from the block minimum,
/// followed by the offset of the maximum corner from the minimum corner.
pub fn decode_rtree_node_block(bs: &mut BitReader, block_id: BlockId) -> Result<RTreeNodeBlock> {
    let rtree_block_bits = bs.read_width()?;
    let rtree_index_bits = bs.read_width()?;
    let node_block_bits = bs.read_width()?;
    let size_bits = bs.read_width()?;
    let lat_diff_bits = bs.read_width()?;
    let lon_diff_bits = bs.read_width()?;
    let lat_size_bits = bs.read_width()?;
    let lon_size_bits = bs.read_width()?;
    let min_lat: i32 = bs.read_bits(32)?;
    let min_lon: i32 = bs.read_bits(32)?;

    let package_id = block_id.package_id;
    let (count, capacity) = read_count(bs)?;
    let mut rtree_nodes = Vec::with_capacity(capacity);
    for _ in 0..count {
        let leaf = bs.read_bit()?;
        let child_count: u32 = bs.read_bits(size_bits)?;
        let capacity = (child_count as usize).min(bs.remaining());

        let read_bounds = |bs: &mut BitReader| -> Result<WgsBounds> {
            let lat0 = min_lat.wrapping_add(bs.read_bits(lat_diff_bits)?);
            let lon0 = min_lon.wrapping_add(bs.read_bits(lon_diff_bits)?);
            let lat1 = lat0.wrapping_add(bs.read_bits(lat_size_bits)?);
            let lon1 = lon0.wrapping_add(bs.read_bits(lon_size_bits)?);
            Ok(WgsBounds::new(
                Point::new(lat0, lon0).to_wgs(),
                Point::new(lat1, lon1).to_wgs(),
            ))
        };

        let node = if leaf {
            let mut blocks = Vec::with_capacity(capacity);
            for _ in 0..child_count {
                let bounds = read_bounds(bs)?;
                let node_block: u32 = bs.read_bits(node_block_bits)?;
                blocks.push((bounds, BlockId::new(package_id, node_block)));
            }
            RTreeNode::Leaf(blocks)
        } else {
            let mut children = Vec::with_capacity(capacity);
            for _ in 0..child_count {
                let bounds = read_bounds(bs)?;
                let rtree_block: u32 = bs.read_bits(rtree_block_bits)?;
                let rtree_index: u32 = bs.read_bits(rtree_index_bits)?;
                children.push((
                    bounds,
                    RTreeNodeId::new(BlockId::new(package_id, rtree_block), rtree_index),
                ));
            }
            RTreeNode::Internal(children)
        };
        rtree_nodes.push(node);
    }

    log::debug!("decoded r-tree block {}: {} nodes", block_id, rtree_nodes.len());
    Ok(RTreeNodeBlock { rtree_nodes })
}
