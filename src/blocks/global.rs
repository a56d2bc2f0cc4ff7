// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{element, read_count, read_string};
use crate::bitstream::BitReader;
use crate::error::{Error, Result};
use crate::{BlockId, NodeId, PackageId};

/// Decoded contents of a single block of the `LINK` section.
///
/// Maps global node indices (used by edges crossing package boundaries)
/// onto nodes of the currently loaded packages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlobalNodeBlock {
    /// Resolved nodes; `None` where none of the listed packages is loaded.
    pub global_node_ids: Vec<Option<NodeId>>,
}

impl GlobalNodeBlock {
    pub fn resolve(&self, index: u32) -> Result<Option<NodeId>> {
        element(&self.global_node_ids, "global node", index).copied()
    }
}

/// Decodes a block of the `LINK` section.
///
/// The block refers to packages by name, as packages may be imported in any order;
/// `find_package` maps a name onto the [PackageId] of a loaded package.
/// Every global node may list a location in multiple packages - the last one
/// belonging to a loaded package wins.
pub fn decode_global_node_block<F>(bs: &mut BitReader, block_id: BlockId, find_package: F) -> Result<GlobalNodeBlock>
where
    F: Fn(&str) -> Option<PackageId>,
{
    let package_name_bits = bs.read_width()?;
    let packages_per_node_bits = bs.read_width()?;
    let block_bits = bs.read_width()?;
    let index_bits = bs.read_width()?;

    let (package_count, capacity) = read_count(bs)?;
    let mut package_ids = Vec::with_capacity(capacity);
    for _ in 0..package_count {
        let len: u32 = bs.read_bits(package_name_bits)?;
        let name = read_string(bs, len)?;
        let package_id = find_package(&name);
        if package_id.is_none() {
            log::debug!("link block {}: package {:?} is not loaded", block_id, name);
        }
        package_ids.push(package_id);
    }

    let (count, capacity) = read_count(bs)?;
    let mut global_node_ids = Vec::with_capacity(capacity);
    for _ in 0..count {
        let mut resolved = None;
        let entries: u32 = bs.read_bits(packages_per_node_bits)?;
        for _ in 0..entries {
            let package_index: u32 = bs.read_bits(packages_per_node_bits)?;
            let block_index: u32 = bs.read_bits(block_bits)?;
            let node_index: u32 = bs.read_bits(index_bits)?;
            let package_id = package_ids
                .get(package_index as usize)
                .ok_or_else(|| Error::out_of_range("link package", package_index, package_ids.len()))?;
            if let Some(package_id) = *package_id {
                resolved = Some(NodeId::new(BlockId::new(package_id, block_index), node_index));
            }
        }
        global_node_ids.push(resolved);
    }

    log::debug!(
        "decoded link block {}: {} global nodes ({} resolved)",
        block_id,
        global_node_ids.len(),
        global_node_ids.iter().filter(|id| id.is_some()).count()
    );
    Ok(GlobalNodeBlock { global_node_ids })
}
