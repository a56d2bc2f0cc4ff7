// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::ops::Range;
use std::sync::OnceLock;

use super::{element, read_count};
use crate::bitstream::{decode_zig_zag, BitReader};
use crate::error::{Error, Result};
use crate::geo::WgsBounds;
use crate::{BlockId, GeometryId, GlobalNodeId, NameId, NodeId};

/// Travel mode of a [Node], as stored in [Node::travel_mode].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Default = 0,
    Inaccessible = 1,
}

impl TravelMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Default),
            1 => Some(Self::Inaccessible),
            _ => None,
        }
    }
}

/// Turn instruction of a non-contracted [Edge], as stored in [Edge::turn_instruction].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnInstruction {
    NoTurn = 0,
    GoStraight = 1,
    TurnSlightRight = 2,
    TurnRight = 3,
    TurnSharpRight = 4,
    UTurn = 5,
    TurnSharpLeft = 6,
    TurnLeft = 7,
    TurnSlightLeft = 8,
    ReachViaLocation = 9,
    HeadOn = 10,
    EnterRoundabout = 11,
    LeaveRoundabout = 12,
    StayOnRoundabout = 13,
    StartAtEndOfStreet = 14,
    ReachedYourDestination = 15,
    EnterAgainstAllowedDirection = 16,
    LeaveAgainstAllowedDirection = 17,
    InverseAccessRestrictionFlag = 127,
    AccessRestrictionFlag = 128,
    AccessRestrictionPenalty = 129,
}

impl TurnInstruction {
    pub fn from_raw(raw: u8) -> Option<Self> {
        use TurnInstruction::*;
        const ORDINARY: [TurnInstruction; 18] = [
            NoTurn,
            GoStraight,
            TurnSlightRight,
            TurnRight,
            TurnSharpRight,
            UTurn,
            TurnSharpLeft,
            TurnLeft,
            TurnSlightLeft,
            ReachViaLocation,
            HeadOn,
            EnterRoundabout,
            LeaveRoundabout,
            StayOnRoundabout,
            StartAtEndOfStreet,
            ReachedYourDestination,
            EnterAgainstAllowedDirection,
            LeaveAgainstAllowedDirection,
        ];

        match raw {
            127 => Some(InverseAccessRestrictionFlag),
            128 => Some(AccessRestrictionFlag),
            129 => Some(AccessRestrictionPenalty),
            _ => ORDINARY.get(raw as usize).copied(),
        }
    }
}

/// An outgoing connection of a [Node].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Node reached by this edge; `None` if the edge leads into a package which is not loaded.
    pub target: Option<NodeId>,

    /// Whether this edge is a contraction shortcut.
    pub contracted: bool,

    /// The node bypassed by a contraction shortcut. Always `None` for ordinary edges,
    /// and `None` for shortcuts bypassing a node in a package which is not loaded.
    pub contracted_node: Option<NodeId>,

    pub forward: bool,
    pub backward: bool,
    pub weight: u32,

    /// Raw [TurnInstruction] code; zero for contracted edges.
    pub turn_instruction: u8,
}

impl Edge {
    pub fn instruction(&self) -> Option<TurnInstruction> {
        if self.contracted {
            None
        } else {
            TurnInstruction::from_raw(self.turn_instruction)
        }
    }
}

/// A routing graph vertex.
///
/// The node's outgoing [Edges](Edge) are owned by its [NodeBlock];
/// the node only knows their range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub geometry_id: GeometryId,

    /// Whether the geometry must be walked backwards to follow this node's direction.
    pub geometry_reversed: bool,

    pub name_id: NameId,
    pub weight: u32,

    /// Raw [TravelMode] code.
    pub travel_mode: u8,

    first_edge: u32,
    last_edge: u32,
}

impl Node {
    /// Range of this node's edges in [NodeBlock::edges].
    pub fn edge_range(&self) -> Range<usize> {
        self.first_edge as usize..self.last_edge as usize
    }

    pub fn edge_count(&self) -> usize {
        self.edge_range().len()
    }

    pub fn travel_mode(&self) -> Option<TravelMode> {
        TravelMode::from_raw(self.travel_mode)
    }
}

/// Decoded contents of a single block of the `NODE` section.
#[derive(Debug, Default)]
pub struct NodeBlock {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,

    /// Bounds of every node's geometry, computed on the first spatial query touching the block.
    geometry_bounds: OnceLock<Vec<WgsBounds>>,
}

impl NodeBlock {
    pub fn edges_of(&self, node: &Node) -> &[Edge] {
        &self.edges[node.edge_range()]
    }

    pub fn node(&self, index: u32) -> Result<&Node> {
        element(&self.nodes, "node", index)
    }

    /// Returns the cached geometry bounds, or fills the cache with `compute`.
    /// A failed computation leaves the cache empty.
    pub(crate) fn geometry_bounds_or_try_init<F>(&self, compute: F) -> Result<&[WgsBounds]>
    where
        F: FnOnce() -> Result<Vec<WgsBounds>>,
    {
        if let Some(bounds) = self.geometry_bounds.get() {
            return Ok(bounds);
        }
        let bounds = compute()?;
        Ok(self.geometry_bounds.get_or_init(|| bounds))
    }

    #[cfg(test)]
    pub(crate) fn has_geometry_bounds(&self) -> bool {
        self.geometry_bounds.get().is_some()
    }
}

/// Bit widths declared by a node block header.
struct Widths {
    internal_node_index: u32,
    external_node_block: u32,
    external_node_index: u32,
    global_node_block: u32,
    global_node_index: u32,
    contracted_node_block: u32,
    contracted_node_index: u32,
    geometry_block: u32,
    geometry_block_diff: u32,
    geometry_index: u32,
    name_block: u32,
    name_block_diff: u32,
    name_index: u32,
    node_out_degree: u32,
    travel_mode: u32,
    instruction: u32,
    small_weight: u32,
    large_weight: u32,
}

impl Widths {
    fn read(bs: &mut BitReader) -> Result<Self> {
        Ok(Self {
            internal_node_index: bs.read_width()?,
            external_node_block: bs.read_width()?,
            external_node_index: bs.read_width()?,
            global_node_block: bs.read_width()?,
            global_node_index: bs.read_width()?,
            contracted_node_block: bs.read_width()?,
            contracted_node_index: bs.read_width()?,
            geometry_block: bs.read_width()?,
            geometry_block_diff: bs.read_width()?,
            geometry_index: bs.read_width()?,
            name_block: bs.read_width()?,
            name_block_diff: bs.read_width()?,
            name_index: bs.read_width()?,
            node_out_degree: bs.read_width()?,
            travel_mode: bs.read_width()?,
            instruction: bs.read_width()?,
            small_weight: bs.read_width()?,
            large_weight: bs.read_width()?,
        })
    }
}

/// Internal state of decoding a single node block.
struct Decoder<'a, R> {
    bs: &'a mut BitReader,
    block_id: BlockId,
    w: Widths,
    resolve_global: R,
}

impl<'a, R> Decoder<'a, R>
where
    R: FnMut(GlobalNodeId) -> Result<Option<NodeId>>,
{
    /// Reads a weight: a flag bit selecting the large or the small encoding, followed by the value.
    fn weight(&mut self) -> Result<u32> {
        let bits = if self.bs.read_bit()? {
            self.w.large_weight
        } else {
            self.w.small_weight
        };
        self.bs.read_bits(bits)
    }

    /// Reads an internal (same block) reference relative to `node_index`.
    /// A zero delta is followed by a global link, resolved through `resolve_global`.
    fn internal_or_global(&mut self, node_index: u32, what: &'static str) -> Result<Option<NodeId>> {
        let delta: u32 = self.bs.read_bits(self.w.internal_node_index)?;
        if delta == 0 {
            let block: u32 = self.bs.read_bits(self.w.global_node_block)?;
            let index: u32 = self.bs.read_bits(self.w.global_node_index)?;
            let global_id =
                GlobalNodeId::new(BlockId::new(self.block_id.package_id, block), index);
            (self.resolve_global)(global_id)
        } else {
            let index = node_index.checked_sub(delta).ok_or(Error::BadReference {
                block: self.block_id,
                what,
            })?;
            Ok(Some(NodeId::new(self.block_id, index)))
        }
    }

    fn edge(&mut self, node_index: u32) -> Result<Edge> {
        let target = if self.bs.read_bit()? {
            let delta: u32 = self.bs.read_bits(self.w.external_node_block)?;
            let block = self
                .block_id
                .block_index
                .checked_sub(delta)
                .ok_or(Error::BadReference {
                    block: self.block_id,
                    what: "external edge target",
                })?;
            let index: u32 = self.bs.read_bits(self.w.external_node_index)?;
            Some(NodeId::new(
                BlockId::new(self.block_id.package_id, block),
                index,
            ))
        } else {
            self.internal_or_global(node_index, "internal edge target")?
        };

        let forward = self.bs.read_bit()?;
        let backward = self.bs.read_bit()?;
        let weight = self.weight()?;

        let mut edge = Edge {
            target,
            contracted: false,
            contracted_node: None,
            forward,
            backward,
            weight,
            turn_instruction: 0,
        };

        if self.bs.read_bit()? {
            edge.contracted = true;
            edge.contracted_node = if self.bs.read_bit()? {
                let delta = decode_zig_zag(self.bs.read_bits(self.w.contracted_node_block)?);
                let block = self
                    .block_id
                    .block_index
                    .checked_add_signed(delta)
                    .ok_or(Error::BadReference {
                        block: self.block_id,
                        what: "contracted node",
                    })?;
                let index: u32 = self.bs.read_bits(self.w.contracted_node_index)?;
                Some(NodeId::new(
                    BlockId::new(self.block_id.package_id, block),
                    index,
                ))
            } else {
                self.internal_or_global(node_index, "internal contracted node")?
            };
        } else {
            edge.turn_instruction = self.bs.read_bits(self.w.instruction)?;
        }

        Ok(edge)
    }
}

/// Decodes a block of the `NODE` section.
///
/// `resolve_global` maps cross-package links (stored as [GlobalNodeIds](GlobalNodeId)
/// into the `LINK` section of the same package) onto actual nodes.
pub fn decode_node_block<R>(bs: &mut BitReader, block_id: BlockId, resolve_global: R) -> Result<NodeBlock>
where
    R: FnMut(GlobalNodeId) -> Result<Option<NodeId>>,
{
    let w = Widths::read(bs)?;
    let min_geometry_block: u32 = bs.read_bits(w.geometry_block)?;
    let min_name_block: u32 = bs.read_bits(w.name_block)?;
    let (node_count, capacity) = read_count(bs)?;

    let mut d = Decoder {
        bs,
        block_id,
        w,
        resolve_global,
    };

    let package_id = block_id.package_id;
    let mut nodes = Vec::with_capacity(capacity);
    let mut edges = Vec::new();
    let mut edge_counts = Vec::with_capacity(capacity);

    for node_index in 0..node_count {
        let edge_count: u32 = d.bs.read_bits(d.w.node_out_degree)?;

        let geometry_block = block_offset(min_geometry_block, d.bs.read_bits(d.w.geometry_block_diff)?, block_id)?;
        let geometry_index: u32 = d.bs.read_bits(d.w.geometry_index)?;
        let geometry_reversed = d.bs.read_bit()?;

        let name_block = block_offset(min_name_block, d.bs.read_bits(d.w.name_block_diff)?, block_id)?;
        let name_index: u32 = d.bs.read_bits(d.w.name_index)?;

        let travel_mode: u8 = d.bs.read_bits(d.w.travel_mode)?;
        let weight = d.weight()?;

        nodes.push(Node {
            geometry_id: GeometryId::new(BlockId::new(package_id, geometry_block), geometry_index),
            geometry_reversed,
            name_id: NameId::new(BlockId::new(package_id, name_block), name_index),
            weight,
            travel_mode,
            first_edge: 0,
            last_edge: 0,
        });

        edge_counts.push(edge_count);
        for _ in 0..edge_count {
            edges.push(d.edge(node_index)?);
        }
    }

    link_edges(&mut nodes, &edge_counts, edges.len(), block_id)?;
    log::debug!(
        "decoded node block {}: {} nodes, {} edges",
        block_id,
        nodes.len(),
        edges.len()
    );

    Ok(NodeBlock {
        nodes,
        edges,
        geometry_bounds: OnceLock::new(),
    })
}

fn block_offset(min: u32, diff: u32, block_id: BlockId) -> Result<u32> {
    min.checked_add(diff).ok_or(Error::BadReference {
        block: block_id,
        what: "block offset",
    })
}

/// Assigns consecutive edge ranges to nodes. The ranges must exactly cover
/// all `edge_total` edges of the block.
fn link_edges(nodes: &mut [Node], edge_counts: &[u32], edge_total: usize, block_id: BlockId) -> Result<()> {
    let mut edge_index: u64 = 0;
    for (node, &count) in nodes.iter_mut().zip(edge_counts) {
        node.first_edge = edge_index as u32;
        edge_index += count as u64;
        node.last_edge = edge_index.min(u32::MAX as u64) as u32;
    }

    if edge_index != edge_total as u64 {
        return Err(Error::EdgeCountMismatch {
            block: block_id,
            claimed: edge_index as usize,
            actual: edge_total,
        });
    }
    Ok(())
}
