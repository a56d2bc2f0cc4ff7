// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::blocks::{NodeBlock, RTreeNode};
use crate::error::{Error, Result};
use crate::geo::{bbox_distance, project_on_polyline, Projection, WgsBounds, WgsPos};
use crate::graph::State;
use crate::{BlockId, NodeId, RTreeNodeId};

/// Slack applied to the best distance found so far. Candidates up to 1% further away
/// than the best one are kept, and bounding boxes up to 1% further away are still explored.
pub const DISTANCE_TOLERANCE: f64 = 1.01;

/// A single result of [Graph::find_nearest_node](crate::Graph::find_nearest_node).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestNode {
    /// The point of the node's geometry closest to the query position.
    pub pos: WgsPos,

    pub node_id: NodeId,

    /// 0-based index of the geometry segment containing [pos](NearestNode::pos),
    /// in the node's direction of travel.
    pub segment_index: usize,

    /// Position of [pos](NearestNode::pos) along the node's geometry,
    /// from 0 (start) to 1 (end).
    pub rel_pos: f64,

    /// Approximate distance from the query position to [pos](NearestNode::pos), in degrees.
    pub distance: f64,
}

/// Entry of a best-first search queue.
#[derive(Debug, Clone, Copy)]
struct QueueItem<T> {
    distance: f64,
    item: T,
}

impl<T> PartialEq for QueueItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for QueueItem<T> {}

impl<T> PartialOrd for QueueItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as lower distances are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.distance.total_cmp(&self.distance)
    }
}

/// Running set of the best candidates.
struct Candidates {
    best_distance: f64,
    nodes: Vec<NearestNode>,
}

impl Candidates {
    fn new() -> Self {
        Self {
            best_distance: f64::INFINITY,
            nodes: Vec::new(),
        }
    }

    /// Upper bound of distances still worth exploring.
    fn limit(&self) -> f64 {
        self.best_distance * DISTANCE_TOLERANCE
    }

    fn offer(&mut self, candidate: NearestNode) {
        if candidate.distance > self.limit() {
            return;
        }
        if candidate.distance * DISTANCE_TOLERANCE < self.best_distance {
            self.nodes.clear();
        }
        self.best_distance = self.best_distance.min(candidate.distance);
        self.nodes.push(candidate);
    }

    fn finish(mut self) -> Vec<NearestNode> {
        let limit = self.limit();
        self.nodes.retain(|n| n.distance <= limit);
        self.nodes.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.nodes
    }
}

pub(crate) fn find_nearest_node(state: &mut State, pos: WgsPos) -> Result<Vec<NearestNode>> {
    let mut queue: BinaryHeap<QueueItem<RTreeNodeId>> = state
        .packages()
        .iter()
        .filter(|p| p.rtree_nodes.block_count() > 0)
        .map(|p| QueueItem {
            distance: bbox_distance(pos, &p.bounds),
            item: RTreeNodeId::new(BlockId::new(p.id, 0), 0),
        })
        .collect();

    let mut candidates = Candidates::new();
    while let Some(QueueItem { distance, item: id }) = queue.pop() {
        if distance > candidates.limit() {
            break;
        }

        let block = state.rtree_node_block(id.block_id)?;
        match block.rtree_node(id.element_index)? {
            RTreeNode::Internal(children) => {
                for &(bounds, child) in children {
                    queue.push(QueueItem {
                        distance: bbox_distance(pos, &bounds),
                        item: child,
                    });
                }
            }

            RTreeNode::Leaf(node_blocks) => {
                for &(bounds, block_id) in node_blocks {
                    if bbox_distance(pos, &bounds) <= candidates.limit() {
                        search_node_block(state, pos, block_id, &mut candidates)?;
                    }
                }
            }
        }
    }

    let nodes = candidates.finish();
    log::debug!(
        "nearest node search around ({}, {}): {} candidates",
        pos.lat,
        pos.lon,
        nodes.len()
    );
    Ok(nodes)
}

fn search_node_block(
    state: &mut State,
    pos: WgsPos,
    block_id: BlockId,
    candidates: &mut Candidates,
) -> Result<()> {
    let block = state.node_block(block_id)?;
    let bounds = node_geometry_bounds(state, &block)?;

    let mut queue: BinaryHeap<QueueItem<u32>> = bounds
        .iter()
        .enumerate()
        .map(|(i, b)| QueueItem {
            distance: bbox_distance(pos, b),
            item: i as u32,
        })
        .filter(|q| q.distance <= candidates.limit())
        .collect();

    while let Some(QueueItem { distance, item: index }) = queue.pop() {
        if distance > candidates.limit() {
            break;
        }

        let node = block.node(index)?;
        let geometry = state.node_geometry(node)?;

        let mut closest: Option<Projection> = None;
        project_on_polyline(pos, &geometry, |p| {
            if closest.map_or(true, |c| p.distance < c.distance) {
                closest = Some(p);
            }
        });

        if let Some(p) = closest {
            candidates.offer(NearestNode {
                pos: p.pos,
                node_id: NodeId::new(block_id, index),
                segment_index: p.segment_index,
                rel_pos: p.rel_pos,
                distance: p.distance,
            });
        }
    }

    Ok(())
}

/// Returns bounds of every node's geometry in the block, computing them on first use.
fn node_geometry_bounds<'a>(state: &mut State, block: &'a Arc<NodeBlock>) -> Result<&'a [WgsBounds]> {
    block.geometry_bounds_or_try_init(|| {
        log::trace!("computing geometry bounds of {} nodes", block.nodes.len());
        block
            .nodes
            .iter()
            .map(|node| Ok::<_, Error>(WgsBounds::from_positions(state.node_geometry(node)?)))
            .collect()
    })
}
