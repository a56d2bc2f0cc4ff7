// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Read-only routing graph over compact, bit-packed package files.
//!
//! A road network is split into packages (e.g. one per region). Each package is
//! an EIFF container with five blocked sections: nodes with their edges, node
//! geometries, node names, cross-package links and an R-tree spatial index.
//! Blocks are decoded lazily and kept in bounded LRU caches, so only the parts of
//! the network which are actually touched are ever held in memory.
//!
//! Edges crossing package boundaries resolve once the target package is imported;
//! until then they point nowhere (see [Edge::target]).
//!
//! # Example
//!
//! ```no_run
//! let g = routegraph::Graph::default();
//! g.import_file("path/to/pl-mazowieckie.rgph").expect("failed to import package");
//!
//! let nearest = g
//!     .find_nearest_node(routegraph::WgsPos::new(52.2297, 21.0122))
//!     .expect("failed to search the graph");
//!
//! for candidate in nearest {
//!     let node = g.get_node(candidate.node_id).expect("failed to load node");
//!     println!(
//!         "{}: {} edges, {:?}",
//!         g.get_node_name(&node).unwrap(),
//!         node.edges().len(),
//!         g.get_node_geometry(&node).unwrap(),
//!     );
//! }
//! ```

pub mod bitstream;
pub mod blocks;
mod cache;
pub mod eiff;
mod error;
pub mod geo;
mod graph;
mod id;
mod nearest;
pub mod package;

#[cfg(test)]
mod testing;

pub use blocks::{Edge, Node, NodeBlock, TravelMode, TurnInstruction};
pub use cache::BlockCache;
pub use eiff::{FileSource, Source, Tag};
pub use error::{Error, Result};
pub use geo::{Point, WgsBounds, WgsPos};
pub use graph::{Graph, NodePtr, Settings};
pub use id::{
    BlockId, ElementId, ElementKind, GeometryId, GlobalNodeId, NameId, NodeId, PackageId,
    RTreeNodeId,
};
pub use nearest::{NearestNode, DISTANCE_TOLERANCE};
pub use package::PackageInfo;
