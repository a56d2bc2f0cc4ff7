// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::blocks::{
    decode_geometry_block, decode_global_node_block, decode_name_block, decode_node_block,
    decode_rtree_node_block, Edge, GeometryBlock, GlobalNodeBlock, NameBlock, Node, NodeBlock,
    RTreeNodeBlock,
};
use crate::cache::BlockCache;
use crate::eiff::{FileSource, Source};
use crate::error::{Error, Result};
use crate::geo::WgsPos;
use crate::nearest::{self, NearestNode};
use crate::package::{Package, PackageInfo};
use crate::{BlockId, GlobalNodeId, NodeId, PackageId};

/// Capacities of the per-category block caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub node_block_cache_size: usize,
    pub geometry_block_cache_size: usize,
    pub name_block_cache_size: usize,
    pub global_node_block_cache_size: usize,
    pub rtree_node_block_cache_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_block_cache_size: 512,
            geometry_block_cache_size: 512,
            name_block_cache_size: 64,
            global_node_block_cache_size: 64,
            rtree_node_block_cache_size: 16,
        }
    }
}

/// Read-only routing graph backed by imported package files.
///
/// Blocks of the packages are decoded lazily and kept in bounded LRU caches.
/// All methods take a single internal lock for their whole duration,
/// so a Graph may be freely shared between threads.
pub struct Graph {
    state: Mutex<State>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Graph")
            .field("packages", &state.packages.len())
            .field("node_blocks", &state.node_blocks.len())
            .field("geometry_blocks", &state.geometry_blocks.len())
            .field("name_blocks", &state.name_blocks.len())
            .field("global_node_blocks", &state.global_node_blocks.len())
            .field("rtree_node_blocks", &state.rtree_node_blocks.len())
            .finish()
    }
}

impl Graph {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: Mutex::new(State::new(settings)),
        }
    }

    /// Imports a package file from disk. See [import_source](Graph::import_source).
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<PackageId> {
        let source = FileSource::open(path)?;
        self.import_source(Arc::new(source))
    }

    /// Imports a package, returning its newly assigned [PackageId].
    ///
    /// Only the container structure and the header are read here. On failure
    /// the graph is left untouched.
    pub fn import_source(&self, source: Arc<dyn Source>) -> Result<PackageId> {
        self.state.lock().import(source)
    }

    /// Lists all imported packages, in import order.
    pub fn packages(&self) -> Vec<PackageInfo> {
        self.state.lock().packages.iter().map(PackageInfo::from).collect()
    }

    /// Retrieves a [Node] by its id.
    ///
    /// The returned [NodePtr] keeps the whole decoded block alive,
    /// regardless of what happens to the cache afterwards.
    pub fn get_node(&self, node_id: NodeId) -> Result<NodePtr> {
        self.state.lock().node(node_id)
    }

    /// Retrieves the name of a [Node].
    pub fn get_node_name(&self, node: &Node) -> Result<String> {
        let mut state = self.state.lock();
        let block = state.name_block(node.name_id.block_id)?;
        Ok(block.name(node.name_id.element_index)?.to_string())
    }

    /// Retrieves the geometry of a [Node], in the node's direction of travel.
    pub fn get_node_geometry(&self, node: &Node) -> Result<Vec<WgsPos>> {
        self.state.lock().node_geometry(node)
    }

    /// Finds the nodes whose geometries pass closest to `pos`.
    ///
    /// Multiple candidates are returned when their distances are within
    /// [DISTANCE_TOLERANCE](crate::DISTANCE_TOLERANCE) of the best one
    /// (e.g. both directions of a road, or parallel roads).
    /// An empty vector is returned if no packages are loaded.
    pub fn find_nearest_node(&self, pos: WgsPos) -> Result<Vec<NearestNode>> {
        let mut state = self.state.lock();
        nearest::find_nearest_node(&mut state, pos)
    }

    #[cfg(test)]
    pub(crate) fn lock_state(&self) -> parking_lot::MutexGuard<'_, State> {
        self.state.lock()
    }
}

/// A [Node] together with the decoded block owning it.
#[derive(Clone)]
pub struct NodePtr {
    block: Arc<NodeBlock>,
    id: NodeId,
}

impl NodePtr {
    fn new(block: Arc<NodeBlock>, id: NodeId) -> Result<Self> {
        block.node(id.element_index)?;
        Ok(Self { block, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the outgoing edges of this node.
    pub fn edges(&self) -> &[Edge] {
        self.block.edges_of(self)
    }

    /// Returns the targets of all outgoing edges, skipping edges leading into packages
    /// which are not loaded.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges().iter().filter_map(|e| e.target)
    }
}

impl Deref for NodePtr {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.block.nodes[self.id.element_index as usize]
    }
}

impl fmt::Debug for NodePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePtr")
            .field("id", &self.id)
            .field("node", self.deref())
            .finish()
    }
}

/// Everything guarded by the [Graph] lock.
///
/// Methods of the state never lock anything, so they can freely call each other -
/// e.g. decoding a node block resolves global links through the link block cache.
pub(crate) struct State {
    packages: Vec<Package>,
    node_blocks: BlockCache<BlockId, Arc<NodeBlock>>,
    geometry_blocks: BlockCache<BlockId, Arc<GeometryBlock>>,
    name_blocks: BlockCache<BlockId, Arc<NameBlock>>,
    global_node_blocks: BlockCache<BlockId, Arc<GlobalNodeBlock>>,
    rtree_node_blocks: BlockCache<BlockId, Arc<RTreeNodeBlock>>,
}

impl State {
    fn new(settings: Settings) -> Self {
        Self {
            packages: Vec::new(),
            node_blocks: BlockCache::new(settings.node_block_cache_size),
            geometry_blocks: BlockCache::new(settings.geometry_block_cache_size),
            name_blocks: BlockCache::new(settings.name_block_cache_size),
            global_node_blocks: BlockCache::new(settings.global_node_block_cache_size),
            rtree_node_blocks: BlockCache::new(settings.rtree_node_block_cache_size),
        }
    }

    fn import(&mut self, source: Arc<dyn Source>) -> Result<PackageId> {
        let id = self.packages.len() as PackageId;
        let package = Package::open(id, source)?;
        log::debug!(
            "imported package {} as {} ({} node blocks)",
            package.name,
            id,
            package.nodes.block_count()
        );
        self.packages.push(package);

        // Links to the new package might have been resolved to nothing
        self.node_blocks.clear();
        self.global_node_blocks.clear();
        Ok(id)
    }

    pub(crate) fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn package(packages: &[Package], id: PackageId) -> Result<&Package> {
        packages
            .get(id as usize)
            .ok_or_else(|| Error::out_of_range("package", id, packages.len()))
    }

    pub(crate) fn node(&mut self, node_id: NodeId) -> Result<NodePtr> {
        let block = self.node_block(node_id.block_id)?;
        NodePtr::new(block, node_id)
    }

    pub(crate) fn node_block(&mut self, block_id: BlockId) -> Result<Arc<NodeBlock>> {
        if let Some(block) = self.node_blocks.read(&block_id) {
            return Ok(block);
        }
        log::trace!("node block cache miss: {}", block_id);

        let mut bs = Self::package(&self.packages, block_id.package_id)?
            .nodes
            .read_block(block_id.block_index)?;
        let block = Arc::new(decode_node_block(&mut bs, block_id, |id| {
            self.resolve_global_node(id)
        })?);

        self.node_blocks.put(block_id, block.clone());
        Ok(block)
    }

    fn resolve_global_node(&mut self, id: GlobalNodeId) -> Result<Option<NodeId>> {
        let packages = &self.packages;
        let block = self.global_node_blocks.get_or_load(id.block_id, || {
            log::trace!("link block cache miss: {}", id.block_id);
            let mut bs = Self::package(packages, id.block_id.package_id)?
                .global_nodes
                .read_block(id.block_id.block_index)?;
            let block = decode_global_node_block(&mut bs, id.block_id, |name| {
                packages.iter().find(|p| p.name == name).map(|p| p.id)
            })?;
            Ok::<_, Error>(Arc::new(block))
        })?;
        block.resolve(id.element_index)
    }

    pub(crate) fn geometry_block(&mut self, block_id: BlockId) -> Result<Arc<GeometryBlock>> {
        let packages = &self.packages;
        self.geometry_blocks.get_or_load(block_id, || {
            log::trace!("geometry block cache miss: {}", block_id);
            let mut bs = Self::package(packages, block_id.package_id)?
                .geometries
                .read_block(block_id.block_index)?;
            Ok(Arc::new(decode_geometry_block(&mut bs, block_id)?))
        })
    }

    pub(crate) fn name_block(&mut self, block_id: BlockId) -> Result<Arc<NameBlock>> {
        let packages = &self.packages;
        self.name_blocks.get_or_load(block_id, || {
            log::trace!("name block cache miss: {}", block_id);
            let mut bs = Self::package(packages, block_id.package_id)?
                .names
                .read_block(block_id.block_index)?;
            Ok(Arc::new(decode_name_block(&mut bs, block_id)?))
        })
    }

    pub(crate) fn rtree_node_block(&mut self, block_id: BlockId) -> Result<Arc<RTreeNodeBlock>> {
        let packages = &self.packages;
        self.rtree_node_blocks.get_or_load(block_id, || {
            log::trace!("r-tree block cache miss: {}", block_id);
            let mut bs = Self::package(packages, block_id.package_id)?
                .rtree_nodes
                .read_block(block_id.block_index)?;
            Ok(Arc::new(decode_rtree_node_block(&mut bs, block_id)?))
        })
    }

    pub(crate) fn node_geometry(&mut self, node: &Node) -> Result<Vec<WgsPos>> {
        let block = self.geometry_block(node.geometry_id.block_id)?;
        let points = block.geometry(node.geometry_id.element_index)?;

        let mut geometry: Vec<WgsPos> = points.iter().map(|p| p.to_wgs()).collect();
        if node.geometry_reversed {
            geometry.reverse();
        }
        Ok(geometry)
    }
}
