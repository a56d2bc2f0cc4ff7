// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Encoders producing packages and blocks for tests.

use crate::geo::Point;
use crate::eiff::Tag;
use crate::package::{GEOM, HEAD, LINK, NAME, NODE, RTRE, VERSION};

/// Number of bits required to store `value`.
pub(crate) fn bits_for(value: u64) -> u32 {
    64 - value.leading_zeros()
}

pub(crate) fn encode_zig_zag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Writes values MSB-first, the way [BitReader](crate::bitstream::BitReader) reads them.
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    data: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub(crate) fn write_bit(&mut self, bit: bool) {
        if self.bits % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 0x80 >> (self.bits % 8);
            }
        }
        self.bits += 1;
    }

    pub(crate) fn write_bits(&mut self, value: u64, bits: u32) {
        assert!(bits_for(value) <= bits, "{} does not fit in {} bits", value, bits);
        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    pub(crate) fn write_width(&mut self, bits: u32) {
        self.write_bits(bits as u64, 6);
    }

    pub(crate) fn write_i32(&mut self, value: i32) {
        self.write_bits(value as u32 as u64, 32);
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_bits(b as u64, 8);
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Builds an EIFF `FORM` chunk.
pub(crate) struct ChunkWriter {
    form_type: [u8; 4],
    body: Vec<u8>,
}

impl ChunkWriter {
    pub(crate) fn form(form_type: [u8; 4]) -> Self {
        Self {
            form_type,
            body: Vec::new(),
        }
    }

    pub(crate) fn data(&mut self, tag: [u8; 4], payload: &[u8]) {
        self.body.extend_from_slice(&tag);
        self.body.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        self.body.extend_from_slice(payload);
    }

    /// Appends already encoded chunks, e.g. a nested form.
    pub(crate) fn raw(&mut self, chunks: &[u8]) {
        self.body.extend_from_slice(chunks);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 16);
        out.extend_from_slice(&Tag::FORM.0);
        out.extend_from_slice(&(self.body.len() as u64 + 4).to_le_bytes());
        out.extend_from_slice(&self.form_type);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Lays out blocks into a section: block count, offset table and the payloads.
pub(crate) fn encode_section(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());

    let mut offset = 4 + (blocks.len() as u64 + 1) * 8;
    out.extend_from_slice(&offset.to_le_bytes());
    for block in blocks {
        offset += block.len() as u64;
        out.extend_from_slice(&offset.to_le_bytes());
    }

    for block in blocks {
        out.extend_from_slice(block);
    }
    out
}

/// Assembles a complete package file from pre-encoded blocks.
pub(crate) struct PackageBuilder {
    pub name: String,
    pub version: u32,
    pub bounds: (Point, Point),
    pub node_blocks: Vec<Vec<u8>>,
    pub geometry_blocks: Vec<Vec<u8>>,
    pub name_blocks: Vec<Vec<u8>>,
    pub link_blocks: Vec<Vec<u8>>,
    pub rtree_blocks: Vec<Vec<u8>>,

    /// Section left out of the package.
    pub omit: Option<Tag>,

    /// Replaces the whole encoded `NODE` section.
    pub raw_node_section: Option<Vec<u8>>,
}

impl PackageBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: VERSION,
            bounds: (Point::default(), Point::default()),
            node_blocks: Vec::new(),
            geometry_blocks: Vec::new(),
            name_blocks: Vec::new(),
            link_blocks: Vec::new(),
            rtree_blocks: Vec::new(),
            omit: None,
            raw_node_section: None,
        }
    }

    fn header(&self) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.write_bits(self.version as u64, 32);
        w.write_bits(self.name.len() as u64, 16);
        w.write_bytes(self.name.as_bytes());
        w.write_i32(self.bounds.0.lat);
        w.write_i32(self.bounds.0.lon);
        w.write_i32(self.bounds.1.lat);
        w.write_i32(self.bounds.1.lon);
        w.finish()
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let node_section = match &self.raw_node_section {
            Some(raw) => raw.clone(),
            None => encode_section(&self.node_blocks),
        };
        let sections = [
            (HEAD, self.header()),
            (NODE, node_section),
            (GEOM, encode_section(&self.geometry_blocks)),
            (NAME, encode_section(&self.name_blocks)),
            (LINK, encode_section(&self.link_blocks)),
            (RTRE, encode_section(&self.rtree_blocks)),
        ];

        let mut w = ChunkWriter::form(*b"RGPH");
        for (tag, payload) in sections {
            if self.omit != Some(tag) {
                w.data(tag.0, &payload);
            }
        }
        w.finish()
    }
}

pub(crate) fn encode_geometry_block(geometries: &[Vec<Point>]) -> Vec<u8> {
    let min_lat = geometries.iter().map(|g| g[0].lat).min().unwrap_or(0);
    let min_lon = geometries.iter().map(|g| g[0].lon).min().unwrap_or(0);
    let lat_diff = |g: &Vec<Point>| g[0].lat.wrapping_sub(min_lat) as u32 as u64;
    let lon_diff = |g: &Vec<Point>| g[0].lon.wrapping_sub(min_lon) as u32 as u64;
    let zig_zag_deltas = |g: &Vec<Point>| -> Vec<(u64, u64)> {
        g.windows(2)
            .map(|w| {
                (
                    encode_zig_zag(w[1].lat.wrapping_sub(w[0].lat)) as u64,
                    encode_zig_zag(w[1].lon.wrapping_sub(w[0].lon)) as u64,
                )
            })
            .collect()
    };

    let lat_diff_bits = geometries.iter().map(|g| bits_for(lat_diff(g))).max().unwrap_or(0);
    let lon_diff_bits = geometries.iter().map(|g| bits_for(lon_diff(g))).max().unwrap_or(0);
    let size_bits = geometries.iter().map(|g| bits_for(g.len() as u64 - 1)).max().unwrap_or(0);

    let mut w = BitWriter::default();
    w.write_width(lat_diff_bits);
    w.write_width(lon_diff_bits);
    w.write_width(size_bits);
    w.write_i32(min_lat);
    w.write_i32(min_lon);
    w.write_bits(geometries.len() as u64, 32);
    for g in geometries {
        let deltas = zig_zag_deltas(g);
        let lat_bits = deltas.iter().map(|d| bits_for(d.0)).max().unwrap_or(0);
        let lon_bits = deltas.iter().map(|d| bits_for(d.1)).max().unwrap_or(0);
        w.write_width(lat_bits);
        w.write_width(lon_bits);
        w.write_bits(lat_diff(g), lat_diff_bits);
        w.write_bits(lon_diff(g), lon_diff_bits);
        w.write_bits(deltas.len() as u64, size_bits);
        for (lat, lon) in deltas {
            w.write_bits(lat, lat_bits);
            w.write_bits(lon, lon_bits);
        }
    }
    w.finish()
}

pub(crate) fn encode_name_block(names: &[&str]) -> Vec<u8> {
    let length_bits = names.iter().map(|n| bits_for(n.len() as u64)).max().unwrap_or(0);

    let mut w = BitWriter::default();
    w.write_width(length_bits);
    w.write_bits(names.len() as u64, 32);
    for name in names {
        w.write_bits(name.len() as u64, length_bits);
        w.write_bytes(name.as_bytes());
    }
    w.finish()
}

/// Encodes a `LINK` block. Every global node lists its locations
/// as `(package index, block index, node index)`.
pub(crate) fn encode_global_node_block(packages: &[&str], nodes: &[Vec<(u32, u32, u32)>]) -> Vec<u8> {
    let entries = || nodes.iter().flatten();
    let name_bits = packages.iter().map(|p| bits_for(p.len() as u64)).max().unwrap_or(0);
    let per_node_bits = nodes
        .iter()
        .map(|n| bits_for(n.len() as u64))
        .chain(entries().map(|e| bits_for(e.0 as u64)))
        .max()
        .unwrap_or(0);
    let block_bits = entries().map(|e| bits_for(e.1 as u64)).max().unwrap_or(0);
    let index_bits = entries().map(|e| bits_for(e.2 as u64)).max().unwrap_or(0);

    let mut w = BitWriter::default();
    w.write_width(name_bits);
    w.write_width(per_node_bits);
    w.write_width(block_bits);
    w.write_width(index_bits);
    w.write_bits(packages.len() as u64, 32);
    for name in packages {
        w.write_bits(name.len() as u64, name_bits);
        w.write_bytes(name.as_bytes());
    }
    w.write_bits(nodes.len() as u64, 32);
    for node in nodes {
        w.write_bits(node.len() as u64, per_node_bits);
        for &(package, block, index) in node {
            w.write_bits(package as u64, per_node_bits);
            w.write_bits(block as u64, block_bits);
            w.write_bits(index as u64, index_bits);
        }
    }
    w.finish()
}

/// An r-tree node to encode; children carry their bounds as two corners.
pub(crate) enum TestRTreeNode {
    /// Children as `(corners, (r-tree block, r-tree node index))`.
    Internal(Vec<((Point, Point), (u32, u32))>),

    /// Node blocks as `(corners, node block)`.
    Leaf(Vec<((Point, Point), u32)>),
}

impl TestRTreeNode {
    fn children(&self) -> Vec<(Point, Point)> {
        let corners: Vec<(Point, Point)> = match self {
            Self::Internal(c) => c.iter().map(|c| c.0).collect(),
            Self::Leaf(c) => c.iter().map(|c| c.0).collect(),
        };
        corners
            .into_iter()
            .map(|(a, b)| {
                (
                    Point::new(a.lat.min(b.lat), a.lon.min(b.lon)),
                    Point::new(a.lat.max(b.lat), a.lon.max(b.lon)),
                )
            })
            .collect()
    }
}

pub(crate) fn encode_rtree_node_block(nodes: &[TestRTreeNode]) -> Vec<u8> {
    let all_bounds: Vec<(Point, Point)> = nodes.iter().flat_map(|n| n.children()).collect();
    let min_lat = all_bounds.iter().map(|b| b.0.lat).min().unwrap_or(0);
    let min_lon = all_bounds.iter().map(|b| b.0.lon).min().unwrap_or(0);

    let max_bits = |f: fn(&(Point, Point), Point) -> i32| {
        let min = Point::new(min_lat, min_lon);
        all_bounds.iter().map(|b| bits_for(f(b, min) as u32 as u64)).max().unwrap_or(0)
    };
    let lat_diff_bits = max_bits(|b, min| b.0.lat - min.lat);
    let lon_diff_bits = max_bits(|b, min| b.0.lon - min.lon);
    let lat_size_bits = max_bits(|b, _| b.1.lat - b.0.lat);
    let lon_size_bits = max_bits(|b, _| b.1.lon - b.0.lon);

    let mut rtree_block_bits = 0;
    let mut rtree_index_bits = 0;
    let mut node_block_bits = 0;
    let mut size_bits = 0;
    for node in nodes {
        match node {
            TestRTreeNode::Internal(c) => {
                size_bits = size_bits.max(bits_for(c.len() as u64));
                for (_, (block, index)) in c {
                    rtree_block_bits = rtree_block_bits.max(bits_for(*block as u64));
                    rtree_index_bits = rtree_index_bits.max(bits_for(*index as u64));
                }
            }
            TestRTreeNode::Leaf(c) => {
                size_bits = size_bits.max(bits_for(c.len() as u64));
                for (_, block) in c {
                    node_block_bits = node_block_bits.max(bits_for(*block as u64));
                }
            }
        }
    }

    let mut w = BitWriter::default();
    for bits in [
        rtree_block_bits,
        rtree_index_bits,
        node_block_bits,
        size_bits,
        lat_diff_bits,
        lon_diff_bits,
        lat_size_bits,
        lon_size_bits,
    ] {
        w.write_width(bits);
    }
    w.write_i32(min_lat);
    w.write_i32(min_lon);
    w.write_bits(nodes.len() as u64, 32);

    for node in nodes {
        let bounds = node.children();
        w.write_bit(matches!(node, TestRTreeNode::Leaf(_)));
        w.write_bits(bounds.len() as u64, size_bits);
        for (i, (lo, hi)) in bounds.into_iter().enumerate() {
            w.write_bits((lo.lat - min_lat) as u32 as u64, lat_diff_bits);
            w.write_bits((lo.lon - min_lon) as u32 as u64, lon_diff_bits);
            w.write_bits((hi.lat - lo.lat) as u32 as u64, lat_size_bits);
            w.write_bits((hi.lon - lo.lon) as u32 as u64, lon_size_bits);
            match node {
                TestRTreeNode::Internal(c) => {
                    let (block, index) = c[i].1;
                    w.write_bits(block as u64, rtree_block_bits);
                    w.write_bits(index as u64, rtree_index_bits);
                }
                TestRTreeNode::Leaf(c) => w.write_bits(c[i].1 as u64, node_block_bits),
            }
        }
    }
    w.finish()
}

/// Reference to a node, as written in a node block.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TestRef {
    /// A node of the same block. Targets preceding the referring node use the
    /// compact internal form, others fall back to the external form.
    Internal(u32),

    /// A node of this or a preceding block of the same package.
    External { block: u32, node: u32 },

    /// An entry of the package's `LINK` section.
    Global { block: u32, index: u32 },

    /// External reference with an arbitrary block delta.
    RawExternal { delta: u32, node: u32 },
}

#[derive(Debug, Clone)]
pub(crate) struct TestEdge {
    target: TestRef,
    shortcut_of: Option<TestRef>,
    forward: bool,
    backward: bool,
    weight: u32,
    instruction: u8,
}

impl TestEdge {
    pub(crate) fn to(target: TestRef) -> Self {
        Self {
            target,
            shortcut_of: None,
            forward: true,
            backward: true,
            weight: 1,
            instruction: 0,
        }
    }

    pub(crate) fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub(crate) fn instruction(mut self, instruction: u8) -> Self {
        self.instruction = instruction;
        self
    }

    pub(crate) fn one_way(mut self) -> Self {
        self.backward = false;
        self
    }

    pub(crate) fn shortcut(mut self, contracted_node: TestRef) -> Self {
        self.shortcut_of = Some(contracted_node);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TestNode {
    /// `(block, index)` of the geometry.
    pub geometry: (u32, u32),
    pub geometry_reversed: bool,

    /// `(block, index)` of the name.
    pub name: (u32, u32),
    pub travel_mode: u8,
    pub weight: u32,
    pub edges: Vec<TestEdge>,
}

impl TestNode {
    /// A node without edges, using geometry and name from block 0.
    pub(crate) fn at(geometry_index: u32, name_index: u32) -> Self {
        Self {
            geometry: (0, geometry_index),
            geometry_reversed: false,
            name: (0, name_index),
            travel_mode: 0,
            weight: 1,
            edges: Vec::new(),
        }
    }

    pub(crate) fn edges(mut self, edges: Vec<TestEdge>) -> Self {
        self.edges = edges;
        self
    }

    pub(crate) fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Fields of a node block, in the order of the block header.
#[derive(Debug, Clone, Copy)]
enum Field {
    InternalIndex,
    ExternalBlock,
    ExternalIndex,
    GlobalBlock,
    GlobalIndex,
    ContractedBlock,
    ContractedIndex,
    GeometryBlock,
    GeometryBlockDiff,
    GeometryIndex,
    NameBlock,
    NameBlockDiff,
    NameIndex,
    OutDegree,
    TravelMode,
    Instruction,
    SmallWeight,
    LargeWeight,
}

const FIELD_COUNT: usize = 18;
const SMALL_WEIGHT_LIMIT: u32 = 16;

/// Receives the fields of a node block: either to size them, or to write them.
trait NodeSink {
    fn bit(&mut self, bit: bool);
    fn field(&mut self, field: Field, value: u64);
    fn fixed(&mut self, value: u64, bits: u32);
}

#[derive(Default)]
struct WidthCollector([u32; FIELD_COUNT]);

impl NodeSink for WidthCollector {
    fn bit(&mut self, _: bool) {}

    fn field(&mut self, field: Field, value: u64) {
        let w = &mut self.0[field as usize];
        *w = (*w).max(bits_for(value));
    }

    fn fixed(&mut self, _: u64, _: u32) {}
}

struct FieldWriter {
    w: BitWriter,
    widths: [u32; FIELD_COUNT],
}

impl NodeSink for FieldWriter {
    fn bit(&mut self, bit: bool) {
        self.w.write_bit(bit);
    }

    fn field(&mut self, field: Field, value: u64) {
        self.w.write_bits(value, self.widths[field as usize]);
    }

    fn fixed(&mut self, value: u64, bits: u32) {
        self.w.write_bits(value, bits);
    }
}

/// Encodes a single node block.
pub(crate) struct NodeBlockBuilder {
    block_index: u32,
    nodes: Vec<TestNode>,
}

impl NodeBlockBuilder {
    pub(crate) fn new(block_index: u32) -> Self {
        Self {
            block_index,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn node(&mut self, node: TestNode) {
        self.nodes.push(node);
    }

    pub(crate) fn finish(&self) -> Vec<u8> {
        let mut sizes = WidthCollector::default();
        self.emit(&mut sizes);

        let mut writer = FieldWriter {
            w: BitWriter::default(),
            widths: sizes.0,
        };
        for bits in sizes.0 {
            writer.w.write_width(bits);
        }
        self.emit(&mut writer);
        writer.w.finish()
    }

    fn emit<S: NodeSink>(&self, s: &mut S) {
        let min_geometry_block = self.nodes.iter().map(|n| n.geometry.0).min().unwrap_or(0);
        let min_name_block = self.nodes.iter().map(|n| n.name.0).min().unwrap_or(0);
        s.field(Field::GeometryBlock, min_geometry_block as u64);
        s.field(Field::NameBlock, min_name_block as u64);
        s.fixed(self.nodes.len() as u64, 32);

        for (index, node) in self.nodes.iter().enumerate() {
            let index = index as u32;
            s.field(Field::OutDegree, node.edges.len() as u64);
            s.field(Field::GeometryBlockDiff, (node.geometry.0 - min_geometry_block) as u64);
            s.field(Field::GeometryIndex, node.geometry.1 as u64);
            s.bit(node.geometry_reversed);
            s.field(Field::NameBlockDiff, (node.name.0 - min_name_block) as u64);
            s.field(Field::NameIndex, node.name.1 as u64);
            s.field(Field::TravelMode, node.travel_mode as u64);
            emit_weight(s, node.weight);

            for edge in &node.edges {
                self.emit_target(s, index, edge.target);
                s.bit(edge.forward);
                s.bit(edge.backward);
                emit_weight(s, edge.weight);
                s.bit(edge.shortcut_of.is_some());
                match edge.shortcut_of {
                    Some(contracted) => self.emit_contracted(s, index, contracted),
                    None => s.field(Field::Instruction, edge.instruction as u64),
                }
            }
        }
    }

    /// Emits the fields shared by edge targets and contracted nodes
    /// for same-block and global references.
    fn emit_internal<S: NodeSink>(s: &mut S, node_index: u32, r: TestRef) {
        match r {
            TestRef::Internal(target) => s.field(Field::InternalIndex, (node_index - target) as u64),
            TestRef::Global { block, index } => {
                s.field(Field::InternalIndex, 0);
                s.field(Field::GlobalBlock, block as u64);
                s.field(Field::GlobalIndex, index as u64);
            }
            _ => unreachable!("not an internal reference: {:?}", r),
        }
    }

    /// Rewrites same-block references which can't use the internal form.
    fn normalize(&self, node_index: u32, r: TestRef) -> TestRef {
        match r {
            TestRef::Internal(target) if target >= node_index => TestRef::External {
                block: self.block_index,
                node: target,
            },
            r => r,
        }
    }

    fn emit_target<S: NodeSink>(&self, s: &mut S, node_index: u32, r: TestRef) {
        match self.normalize(node_index, r) {
            TestRef::External { block, node } => {
                s.bit(true);
                s.field(Field::ExternalBlock, (self.block_index - block) as u64);
                s.field(Field::ExternalIndex, node as u64);
            }
            TestRef::RawExternal { delta, node } => {
                s.bit(true);
                s.field(Field::ExternalBlock, delta as u64);
                s.field(Field::ExternalIndex, node as u64);
            }
            r => {
                s.bit(false);
                Self::emit_internal(s, node_index, r);
            }
        }
    }

    fn emit_contracted<S: NodeSink>(&self, s: &mut S, node_index: u32, r: TestRef) {
        match self.normalize(node_index, r) {
            TestRef::External { block, node } => {
                s.bit(true);
                let delta = block as i32 - self.block_index as i32;
                s.field(Field::ContractedBlock, encode_zig_zag(delta) as u64);
                s.field(Field::ContractedIndex, node as u64);
            }
            TestRef::RawExternal { delta, node } => {
                s.bit(true);
                s.field(Field::ContractedBlock, encode_zig_zag(delta as i32) as u64);
                s.field(Field::ContractedIndex, node as u64);
            }
            r => {
                s.bit(false);
                Self::emit_internal(s, node_index, r);
            }
        }
    }
}

fn emit_weight<S: NodeSink>(s: &mut S, weight: u32) {
    let large = weight >= SMALL_WEIGHT_LIMIT;
    s.bit(large);
    let field = if large { Field::LargeWeight } else { Field::SmallWeight };
    s.field(field, weight as u64);
}

/// Converts degrees into fixed-point coordinates, rounding to the nearest unit.
fn point(lat: f64, lon: f64) -> Point {
    Point::new((lat * 1e6).round() as i32, (lon * 1e6).round() as i32)
}

/// Builds a whole, queryable package out of named polylines.
///
/// Every line becomes one node. All geometries and names live in block 0 of their sections;
/// nodes are spread over node blocks with [new_block](LinePackage::new_block).
/// The r-tree has an internal root (node 0) with one leaf per node block.
pub(crate) struct LinePackage {
    name: String,
    geometries: Vec<Vec<Point>>,
    names: Vec<String>,
    blocks: Vec<Vec<TestNode>>,
}

impl LinePackage {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            geometries: Vec::new(),
            names: Vec::new(),
            blocks: vec![Vec::new()],
        }
    }

    fn current_block(&mut self) -> &mut Vec<TestNode> {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    /// Adds a node following `positions`, to the current node block.
    pub(crate) fn line(&mut self, name: &str, positions: &[(f64, f64)]) {
        self.geometries
            .push(positions.iter().map(|&(lat, lon)| point(lat, lon)).collect());
        self.names.push(name.to_string());
        let node = TestNode::at(self.geometries.len() as u32 - 1, self.names.len() as u32 - 1);
        self.current_block().push(node);
    }

    /// Adds a node sharing the geometry and name of node `index` of the current block,
    /// but traveling in the opposite direction.
    pub(crate) fn reversed_twin(&mut self, index: usize) {
        let block = self.current_block();
        let mut twin = block[index].clone();
        twin.geometry_reversed = !twin.geometry_reversed;
        twin.edges.clear();
        block.push(twin);
    }

    pub(crate) fn edge(&mut self, index: usize, edge: TestEdge) {
        self.current_block()[index].edges.push(edge);
    }

    pub(crate) fn new_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    fn bounds_of<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> (Point, Point) {
        let mut lo = Point::new(i32::MAX, i32::MAX);
        let mut hi = Point::new(i32::MIN, i32::MIN);
        for p in points {
            lo = Point::new(lo.lat.min(p.lat), lo.lon.min(p.lon));
            hi = Point::new(hi.lat.max(p.lat), hi.lon.max(p.lon));
        }
        (lo, hi)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut p = PackageBuilder::new(&self.name);
        p.bounds = Self::bounds_of(self.geometries.iter().flatten());
        p.geometry_blocks = vec![encode_geometry_block(&self.geometries)];
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        p.name_blocks = vec![encode_name_block(&names)];

        let mut leaves = Vec::new();
        for (i, nodes) in self.blocks.iter().enumerate() {
            let mut b = NodeBlockBuilder::new(i as u32);
            for node in nodes {
                b.node(node.clone());
            }
            p.node_blocks.push(b.finish());

            let bounds = Self::bounds_of(
                nodes
                    .iter()
                    .flat_map(|n| &self.geometries[n.geometry.1 as usize]),
            );
            leaves.push(TestRTreeNode::Leaf(vec![(bounds, i as u32)]));
        }

        let root = TestRTreeNode::Internal(
            leaves
                .iter()
                .enumerate()
                .map(|(i, leaf)| (leaf.children()[0], (0, i as u32 + 1)))
                .collect(),
        );
        let mut rtree = vec![root];
        rtree.extend(leaves);
        p.rtree_blocks = vec![encode_rtree_node_block(&rtree)];
        p.build()
    }
}
