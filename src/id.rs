// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Identifies an imported package. Assigned in import order, never reused.
pub type PackageId = u32;

/// Identifies one block within one of the five sections of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockId {
    pub package_id: PackageId,
    pub block_index: u32,
}

impl BlockId {
    pub const fn new(package_id: PackageId, block_index: u32) -> Self {
        Self {
            package_id,
            block_index,
        }
    }
}

impl Hash for BlockId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.package_id as u64 * 98317 ^ self.block_index as u64);
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package_id, self.block_index)
    }
}

/// Marker for the kind of record an [ElementId] points at.
pub trait ElementKind {
    const NAME: &'static str;
}

macro_rules! element_kinds {
    ($($(#[$m:meta])* $kind:ident => $alias:ident, $name:literal;)*) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $kind {}

            impl ElementKind for $kind {
                const NAME: &'static str = $name;
            }

            $(#[$m])*
            pub type $alias = ElementId<$kind>;
        )*
    };
}

element_kinds! {
    /// Points at a polyline in a geometry block.
    GeometryKind => GeometryId, "geometry";
    /// Points at a string in a name block.
    NameKind => NameId, "name";
    /// Points at a routing graph vertex in a node block.
    NodeKind => NodeId, "node";
    /// Points at a cross-package link in a global node block.
    GlobalNodeKind => GlobalNodeId, "global node";
    /// Points at an R-tree node.
    RTreeNodeKind => RTreeNodeId, "r-tree node";
}

/// Identifies one record inside a block.
///
/// The kind parameter keeps ids of different record types apart:
/// a [NodeId] can't be passed where a [GeometryId] is expected.
pub struct ElementId<K> {
    pub block_id: BlockId,
    pub element_index: u32,
    _kind: PhantomData<K>,
}

impl<K> ElementId<K> {
    pub const fn new(block_id: BlockId, element_index: u32) -> Self {
        Self {
            block_id,
            element_index,
            _kind: PhantomData,
        }
    }

    pub fn package_id(&self) -> PackageId {
        self.block_id.package_id
    }
}

// Manual impls, as derives would put bounds on `K`.

impl<K> Clone for ElementId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for ElementId<K> {}

impl<K> PartialEq for ElementId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.block_id == other.block_id && self.element_index == other.element_index
    }
}

impl<K> Eq for ElementId<K> {}

impl<K> PartialOrd for ElementId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for ElementId<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.block_id, self.element_index).cmp(&(other.block_id, other.element_index))
    }
}

impl<K> Hash for ElementId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block_id.hash(state);
        state.write_u32(self.element_index);
    }
}

impl<K: ElementKind> fmt::Debug for ElementId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId<{}>({}:{})", K::NAME, self.block_id, self.element_index)
    }
}

impl<K: ElementKind> fmt::Display for ElementId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_id, self.element_index)
    }
}
