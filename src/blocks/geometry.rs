// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{element, read_count};
use crate::bitstream::{decode_zig_zag, BitReader};
use crate::error::Result;
use crate::geo::Point;
use crate::BlockId;

/// Decoded contents of a single block of the `GEOM` section: a list of polylines.
///
/// Geometries are stored once for both travel directions;
/// see [Node::geometry_reversed](crate::Node::geometry_reversed).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeometryBlock {
    pub geometries: Vec<Vec<Point>>,
}

impl GeometryBlock {
    pub fn geometry(&self, index: u32) -> Result<&[Point]> {
        element(&self.geometries, "geometry", index).map(Vec::as_slice)
    }
}

/// Decodes a block of the `GEOM` section.
///
/// The first vertex of every polyline is stored relative to the block's minimum
/// coordinates; every subsequent one as a zig-zag encoded delta from its predecessor.
pub fn decode_geometry_block(bs: &mut BitReader, block_id: BlockId) -> Result<GeometryBlock> {
    let lat_diff_bits = bs.read_width()?;
    let lon_diff_bits = bs.read_width()?;
    let size_bits = bs.read_width()?;
    let min_lat: i32 = bs.read_bits(32)?;
    let min_lon: i32 = bs.read_bits(32)?;

    let (count, capacity) = read_count(bs)?;
    let mut geometries = Vec::with_capacity(capacity);
    for _ in 0..count {
        let lat_zig_zag_bits = bs.read_width()?;
        let lon_zig_zag_bits = bs.read_width()?;
        let mut lat = min_lat.wrapping_add(bs.read_bits(lat_diff_bits)?);
        let mut lon = min_lon.wrapping_add(bs.read_bits(lon_diff_bits)?);

        let size: u32 = bs.read_bits(size_bits)?;
        let mut geometry = Vec::with_capacity((size as usize + 1).min(bs.remaining() + 1));
        geometry.push(Point::new(lat, lon));
        for _ in 0..size {
            lat = lat.wrapping_add(decode_zig_zag(bs.read_bits(lat_zig_zag_bits)?));
            lon = lon.wrapping_add(decode_zig_zag(bs.read_bits(lon_zig_zag_bits)?));
            geometry.push(Point::new(lat, lon));
        }
        geometries.push(geometry);
    }

    log::debug!("decoded geometry block {}: {} geometries", block_id, geometries.len());
    Ok(GeometryBlock { geometries })
}
