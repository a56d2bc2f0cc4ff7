// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Coordinates and the approximate distance functions used by nearest-node search.
//!
//! Distances are computed in degrees over a locally linearized, equirectangular
//! projection: longitude differences are scaled by the cosine of the latitude.
//! This is an approximation (not geodesically exact) and does not handle
//! the 180°/-180° antimeridian.

/// Scale of the fixed-point coordinates stored in packages.
pub const COORDINATE_SCALE: f64 = 1.0e-6;

/// A position in fixed-point degrees (degrees × 1e6), as stored in packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub lat: i32,
    pub lon: i32,
}

impl Point {
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    pub fn to_wgs(self) -> WgsPos {
        WgsPos::new(
            self.lat as f64 * COORDINATE_SCALE,
            self.lon as f64 * COORDINATE_SCALE,
        )
    }

    /// Converts a WGS84 position into fixed-point degrees, truncating toward zero.
    pub fn from_wgs(pos: WgsPos) -> Self {
        Self {
            lat: (pos.lat / COORDINATE_SCALE) as i32,
            lon: (pos.lon / COORDINATE_SCALE) as i32,
        }
    }
}

/// A WGS84 position, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WgsPos {
    pub lat: f64,
    pub lon: f64,
}

impl WgsPos {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Plain (unscaled) euclidean distance in degrees.
    fn planar_distance(self, other: WgsPos) -> f64 {
        (other.lat - self.lat).hypot(other.lon - self.lon)
    }
}

/// An axis-aligned bounding box over WGS84 positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WgsBounds {
    pub min: WgsPos,
    pub max: WgsPos,
}

impl WgsBounds {
    /// Creates bounds spanning two corners, given in any order.
    pub fn new(a: WgsPos, b: WgsPos) -> Self {
        Self {
            min: WgsPos::new(a.lat.min(b.lat), a.lon.min(b.lon)),
            max: WgsPos::new(a.lat.max(b.lat), a.lon.max(b.lon)),
        }
    }

    /// Returns the empty bounds, which contain nothing and are
    /// the identity of [expand](WgsBounds::expand).
    pub const fn empty() -> Self {
        Self {
            min: WgsPos::new(f64::INFINITY, f64::INFINITY),
            max: WgsPos::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.lat > self.max.lat || self.min.lon > self.max.lon
    }

    pub fn expand(&mut self, pos: WgsPos) {
        self.min.lat = self.min.lat.min(pos.lat);
        self.min.lon = self.min.lon.min(pos.lon);
        self.max.lat = self.max.lat.max(pos.lat);
        self.max.lon = self.max.lon.max(pos.lon);
    }

    pub fn from_positions<I: IntoIterator<Item = WgsPos>>(positions: I) -> Self {
        let mut bounds = Self::empty();
        for pos in positions {
            bounds.expand(pos);
        }
        bounds
    }

    pub fn contains(&self, pos: WgsPos) -> bool {
        (self.min.lat..=self.max.lat).contains(&pos.lat)
            && (self.min.lon..=self.max.lon).contains(&pos.lon)
    }
}

#[inline]
fn lon_factor(lat: f64) -> f64 {
    lat.to_radians().cos()
}

/// Lower bound of the distance from `pos` to anything inside `bounds`.
///
/// Negative for positions inside the box (the deeper inside, the smaller),
/// and infinite for empty bounds.
pub fn bbox_distance(pos: WgsPos, bounds: &WgsBounds) -> f64 {
    if bounds.is_empty() {
        return f64::INFINITY;
    }
    let lat_dist = (bounds.min.lat - pos.lat).max(pos.lat - bounds.max.lat);
    let lon_dist = (bounds.min.lon - pos.lon).max(pos.lon - bounds.max.lon);
    lat_dist.max(lon_factor(pos.lat) * lon_dist)
}

/// Approximate distance between two positions.
pub fn point_distance(a: WgsPos, b: WgsPos) -> f64 {
    let factor = lon_factor((a.lat + b.lat) * 0.5);
    (b.lat - a.lat).hypot((b.lon - a.lon) * factor)
}

/// Projects `pos` onto the segment `p0`-`p1`, clamping to the segment ends.
pub fn closest_segment_point(pos: WgsPos, p0: WgsPos, p1: WgsPos) -> WgsPos {
    let factor = lon_factor((p0.lat + p1.lat) * 0.5);
    let (d_lat, d_lon) = (p1.lat - p0.lat, (p1.lon - p0.lon) * factor);
    let len2 = d_lat * d_lat + d_lon * d_lon;
    if len2 == 0.0 {
        return p0;
    }
    let t = (d_lat * (pos.lat - p0.lat) + d_lon * (pos.lon - p0.lon) * factor) / len2;
    let t = t.clamp(0.0, 1.0);
    WgsPos::new(p0.lat + (p1.lat - p0.lat) * t, p0.lon + (p1.lon - p0.lon) * t)
}

/// Locates the point of a polyline closest to `pos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// The closest point on the polyline.
    pub pos: WgsPos,

    /// Approximate distance from the query position to [pos](Projection::pos).
    pub distance: f64,

    /// 0-based index of the segment containing the closest point.
    pub segment_index: usize,

    /// Position of the closest point along the polyline, from 0 (start) to 1 (end).
    pub rel_pos: f64,
}

/// Projects `pos` onto every segment of a polyline, calling `f` with each projection
/// in segment order. Relative positions are measured with unscaled degree lengths.
pub fn project_on_polyline<F: FnMut(Projection)>(pos: WgsPos, line: &[WgsPos], mut f: F) {
    let total: f64 = line.windows(2).map(|w| w[0].planar_distance(w[1])).sum();
    let mut walked = 0.0;
    for (i, w) in line.windows(2).enumerate() {
        let proj = closest_segment_point(pos, w[0], w[1]);
        let along = walked + w[0].planar_distance(proj);
        f(Projection {
            pos: proj,
            distance: point_distance(pos, proj),
            segment_index: i,
            rel_pos: if total > 0.0 { along / total } else { 0.0 },
        });
        walked += w[0].planar_distance(w[1]);
    }
}
