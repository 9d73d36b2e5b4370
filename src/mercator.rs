//! Spherical mercator tile math.
//!
//! Maps tile addresses in the web-mercator quadtree pyramid to projected
//! (EPSG:3857) bounding boxes, and tile-local integer coordinates onto
//! those boxes. Everything here is a pure function with no shared mutable
//! state, safe for unrestricted concurrent use.
//!
//! # Coordinate System Origin
//!
//! Tile addressing follows the slippy-map convention: the origin tile is in
//! the upper-left corner of the world, with `y` growing southward.
//! Projected coordinates have their origin at the equator/prime-meridian
//! intersection with `y` growing northward.

use crate::geometry::{Geometry, Point, Ring};

/// Half the projected world span in meters: the mercator world covers
/// `[-MAX_EXTENT, MAX_EXTENT]` on both axes.
pub const MAX_EXTENT: f64 = 20_037_508.342789244;

/// The address of a tile within the quadtree pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoords {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoords {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        TileCoords { x, y, z }
    }

    /// The four tiles this one subdivides into at the next zoom level.
    pub fn children(&self) -> [TileCoords; 4] {
        [
            TileCoords::new(self.x * 2, self.y * 2, self.z + 1),
            TileCoords::new(self.x * 2 + 1, self.y * 2, self.z + 1),
            TileCoords::new(self.x * 2, self.y * 2 + 1, self.z + 1),
            TileCoords::new(self.x * 2 + 1, self.y * 2 + 1, self.z + 1),
        ]
    }
}

impl From<(u32, u32, u8)> for TileCoords {
    fn from(tuple: (u32, u32, u8)) -> Self {
        TileCoords::new(tuple.0, tuple.1, tuple.2)
    }
}

/// An axis-aligned rectangle in projected coordinates, `min <= max` on both
/// axes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        debug_assert!(minx <= maxx && miny <= maxy);
        BoundingBox {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Whether this box and `other` share any point (edges included).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.minx <= other.maxx
            && other.minx <= self.maxx
            && self.miny <= other.maxy
            && other.miny <= self.maxy
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.minx + self.maxx) / 2.0,
            (self.miny + self.maxy) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }
}

/// The projected bounding box of a tile.
///
/// The tile span at zoom `z` is the world span divided by `2^z`; tile `y`
/// is counted from the north, so the box's `miny` sits at
/// `MAX_EXTENT - (y + 1) * span`.
pub fn tile_bounds(coords: TileCoords) -> BoundingBox {
    let span = (2.0 * MAX_EXTENT) / 2f64.powi(i32::from(coords.z));
    let minx = -MAX_EXTENT + f64::from(coords.x) * span;
    let miny = MAX_EXTENT - f64::from(coords.y + 1) * span;
    BoundingBox::new(minx, miny, minx + span, miny + span)
}

/// Meters per pixel at zoom `z` for tiles rendered `pixel_size` pixels wide.
pub fn resolution(pixel_size: u32, z: u8) -> f64 {
    (2.0 * MAX_EXTENT) / (f64::from(pixel_size) * 2f64.powi(i32::from(z)))
}

/// Linearly maps one tile-local coordinate in `[0, extent]` onto the tile's
/// projected box. Tile-local `y` grows downward, projected `y` upward.
pub fn to_geo(local_x: f64, local_y: f64, extent: u32, bounds: &BoundingBox) -> (f64, f64) {
    let extent = f64::from(extent);
    let geo_x = bounds.minx + (local_x / extent) * bounds.width();
    let geo_y = bounds.maxy - (local_y / extent) * bounds.height();
    (geo_x, geo_y)
}

/// Projects a whole tile-local geometry into geographic coordinates.
pub fn project(geometry: &Geometry<i32>, extent: u32, bounds: &BoundingBox) -> Geometry<f64> {
    let point = |p: &Point<i32>| {
        let (x, y) = to_geo(f64::from(p.x), f64::from(p.y), extent, bounds);
        Point::new(x, y)
    };
    match geometry {
        Geometry::Point(points) => Geometry::Point(points.iter().map(point).collect()),
        Geometry::LineString(paths) => Geometry::LineString(
            paths
                .iter()
                .map(|path| path.iter().map(point).collect())
                .collect(),
        ),
        Geometry::Polygon(rings) => Geometry::Polygon(
            rings
                .iter()
                .map(|ring| Ring {
                    points: ring.points.iter().map(point).collect(),
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn root_tile_covers_the_world() {
        let bounds = tile_bounds(TileCoords::new(0, 0, 0));
        assert_relative_eq!(bounds.minx, -MAX_EXTENT);
        assert_relative_eq!(bounds.miny, -MAX_EXTENT);
        assert_relative_eq!(bounds.maxx, MAX_EXTENT);
        assert_relative_eq!(bounds.maxy, MAX_EXTENT);
    }

    #[test]
    fn bounds_are_ordered_at_all_levels() {
        for z in 0..=18u8 {
            let edge = (1u32 << z) - 1;
            for (x, y) in [(0, 0), (edge, edge), (edge / 2, edge / 3)] {
                let bounds = tile_bounds(TileCoords::new(x, y, z));
                assert!(bounds.minx < bounds.maxx);
                assert!(bounds.miny < bounds.maxy);
            }
        }
    }

    #[test]
    fn children_partition_the_parent_exactly() {
        let parent = TileCoords::new(5, 9, 4);
        let parent_bounds = tile_bounds(parent);
        let children = parent.children().map(tile_bounds);

        // No gap or overlap: the children's union spans the parent and each
        // shared edge coincides.
        let minx = children.iter().map(|b| b.minx).fold(f64::MAX, f64::min);
        let miny = children.iter().map(|b| b.miny).fold(f64::MAX, f64::min);
        let maxx = children.iter().map(|b| b.maxx).fold(f64::MIN, f64::max);
        let maxy = children.iter().map(|b| b.maxy).fold(f64::MIN, f64::max);
        assert_relative_eq!(minx, parent_bounds.minx);
        assert_relative_eq!(miny, parent_bounds.miny);
        assert_relative_eq!(maxx, parent_bounds.maxx);
        assert_relative_eq!(maxy, parent_bounds.maxy);

        let (cx, cy) = parent_bounds.center();
        assert_relative_eq!(children[0].maxx, cx);
        assert_relative_eq!(children[0].miny, cy);
        assert_relative_eq!(children[3].minx, cx);
        assert_relative_eq!(children[3].maxy, cy);
    }

    #[test]
    fn local_corners_map_to_bbox_corners() {
        let bounds = tile_bounds(TileCoords::new(3, 2, 3));
        let extent = 4096;

        let (x, y) = to_geo(0.0, 0.0, extent, &bounds);
        assert_relative_eq!(x, bounds.minx);
        assert_relative_eq!(y, bounds.maxy);

        let (x, y) = to_geo(4096.0, 4096.0, extent, &bounds);
        assert_relative_eq!(x, bounds.maxx);
        assert_relative_eq!(y, bounds.miny);

        let (x, y) = to_geo(2048.0, 2048.0, extent, &bounds);
        let (cx, cy) = bounds.center();
        assert_relative_eq!(x, cx);
        assert_relative_eq!(y, cy);
    }

    #[test]
    fn resolution_halves_per_zoom_level() {
        assert_relative_eq!(resolution(256, 0), 156_543.033_928_041, epsilon = 1e-6);
        assert_relative_eq!(resolution(256, 1), resolution(256, 0) / 2.0);
        assert_relative_eq!(resolution(512, 0), resolution(256, 1));
    }

    #[test]
    fn disjoint_and_touching_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let c = BoundingBox::new(10.1, 10.1, 20.0, 20.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
