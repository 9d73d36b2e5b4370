//! Decodes binary vector tiles and exposes them as queryable spatial data
//! sources.
//!
//! A vector tile is a rectangular, zoom-addressed slice of geographic
//! vector data: layers of point, line and polygon features with shared
//! attribute dictionaries, encoded as a nested length-delimited binary
//! structure with an integer geometry command stream. This crate parses
//! that encoding, projects tile-local coordinates to spherical-mercator
//! geographic coordinates, and answers bounding-box queries over the
//! result.
//!
//! The usual entry point is [`VectorTile`], which binds a payload to its
//! tile address:
//!
//! ```no_run
//! use vector_tile_source::{Datasource, VectorTile};
//!
//! # fn run(buffer: &[u8]) -> Result<(), vector_tile_source::Error> {
//! let tile = VectorTile::from_bytes(buffer, (8, 5, 4).into(), 256)?;
//! for i in 0..tile.layer_count() {
//!     let source = tile.layer_datasource(i).unwrap();
//!     for feature in source.query(&tile.bounding_box()) {
//!         println!("{:?} {:?}", feature.id, feature.properties);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Lower-level pieces are exposed for callers that bring their own
//! plumbing: [`compression::decompress`], [`parser::parse`],
//! [`geometry::decode`] and the pure projection functions in [`mercator`].

pub mod compression;
pub mod datasource;
pub mod error;
pub mod geometry;
pub mod mercator;
pub mod parser;
pub mod tile;

mod wire;

pub use datasource::{Datasource, QueriedFeature, TileDatasource};
pub use error::{
    DatasourceError, DecodeError, DictionaryError, Error, GeometryError, ParseError,
};
pub use geometry::{GeomType, Geometry, Point, Ring};
pub use mercator::{tile_bounds, BoundingBox, TileCoords};
pub use parser::{ParseOptions, Strictness};
pub use tile::{Dictionary, Feature, Layer, Tile, Value};

/// A decoded tile bound to its address in the tile pyramid.
///
/// The projected bounding box is computed once at construction and shared
/// by every layer datasource handed out. The decoded data is immutable and
/// exclusively owned here; datasources are non-owning views that cannot
/// outlive this value.
pub struct VectorTile {
    tile: Tile,
    coords: TileCoords,
    pixel_size: u32,
    bounds: BoundingBox,
}

impl VectorTile {
    /// Decompresses (if needed) and parses `buffer` with default strict
    /// options. `pixel_size` is the tile's on-screen size, typically 256
    /// or 512.
    pub fn from_bytes(buffer: &[u8], coords: TileCoords, pixel_size: u32) -> Result<Self, Error> {
        Self::from_bytes_with(buffer, coords, pixel_size, ParseOptions::default())
    }

    /// Like [`VectorTile::from_bytes`] with explicit parse options.
    pub fn from_bytes_with(
        buffer: &[u8],
        coords: TileCoords,
        pixel_size: u32,
        options: ParseOptions,
    ) -> Result<Self, Error> {
        let payload = compression::decompress(buffer)?;
        let tile = parser::parse_with(&payload, options)?;
        Ok(Self::from_tile(tile, coords, pixel_size))
    }

    /// Wraps an already-parsed tile.
    pub fn from_tile(tile: Tile, coords: TileCoords, pixel_size: u32) -> Self {
        VectorTile {
            tile,
            coords,
            pixel_size,
            bounds: tile_bounds(coords),
        }
    }

    pub fn coords(&self) -> TileCoords {
        self.coords
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Meters per pixel at this tile's zoom level.
    pub fn resolution(&self) -> f64 {
        mercator::resolution(self.pixel_size, self.coords.z)
    }

    /// The tile's projected bounding box, shared by all layer datasources.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    pub fn layer_count(&self) -> usize {
        self.tile.layers().len()
    }

    pub fn layer_name(&self, index: usize) -> Result<&str, DatasourceError> {
        self.layer(index).map(Layer::name)
    }

    /// A queryable datasource over the layer at `index`.
    pub fn layer_datasource(&self, index: usize) -> Result<TileDatasource<'_>, DatasourceError> {
        self.layer(index)
            .map(|layer| TileDatasource::new(layer, self.bounds))
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    fn layer(&self, index: usize) -> Result<&Layer, DatasourceError> {
        self.tile
            .layers()
            .get(index)
            .ok_or(DatasourceError::LayerIndexOutOfRange {
                index,
                count: self.tile.layers().len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tile_has_no_layers() {
        let tile = VectorTile::from_bytes(&[], TileCoords::new(0, 0, 0), 256).unwrap();
        assert_eq!(tile.layer_count(), 0);
        assert!(matches!(
            tile.layer_datasource(0),
            Err(DatasourceError::LayerIndexOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn world_tile_resolution() {
        let tile = VectorTile::from_tile(
            parser::parse(&[]).unwrap(),
            TileCoords::new(0, 0, 0),
            256,
        );
        assert!((tile.resolution() - 156_543.033_928_041).abs() < 1e-6);
    }
}
