//! The spatial-query capability over a decoded layer.
//!
//! A [`TileDatasource`] is a non-owning view binding one layer of a decoded
//! tile to the tile's projected bounding box. It never mutates the layer;
//! multiple datasources over layers of the same tile can be queried from
//! any number of threads. Feature envelopes are computed lazily on the
//! first query and cached for the datasource's lifetime behind a
//! write-once initialization, so concurrent queries on the same instance
//! are race-free.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::geometry::Geometry;
use crate::mercator::{self, BoundingBox};
use crate::tile::{Layer, Value};

/// The capability set a spatial data provider exposes to the host system.
///
/// Callers depend only on this trait, never on a concrete source type, so a
/// tile-backed source can stand in anywhere alongside other providers.
pub trait Datasource {
    /// Number of features in this source.
    fn feature_count(&self) -> usize;

    /// The source's overall bounding box in projected coordinates.
    fn envelope(&self) -> BoundingBox;

    /// Lazily yields the features whose envelope intersects `bbox`, with
    /// geometry projected to geographic coordinates and attributes resolved
    /// to a key/value mapping.
    ///
    /// The sequence is single-pass but restartable: calling `query` again
    /// re-scans the layer.
    fn query<'a>(&'a self, bbox: &BoundingBox) -> Box<dyn Iterator<Item = QueriedFeature<'a>> + 'a>;
}

/// One feature yielded by a query: projected geometry plus attributes
/// resolved against the layer's dictionaries by reference.
#[derive(Debug)]
pub struct QueriedFeature<'a> {
    pub id: u64,
    pub geometry: Geometry<f64>,
    pub properties: HashMap<&'a str, &'a Value>,
}

/// A per-layer view over a decoded tile.
///
/// Holds shared read-only references into the tile; it cannot outlive it.
pub struct TileDatasource<'a> {
    layer: &'a Layer,
    bounds: BoundingBox,
    envelopes: OnceLock<Vec<Option<BoundingBox>>>,
}

impl<'a> TileDatasource<'a> {
    /// Binds `layer` to the projected bounding box of the tile it came
    /// from.
    pub fn new(layer: &'a Layer, bounds: BoundingBox) -> Self {
        TileDatasource {
            layer,
            bounds,
            envelopes: OnceLock::new(),
        }
    }

    pub fn layer(&self) -> &'a Layer {
        self.layer
    }

    /// Per-feature projected envelopes, computed once on first access.
    /// `None` entries are features with empty geometry, which no query
    /// bbox can intersect.
    fn feature_envelopes(&self) -> &[Option<BoundingBox>] {
        self.envelopes.get_or_init(|| {
            let extent = self.layer.extent();
            self.layer
                .features()
                .iter()
                .map(|feature| {
                    feature.geometry().envelope().map(|(min, max)| {
                        // The local-to-geo map is linear, so projecting the
                        // two corners projects the envelope. Local y grows
                        // downward: min/max y swap sides.
                        let (minx, maxy) = mercator::to_geo(
                            f64::from(min.x),
                            f64::from(min.y),
                            extent,
                            &self.bounds,
                        );
                        let (maxx, miny) = mercator::to_geo(
                            f64::from(max.x),
                            f64::from(max.y),
                            extent,
                            &self.bounds,
                        );
                        BoundingBox::new(minx, miny, maxx, maxy)
                    })
                })
                .collect()
        })
    }
}

impl Datasource for TileDatasource<'_> {
    fn feature_count(&self) -> usize {
        self.layer.features().len()
    }

    fn envelope(&self) -> BoundingBox {
        self.bounds
    }

    fn query<'a>(&'a self, bbox: &BoundingBox) -> Box<dyn Iterator<Item = QueriedFeature<'a>> + 'a> {
        let bbox = *bbox;
        let envelopes = self.feature_envelopes();
        let extent = self.layer.extent();
        let bounds = self.bounds;

        Box::new(
            self.layer
                .features()
                .iter()
                .zip(envelopes)
                .filter(move |(_, envelope)| {
                    envelope.as_ref().is_some_and(|e| e.intersects(&bbox))
                })
                .map(move |(feature, _)| QueriedFeature {
                    id: feature.id(),
                    geometry: mercator::project(feature.geometry(), extent, &bounds),
                    properties: self.layer.properties(feature),
                }),
        )
    }
}
