//! The decoded tile data model.
//!
//! A [`Tile`] owns an ordered sequence of [`Layer`]s; each layer owns its
//! features and a pair of shared dictionaries for attribute keys and typed
//! values. Features reference dictionary entries by index, which is the
//! format's main space optimization: every value is decoded once and
//! referenced many times. The whole tree is immutable after parsing, so
//! layers of the same tile may be read from any number of threads.

use std::collections::HashMap;

use crate::error::DictionaryError;
use crate::geometry::{GeomType, Geometry};

/// Root decoded unit. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Tile {
    layers: Vec<Layer>,
}

impl Tile {
    pub(crate) fn new(layers: Vec<Layer>) -> Self {
        Tile { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

/// A named collection of features sharing one coordinate extent and a pair
/// of key/value dictionaries. Owned exclusively by its [`Tile`].
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    version: u32,
    extent: u32,
    features: Vec<Feature>,
    dict: Dictionary,
}

impl Layer {
    pub(crate) fn new(
        name: String,
        version: u32,
        extent: u32,
        features: Vec<Feature>,
        dict: Dictionary,
    ) -> Self {
        Layer {
            name,
            version,
            extent,
            features,
            dict,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The integer grid resolution geometries are expressed in before
    /// projection. Always positive; 4096 unless the layer overrides it.
    pub fn extent(&self) -> u32 {
        self.extent
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Resolves a feature's tag pairs against this layer's dictionaries.
    ///
    /// Indices were validated during parsing, so resolution cannot fail
    /// here; values are borrowed, never cloned.
    pub fn properties<'a>(&'a self, feature: &'a Feature) -> HashMap<&'a str, &'a Value> {
        feature
            .tags
            .iter()
            .filter_map(|&(key, value)| {
                Some((
                    self.dict.key(key as usize).ok()?,
                    self.dict.value(value as usize).ok()?,
                ))
            })
            .collect()
    }
}

/// A layer's shared key and value tables.
///
/// Both lookups are O(1) and fail with
/// [`DictionaryError::IndexOutOfRange`] outside bounds.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    keys: Vec<String>,
    values: Vec<Value>,
}

impl Dictionary {
    pub(crate) fn new(keys: Vec<String>, values: Vec<Value>) -> Self {
        Dictionary { keys, values }
    }

    pub fn key(&self, i: usize) -> Result<&str, DictionaryError> {
        self.keys
            .get(i)
            .map(String::as_str)
            .ok_or(DictionaryError::IndexOutOfRange {
                index: i,
                len: self.keys.len(),
            })
    }

    pub fn value(&self, i: usize) -> Result<&Value, DictionaryError> {
        self.values.get(i).ok_or(DictionaryError::IndexOutOfRange {
            index: i,
            len: self.values.len(),
        })
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }
}

/// A typed attribute value from a layer's value dictionary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    String(String),
    Float(f32),
    Double(f64),
    Int(i64),
    Uint(u64),
    Sint(i64),
    Bool(bool),
}

/// One geographic entity within a layer: an id, a geometry in tile-local
/// coordinates and a flat list of (key index, value index) pairs.
#[derive(Debug, Clone)]
pub struct Feature {
    id: u64,
    geom_type: GeomType,
    geometry: Geometry<i32>,
    tags: Vec<(u32, u32)>,
}

impl Feature {
    pub(crate) fn new(
        id: u64,
        geom_type: GeomType,
        geometry: Geometry<i32>,
        tags: Vec<(u32, u32)>,
    ) -> Self {
        Feature {
            id,
            geom_type,
            geometry,
            tags,
        }
    }

    /// The feature id; features without an explicit id take their position
    /// in the layer's feature sequence.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    /// The geometry in tile-local integer coordinates.
    pub fn geometry(&self) -> &Geometry<i32> {
        &self.geometry
    }

    /// The raw (key index, value index) pairs; see [`Layer::properties`]
    /// for resolution.
    pub fn tags(&self) -> &[(u32, u32)] {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn test_layer() -> Layer {
        let dict = Dictionary::new(
            vec!["class".to_string(), "name".to_string()],
            vec![
                Value::String("ocean".to_string()),
                Value::Uint(42),
            ],
        );
        let feature = Feature::new(
            7,
            GeomType::Point,
            Geometry::Point(vec![Point::new(1, 1)]),
            vec![(0, 0), (1, 1)],
        );
        Layer::new("water".to_string(), 2, 4096, vec![feature], dict)
    }

    #[test]
    fn dictionary_lookup_in_range() {
        let layer = test_layer();
        assert_eq!(layer.dictionary().key(0).unwrap(), "class");
        assert_eq!(
            layer.dictionary().value(0).unwrap(),
            &Value::String("ocean".to_string())
        );
    }

    #[test]
    fn dictionary_lookup_at_length_fails() {
        let layer = test_layer();
        assert_eq!(
            layer.dictionary().key(2),
            Err(DictionaryError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            layer.dictionary().value(2),
            Err(DictionaryError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn properties_resolve_by_reference() {
        let layer = test_layer();
        let properties = layer.properties(&layer.features()[0]);
        assert_eq!(properties["class"], &Value::String("ocean".to_string()));
        assert_eq!(properties["name"], &Value::Uint(42));
    }
}
