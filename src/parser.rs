//! Structural parsing of the binary tile encoding.
//!
//! The encoding is the MVT 2.1 protobuf schema: a tile is a sequence of
//! layers (field 3); a layer carries its name (1), features (2), key table
//! (3), value table (4), extent (5, default 4096) and version (15, default
//! 1); a feature carries an id (1), tag pairs (2), geometry type (3) and
//! the command/coordinate stream (4). Parsing is a single linear pass with
//! no backtracking; unknown fields at any nesting level are skipped to
//! preserve forward compatibility.
//!
//! Parsing is all-or-nothing: on failure no partial [`Tile`] is returned.
//! [`Strictness::Lenient`] is an explicit opt-in that downgrades a feature's
//! geometry error (skip the feature) and a layer's unsupported version
//! (skip the layer); it is never the default.

use log::warn;

use crate::error::ParseError;
use crate::geometry::{self, GeomType};
use crate::tile::{Dictionary, Feature, Layer, Tile, Value};
use crate::wire::{WireReader, WireType};

/// How structural trouble inside a single layer or feature is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Any error aborts the whole tile decode. The default.
    #[default]
    Strict,
    /// Features with malformed geometry and layers with unsupported
    /// versions are skipped with a warning; everything else still fails.
    Lenient,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub strictness: Strictness,
}

/// Parses a binary tile payload with default (strict) options.
pub fn parse(bytes: &[u8]) -> Result<Tile, ParseError> {
    parse_with(bytes, ParseOptions::default())
}

/// Parses a binary tile payload.
pub fn parse_with(bytes: &[u8], options: ParseOptions) -> Result<Tile, ParseError> {
    let mut reader = WireReader::new(bytes);
    let mut layers = Vec::new();

    while reader.has_remaining() {
        let (field, wire_type) = reader.read_key()?;
        match (field, wire_type) {
            (3, WireType::LengthDelimited) => {
                if let Some(layer) = parse_layer(reader.read_bytes()?, options)? {
                    layers.push(layer);
                }
            }
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(Tile::new(layers))
}

/// Raw layer fields, staged so that the dictionaries are complete before
/// any feature's tag indices are validated against them.
#[derive(Default)]
struct RawLayer<'a> {
    name: Option<String>,
    version: u32,
    extent: u32,
    keys: Vec<String>,
    values: Vec<Value>,
    features: Vec<&'a [u8]>,
}

fn parse_layer(bytes: &[u8], options: ParseOptions) -> Result<Option<Layer>, ParseError> {
    let mut reader = WireReader::new(bytes);
    let mut raw = RawLayer {
        version: 1,
        extent: 4096,
        ..RawLayer::default()
    };

    while reader.has_remaining() {
        let (field, wire_type) = reader.read_key()?;
        match (field, wire_type) {
            (1, WireType::LengthDelimited) => raw.name = Some(reader.read_string()?),
            (2, WireType::LengthDelimited) => raw.features.push(reader.read_bytes()?),
            (3, WireType::LengthDelimited) => raw.keys.push(reader.read_string()?),
            (4, WireType::LengthDelimited) => {
                raw.values.push(parse_value(reader.read_bytes()?)?)
            }
            (5, WireType::Varint) => raw.extent = reader.read_varint()? as u32,
            (15, WireType::Varint) => raw.version = reader.read_varint()? as u32,
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    let name = raw.name.ok_or(ParseError::MissingLayerName)?;

    if !matches!(raw.version, 1 | 2) {
        match options.strictness {
            Strictness::Strict => {
                return Err(ParseError::UnsupportedVersion {
                    layer: name,
                    version: raw.version,
                });
            }
            Strictness::Lenient => {
                warn!(
                    "skipping layer {name:?}: unsupported version {}",
                    raw.version
                );
                return Ok(None);
            }
        }
    }

    // A zero extent would divide away every projected coordinate.
    if raw.extent == 0 {
        match options.strictness {
            Strictness::Strict => {
                return Err(ParseError::InvalidExtent {
                    layer: name,
                    extent: raw.extent,
                });
            }
            Strictness::Lenient => {
                warn!("skipping layer {name:?}: invalid extent {}", raw.extent);
                return Ok(None);
            }
        }
    }

    let dict = Dictionary::new(raw.keys, raw.values);
    let mut features = Vec::with_capacity(raw.features.len());
    for (sequence, feature_bytes) in raw.features.iter().enumerate() {
        if let Some(feature) =
            parse_feature(feature_bytes, &name, &dict, sequence as u64, options)?
        {
            features.push(feature);
        }
    }

    Ok(Some(Layer::new(name, raw.version, raw.extent, features, dict)))
}

/// Decodes a value message into the tagged union, preferring the first
/// populated field if the entry is (invalidly) multi-typed.
fn parse_value(bytes: &[u8]) -> Result<Value, ParseError> {
    let mut reader = WireReader::new(bytes);
    let mut value = None;

    while reader.has_remaining() {
        let (field, wire_type) = reader.read_key()?;
        let decoded = match (field, wire_type) {
            (1, WireType::LengthDelimited) => Some(Value::String(reader.read_string()?)),
            (2, WireType::Fixed32) => Some(Value::Float(f32::from_bits(reader.read_fixed32()?))),
            (3, WireType::Fixed64) => Some(Value::Double(f64::from_bits(reader.read_fixed64()?))),
            (4, WireType::Varint) => Some(Value::Int(reader.read_varint()? as i64)),
            (5, WireType::Varint) => Some(Value::Uint(reader.read_varint()?)),
            (6, WireType::Varint) => {
                let raw = reader.read_varint()?;
                Some(Value::Sint((raw >> 1) as i64 ^ -((raw & 1) as i64)))
            }
            (7, WireType::Varint) => Some(Value::Bool(reader.read_varint()? != 0)),
            (_, wire_type) => {
                reader.skip(wire_type)?;
                None
            }
        };
        if value.is_none() {
            value = decoded;
        }
    }

    // An entirely empty value message is invalid per the schema but harmless;
    // map it to the empty string rather than failing the tile.
    Ok(value.unwrap_or(Value::String(String::new())))
}

fn parse_feature(
    bytes: &[u8],
    layer_name: &str,
    dict: &Dictionary,
    sequence: u64,
    options: ParseOptions,
) -> Result<Option<Feature>, ParseError> {
    let mut reader = WireReader::new(bytes);
    let mut id = None;
    let mut raw_type = 0u32;
    let mut raw_tags = Vec::new();
    let mut stream = Vec::new();

    while reader.has_remaining() {
        let (field, wire_type) = reader.read_key()?;
        match (field, wire_type) {
            (1, WireType::Varint) => id = Some(reader.read_varint()?),
            (2, WireType::LengthDelimited) => reader.read_packed_u32(&mut raw_tags)?,
            (2, WireType::Varint) => raw_tags.push(reader.read_varint()? as u32),
            (3, WireType::Varint) => raw_type = reader.read_varint()? as u32,
            (4, WireType::LengthDelimited) => reader.read_packed_u32(&mut stream)?,
            (4, WireType::Varint) => stream.push(reader.read_varint()? as u32),
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    let mut tags = Vec::with_capacity(raw_tags.len() / 2);
    for pair in raw_tags.chunks(2) {
        let (key, value) = match *pair {
            [key, value] => (key, value),
            // An odd trailing key references no value.
            [key] => {
                return Err(ParseError::InvalidTag {
                    layer: layer_name.to_string(),
                    kind: "value",
                    index: key,
                    len: dict.value_count(),
                });
            }
            _ => unreachable!("chunks(2) yields one or two elements"),
        };
        if key as usize >= dict.key_count() {
            return Err(ParseError::InvalidTag {
                layer: layer_name.to_string(),
                kind: "key",
                index: key,
                len: dict.key_count(),
            });
        }
        if value as usize >= dict.value_count() {
            return Err(ParseError::InvalidTag {
                layer: layer_name.to_string(),
                kind: "value",
                index: value,
                len: dict.value_count(),
            });
        }
        tags.push((key, value));
    }

    let id = id.unwrap_or(sequence);

    let decoded = GeomType::from_raw(raw_type)
        .and_then(|geom_type| Ok((geom_type, geometry::decode(geom_type, &stream)?)));
    let (geom_type, geometry) = match decoded {
        Ok(decoded) => decoded,
        Err(source) => match options.strictness {
            Strictness::Strict => {
                return Err(ParseError::Geometry {
                    layer: layer_name.to_string(),
                    feature: id,
                    source,
                });
            }
            Strictness::Lenient => {
                warn!("skipping feature {id} in layer {layer_name:?}: {source}");
                return Ok(None);
            }
        },
    };

    Ok(Some(Feature::new(id, geom_type, geometry, tags)))
}
