//! End-to-end tests: encoded bytes in, queried features out.

use std::io::Write;

use approx::assert_relative_eq;
use flate2::write::GzEncoder;
use flate2::Compression;
use vector_tile_source::{
    BoundingBox, Datasource, Error, Geometry, ParseError, TileCoords, Value, VectorTile,
};

const WORLD: f64 = 20_037_508.342789244;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Minimal wire-format writer, test-only: fixtures are built the same way
// they would come off the network.
mod encode {
    pub fn varint(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    pub fn field(number: u32, wire_type: u8, out: &mut Vec<u8>) {
        varint(u64::from(number << 3 | u32::from(wire_type)), out);
    }

    pub fn bytes(number: u32, payload: &[u8], out: &mut Vec<u8>) {
        field(number, 2, out);
        varint(payload.len() as u64, out);
        out.extend_from_slice(payload);
    }

    pub fn zigzag(n: i32) -> u32 {
        ((n << 1) ^ (n >> 31)) as u32
    }

    pub fn packed_u32(number: u32, words: &[u32], out: &mut Vec<u8>) {
        let mut packed = Vec::new();
        for &word in words {
            varint(u64::from(word), &mut packed);
        }
        bytes(number, &packed, out);
    }
}

/// A single-layer tile named "water" with one square ocean polygon covering
/// the whole extent, tagged `class = "ocean"`.
fn water_tile_bytes() -> Vec<u8> {
    use encode::*;

    let mut geometry = Vec::new();
    geometry.push((1 << 3) | 1); // MoveTo(1)
    geometry.extend([zigzag(0), zigzag(0)]);
    geometry.push((3 << 3) | 2); // LineTo(3)
    geometry.extend([
        zigzag(4096),
        zigzag(0),
        zigzag(0),
        zigzag(4096),
        zigzag(-4096),
        zigzag(0),
    ]);
    geometry.push((1 << 3) | 7); // ClosePath(1)

    let mut feature = Vec::new();
    field(1, 0, &mut feature);
    varint(17, &mut feature); // id
    packed_u32(2, &[0, 0], &mut feature); // tags: key 0 -> value 0
    field(3, 0, &mut feature);
    varint(3, &mut feature); // POLYGON
    packed_u32(4, &geometry, &mut feature);

    let mut value = Vec::new();
    bytes(1, b"ocean", &mut value);

    let mut layer = Vec::new();
    bytes(1, b"water", &mut layer);
    bytes(2, &feature, &mut layer);
    bytes(3, b"class", &mut layer);
    bytes(4, &value, &mut layer);
    field(5, 0, &mut layer);
    varint(4096, &mut layer); // extent
    field(15, 0, &mut layer);
    varint(2, &mut layer); // version

    let mut tile = Vec::new();
    bytes(3, &layer, &mut tile);
    tile
}

#[test]
fn world_tile_bbox_spans_the_world() {
    init();
    // Scenario A: tile (0, 0, 0) at pixel size 256.
    let tile = VectorTile::from_bytes(&water_tile_bytes(), TileCoords::new(0, 0, 0), 256).unwrap();
    let bbox = tile.bounding_box();
    assert_relative_eq!(bbox.minx, -WORLD);
    assert_relative_eq!(bbox.miny, -WORLD);
    assert_relative_eq!(bbox.maxx, WORLD);
    assert_relative_eq!(bbox.maxy, WORLD);
}

#[test]
fn water_layer_queries_back_its_feature() {
    init();
    // Scenario B.
    let tile = VectorTile::from_bytes(&water_tile_bytes(), TileCoords::new(0, 0, 0), 256).unwrap();
    assert_eq!(tile.layer_count(), 1);
    assert_eq!(tile.layer_name(0).unwrap(), "water");

    let source = tile.layer_datasource(0).unwrap();
    assert_eq!(source.feature_count(), 1);

    let features: Vec<_> = source.query(&tile.bounding_box()).collect();
    assert_eq!(features.len(), 1);

    let feature = &features[0];
    assert_eq!(feature.id, 17);
    assert_eq!(feature.properties.len(), 1);
    assert_eq!(feature.properties["class"], &Value::String("ocean".to_string()));

    // The square ring spans the whole world tile; local y is inverted.
    let Geometry::Polygon(rings) = &feature.geometry else {
        panic!("expected polygon");
    };
    assert_eq!(rings.len(), 1);
    assert!(rings[0].is_outer());
    assert_relative_eq!(rings[0].points[0].x, -WORLD);
    assert_relative_eq!(rings[0].points[0].y, WORLD);
    assert_relative_eq!(rings[0].points[2].x, WORLD);
    assert_relative_eq!(rings[0].points[2].y, -WORLD);
}

#[test]
fn disjoint_query_is_empty() {
    init();
    // Scenario C: a bbox beyond the tile cannot intersect any envelope.
    let tile = VectorTile::from_bytes(&water_tile_bytes(), TileCoords::new(0, 0, 0), 256).unwrap();
    let source = tile.layer_datasource(0).unwrap();

    let outside = BoundingBox::new(WORLD + 10.0, WORLD + 10.0, WORLD + 20.0, WORLD + 20.0);
    assert_eq!(source.query(&outside).count(), 0);
}

#[test]
fn gzipped_payload_is_accepted() {
    init();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&water_tile_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let tile = VectorTile::from_bytes(&compressed, TileCoords::new(0, 0, 0), 256).unwrap();
    assert_eq!(tile.layer_name(0).unwrap(), "water");
}

#[test]
fn truncated_command_stream_fails_strict_with_no_output() {
    init();
    use encode::*;

    // LineTo(3) claims three pairs but the stream ends after one.
    let mut geometry = Vec::new();
    geometry.push((1 << 3) | 1);
    geometry.extend([zigzag(0), zigzag(0)]);
    geometry.push((3 << 3) | 2);
    geometry.extend([zigzag(10), zigzag(0)]);

    let mut feature = Vec::new();
    field(3, 0, &mut feature);
    varint(3, &mut feature);
    packed_u32(4, &geometry, &mut feature);

    let mut layer = Vec::new();
    bytes(1, b"broken", &mut layer);
    bytes(2, &feature, &mut layer);

    let mut tile = Vec::new();
    bytes(3, &layer, &mut tile);

    let result = VectorTile::from_bytes(&tile, TileCoords::new(0, 0, 0), 256);
    assert!(matches!(
        result,
        Err(Error::Parse(ParseError::Geometry { .. }))
    ));
}

#[test]
fn zero_extent_layer_is_a_typed_error() {
    init();
    use encode::*;

    // A point at the tile origin in a layer declaring extent 0; without the
    // extent check this reaches the projection divide and poisons every
    // envelope.
    let mut feature = Vec::new();
    field(3, 0, &mut feature);
    varint(1, &mut feature); // POINT
    packed_u32(4, &[(1 << 3) | 1, zigzag(0), zigzag(0)], &mut feature);

    let mut layer = Vec::new();
    bytes(1, b"water", &mut layer);
    bytes(2, &feature, &mut layer);
    field(5, 0, &mut layer);
    varint(0, &mut layer); // extent 0

    let mut tile_bytes = Vec::new();
    bytes(3, &layer, &mut tile_bytes);

    let result = VectorTile::from_bytes(&tile_bytes, TileCoords::new(0, 0, 0), 256);
    assert!(matches!(
        result,
        Err(Error::Parse(ParseError::InvalidExtent { extent: 0, .. }))
    ));
}

#[test]
fn quadrant_query_selects_matching_features() {
    init();
    use encode::*;

    // Two point features: one near the NW corner, one near the SE corner.
    let mut nw = Vec::new();
    field(3, 0, &mut nw);
    varint(1, &mut nw);
    packed_u32(4, &[(1 << 3) | 1, zigzag(10), zigzag(10)], &mut nw);

    let mut se = Vec::new();
    field(3, 0, &mut se);
    varint(1, &mut se);
    packed_u32(4, &[(1 << 3) | 1, zigzag(4000), zigzag(4000)], &mut se);

    let mut layer = Vec::new();
    bytes(1, b"poi", &mut layer);
    bytes(2, &nw, &mut layer);
    bytes(2, &se, &mut layer);

    let mut tile_bytes = Vec::new();
    bytes(3, &layer, &mut tile_bytes);

    let tile = VectorTile::from_bytes(&tile_bytes, TileCoords::new(0, 0, 0), 256).unwrap();
    let source = tile.layer_datasource(0).unwrap();

    // NW quadrant in projected coordinates is negative x, positive y.
    let quadrant = BoundingBox::new(-WORLD, 0.0, 0.0, WORLD);
    let hits: Vec<_> = source.query(&quadrant).map(|f| f.id).collect();
    assert_eq!(hits, vec![0]);
}
