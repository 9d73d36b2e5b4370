//! Geometry model and the integer command-stream decoder.
//!
//! Feature geometry arrives as a stream of 32-bit words: a command word
//! packing a command id and a repeat count, followed by that many zig-zag
//! encoded coordinate deltas. Decoding is a small state machine over the
//! stream (current command, remaining repeats, running position) with no
//! recursion and no shared state.
//!
//! # Coordinate System Origin
//!
//! Tile-local coordinates have their origin in the upper-left corner with
//! `y` growing downward; projected coordinates (after
//! [`project`](crate::mercator::project)) have `y` growing upward.

use crate::error::GeometryError;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// A single position, tile-local (`i32`) before projection and geographic
/// (`f64`) after.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Point { x, y }
    }
}

/// One polygon ring. The encoding does not self-declare the outer/inner
/// distinction; [`Ring::is_outer`] infers it from the area sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring<T> {
    /// Ring positions. The closing position is implicit: the last point
    /// connects back to the first.
    pub points: Vec<Point<T>>,
}

impl<T> Ring<T>
where
    T: Copy + Into<f64>,
{
    /// Twice-signed shoelace sum over the ring, in the source coordinate
    /// system.
    ///
    /// In tile-local coordinates (`y` down) an exterior ring, which the
    /// encoding stores clockwise on screen, yields a positive value.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x.into() * b.y.into() - b.x.into() * a.y.into();
        }
        sum / 2.0
    }

    /// Whether this ring is an outer ring under the area-sign convention:
    /// an outer ring starts a new polygon, subsequent inner rings are holes
    /// of the preceding outer ring.
    pub fn is_outer(&self) -> bool {
        self.signed_area() > 0.0
    }
}

/// Decoded feature geometry.
///
/// Positions are tile-local integers before projection and geographic
/// doubles after. The outer/inner distinction between a polygon's rings is
/// left to the consumer (see [`Ring::is_outer`]); consumers may assume the
/// filled area is the outer ring minus the inner rings.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry<T> {
    /// One or more positions.
    Point(Vec<Point<T>>),
    /// One or more open paths.
    LineString(Vec<Vec<Point<T>>>),
    /// One or more rings; the first ring is outer, subsequent rings are
    /// holes until the next outer ring.
    Polygon(Vec<Ring<T>>),
}

impl<T> Geometry<T>
where
    T: Copy + PartialOrd,
{
    /// The axis-aligned extent of all positions, `None` for an empty
    /// geometry.
    pub fn envelope(&self) -> Option<(Point<T>, Point<T>)> {
        let mut points = self.points();
        let first = points.next()?;
        let (mut min, mut max) = (first, first);
        for p in points {
            if p.x < min.x {
                min.x = p.x;
            }
            if p.y < min.y {
                min.y = p.y;
            }
            if p.x > max.x {
                max.x = p.x;
            }
            if p.y > max.y {
                max.y = p.y;
            }
        }
        Some((min, max))
    }

    fn points(&self) -> Box<dyn Iterator<Item = Point<T>> + '_> {
        match self {
            Geometry::Point(points) => Box::new(points.iter().copied()),
            Geometry::LineString(paths) => {
                Box::new(paths.iter().flat_map(|path| path.iter().copied()))
            }
            Geometry::Polygon(rings) => {
                Box::new(rings.iter().flat_map(|ring| ring.points.iter().copied()))
            }
        }
    }
}

/// The geometry type a feature declares for its command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeomType {
    Point,
    LineString,
    Polygon,
}

impl GeomType {
    pub(crate) fn from_raw(raw: u32) -> Result<Self, GeometryError> {
        match raw {
            1 => Ok(GeomType::Point),
            2 => Ok(GeomType::LineString),
            3 => Ok(GeomType::Polygon),
            other => Err(GeometryError::UnknownType(other)),
        }
    }
}

pub(crate) trait ZagZig {
    /// Decodes a value from zig-zag encoding.
    fn zagzig(self) -> i32;
}

impl ZagZig for u32 {
    fn zagzig(self) -> i32 {
        (self >> 1) as i32 ^ -((self & 1) as i32)
    }
}

/// Running decoder state: position in the stream plus the accumulated
/// coordinate, which deltas are applied to.
struct Cursor<'a> {
    stream: &'a [u32],
    pos: usize,
    x: i32,
    y: i32,
}

impl<'a> Cursor<'a> {
    fn new(stream: &'a [u32]) -> Self {
        Cursor {
            stream,
            pos: 0,
            x: 0,
            y: 0,
        }
    }

    fn has_remaining(&self) -> bool {
        self.pos < self.stream.len()
    }

    /// Splits the next command word into (command id, repeat count).
    fn command(&mut self) -> (u32, u32) {
        let word = self.stream[self.pos];
        self.pos += 1;
        (word & 0x7, word >> 3)
    }

    /// Applies `count` coordinate-pair deltas, pushing the resulting
    /// absolute positions onto `out`.
    fn advance(&mut self, count: u32, out: &mut Vec<Point<i32>>) -> Result<(), GeometryError> {
        let needed = count as usize * 2;
        let remaining = self.stream.len() - self.pos;
        if needed > remaining {
            return Err(GeometryError::TruncatedCoordinates { needed, remaining });
        }
        out.reserve(count as usize);
        for _ in 0..count {
            self.x = self.x.wrapping_add(self.stream[self.pos].zagzig());
            self.y = self.y.wrapping_add(self.stream[self.pos + 1].zagzig());
            self.pos += 2;
            out.push(Point::new(self.x, self.y));
        }
        Ok(())
    }
}

/// Decodes a command stream into structured geometry of the declared type.
///
/// Decoding is deterministic and idempotent: the same stream always yields
/// the same geometry.
pub fn decode(geom_type: GeomType, stream: &[u32]) -> Result<Geometry<i32>, GeometryError> {
    match geom_type {
        GeomType::Point => decode_point(stream),
        GeomType::LineString => decode_line_string(stream),
        GeomType::Polygon => decode_polygon(stream),
    }
}

/// A point geometry is a single MoveTo group with one or more positions.
fn decode_point(stream: &[u32]) -> Result<Geometry<i32>, GeometryError> {
    let mut cursor = Cursor::new(stream);
    let mut points = Vec::new();

    while cursor.has_remaining() {
        let (command, count) = cursor.command();
        if command != CMD_MOVE_TO || count == 0 || !points.is_empty() {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        cursor.advance(count, &mut points)?;
    }

    Ok(Geometry::Point(points))
}

/// A line string is one or more MoveTo(1)/LineTo(n) groups, each starting a
/// new path.
fn decode_line_string(stream: &[u32]) -> Result<Geometry<i32>, GeometryError> {
    let mut cursor = Cursor::new(stream);
    let mut paths = Vec::new();

    while cursor.has_remaining() {
        let (command, count) = cursor.command();
        if command != CMD_MOVE_TO || count != 1 {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        let mut path = Vec::new();
        cursor.advance(count, &mut path)?;

        if !cursor.has_remaining() {
            return Err(GeometryError::MalformedCommand {
                command: CMD_LINE_TO,
                count: 0,
            });
        }
        let (command, count) = cursor.command();
        if command != CMD_LINE_TO || count == 0 {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        cursor.advance(count, &mut path)?;
        paths.push(path);
    }

    Ok(Geometry::LineString(paths))
}

/// A polygon is one or more MoveTo(1)/LineTo(n)/ClosePath(1) ring groups.
fn decode_polygon(stream: &[u32]) -> Result<Geometry<i32>, GeometryError> {
    let mut cursor = Cursor::new(stream);
    let mut rings = Vec::new();

    while cursor.has_remaining() {
        let (command, count) = cursor.command();
        if command != CMD_MOVE_TO || count != 1 {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        let mut points = Vec::new();
        cursor.advance(count, &mut points)?;

        if !cursor.has_remaining() {
            return Err(GeometryError::MalformedCommand {
                command: CMD_LINE_TO,
                count: 0,
            });
        }
        let (command, count) = cursor.command();
        if command != CMD_LINE_TO || count == 0 {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        cursor.advance(count, &mut points)?;

        if !cursor.has_remaining() {
            return Err(GeometryError::MalformedCommand {
                command: CMD_CLOSE_PATH,
                count: 0,
            });
        }
        let (command, count) = cursor.command();
        if command != CMD_CLOSE_PATH || count != 1 {
            return Err(GeometryError::MalformedCommand { command, count });
        }
        rings.push(Ring { points });
    }

    Ok(Geometry::Polygon(rings))
}
