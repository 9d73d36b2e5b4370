//! Errors which can happen in various parts of the library.
//!
//! Every fallible operation returns a typed error; nothing panics on
//! malformed input. Parsing is all-or-nothing at the tile granularity, so a
//! structural error anywhere aborts the whole decode (see
//! [`ParseOptions`](crate::parser::ParseOptions) for the explicit lenient
//! mode).

use thiserror::Error;

/// Errors raised while undoing the optional compression wrapper around a
/// tile payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A gzip or zlib header was present but the stream could not be fully
    /// decompressed (truncated or invalid).
    #[error("compressed tile stream is corrupt: {0}")]
    CorruptStream(#[from] std::io::Error),
}

/// Structural errors raised while parsing the binary tile encoding.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A length-delimited field claimed more bytes than remain in the buffer.
    #[error("tile buffer truncated: field of {needed} bytes with only {remaining} remaining")]
    Truncated {
        /// Bytes the field header claimed.
        needed: usize,
        /// Bytes actually left in the buffer.
        remaining: usize,
    },
    /// A feature referenced a key or value index outside its layer's
    /// dictionary bounds.
    #[error("feature in layer {layer:?} references out of range {kind} index {index} (dictionary size {len})")]
    InvalidTag {
        /// Name of the offending layer.
        layer: String,
        /// `"key"` or `"value"`.
        kind: &'static str,
        /// The out-of-range index.
        index: u32,
        /// The dictionary length it was checked against.
        len: usize,
    },
    /// A layer declared a structural version this parser does not understand.
    #[error("layer {layer:?} declares unsupported version {version}")]
    UnsupportedVersion {
        /// Name of the offending layer.
        layer: String,
        /// The declared version.
        version: u32,
    },
    /// A layer declared a non-positive coordinate extent.
    #[error("layer {layer:?} declares invalid extent {extent}")]
    InvalidExtent {
        /// Name of the offending layer.
        layer: String,
        /// The declared extent.
        extent: u32,
    },
    /// A varint ran past the end of the buffer or overflowed 64 bits.
    #[error("malformed varint in tile buffer")]
    InvalidVarint,
    /// An unknown wire type was encountered in a field key.
    #[error("unknown wire type {0} in tile buffer")]
    InvalidWireType(u8),
    /// A layer was missing its mandatory name field.
    #[error("layer without a name")]
    MissingLayerName,
    /// A feature's geometry command stream was malformed (strict mode only;
    /// lenient mode skips the feature instead).
    #[error("geometry of feature {feature} in layer {layer:?}: {source}")]
    Geometry {
        /// Name of the offending layer.
        layer: String,
        /// Id of the offending feature.
        feature: u64,
        /// The underlying geometry error.
        source: GeometryError,
    },
}

/// Errors raised while decoding a geometry command stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Unrecognized command id, zero repeat count, or a command sequence
    /// that violates the declared geometry type's structure.
    #[error("malformed geometry command {command} (repeat {count})")]
    MalformedCommand {
        /// The command id bits of the offending command word.
        command: u32,
        /// The repeat count bits of the offending command word.
        count: u32,
    },
    /// Fewer coordinate words remain than the repeat count requires.
    #[error("command requires {needed} coordinate words but only {remaining} remain")]
    TruncatedCoordinates {
        /// Coordinate words the command requires.
        needed: usize,
        /// Coordinate words left in the stream.
        remaining: usize,
    },
    /// The feature declared geometry type 0 (unknown) or an unlisted value.
    #[error("unknown geometry type {0}")]
    UnknownType(u32),
}

/// Errors raised when resolving indices against a layer's key/value
/// dictionaries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryError {
    /// The index is not within the dictionary's bounds.
    #[error("dictionary index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The dictionary length.
        len: usize,
    },
}

/// Errors raised by the tile-level datasource surface.
///
/// This is the only caller-facing error in normal operation, since decoding
/// has already completed by the time a datasource is constructed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DatasourceError {
    /// The requested layer index is outside `[0, layer_count())`.
    #[error("layer index {index} out of range ({count} layers)")]
    LayerIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of layers in the tile.
        count: usize,
    },
}

/// Top-level error for the decompress-then-parse entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The compression wrapper could not be undone.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The tile structure could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
