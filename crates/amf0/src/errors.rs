use std::io;

use super::define::Amf0Marker;

/// Errors raised while decoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0ReadError {
    /// The marker byte is not defined by AMF0.
    #[error("unknown marker: {0}")]
    UnknownMarker(u8),
    /// The marker is defined but this decoder does not handle it.
    #[error("unsupported type: {0:?}")]
    UnsupportedType(Amf0Marker),
    /// A string was not valid UTF-8.
    #[error("string parse error: {0}")]
    StringParseError(#[from] std::str::Utf8Error),
    /// The buffer ended early.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Objects and arrays are nested deeper than the decoder follows.
    #[error("nesting too deep: more than {0} levels")]
    NestingTooDeep(usize),
    /// Returned by `Amf0Decoder::decode_with_type` when the next value has a
    /// different marker.
    #[error("wrong type: expected {expected:?}, got {got:?}")]
    WrongType {
        /// Marker asked for.
        expected: Amf0Marker,
        /// Marker found.
        got: Amf0Marker,
    },
}

/// Errors raised while encoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0WriteError {
    /// A string or property key longer than 65535 bytes.
    #[error("normal string too long")]
    NormalStringTooLong,
    /// A long string longer than `u32::MAX` bytes.
    #[error("long string too long")]
    LongStringTooLong,
    /// An array with more than `u32::MAX` entries.
    #[error("array too long")]
    ArrayTooLong,
    /// The writer failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
