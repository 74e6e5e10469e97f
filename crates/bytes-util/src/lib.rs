//! Bit and byte level helpers shared by the container and codec parsers.
//!
//! - [`BitReader`] / [`BitWriter`] walk a stream MSB-first, which is the bit
//!   order used by H.264 headers.
//! - [`BytesCursorExt`] slices a [`bytes::Bytes`] backed cursor without copying.
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod bit_read;
mod bit_write;
mod bytes_cursor;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
pub use bytes_cursor::{BytesCursor, BytesCursorExt};
