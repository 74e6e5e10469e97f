//! AMF0 encoder and decoder, as used by FLV script data tags.
//!
//! Decoding borrows strings from the input buffer. Besides the strict
//! [`Amf0Decoder::decode`], [`Amf0Decoder::decode_partial`] keeps the part of
//! an object that was readable before a malformed field, which is what
//! metadata recovery needs.
//!
//! # Examples
//!
//! ```rust
//! # fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use amf0::{Amf0Decoder, Amf0Encoder};
//! # let bytes = &[0x01, 0x01];
//! # let mut writer = Vec::new();
//!
//! let mut reader = Amf0Decoder::new(bytes);
//! let value = reader.decode()?;
//!
//! Amf0Encoder::encode(&mut writer, &value)?;
//!
//! # assert_eq!(writer, bytes);
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
//!
//! Enable the `serde` feature to serialize [`Amf0Value`] trees.
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod decode;
mod define;
mod encode;
mod errors;
#[cfg(feature = "serde")]
mod ser;

pub use crate::decode::{Amf0Decoder, MAX_NESTING_DEPTH};
pub use crate::define::{Amf0Marker, Amf0Properties, Amf0Value};
pub use crate::encode::Amf0Encoder;
pub use crate::errors::{Amf0ReadError, Amf0WriteError};
