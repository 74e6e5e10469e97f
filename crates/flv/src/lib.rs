//! FLV container parsing.
//!
//! [`FlvReader`] walks the tags of an FLV file from any [`std::io::Read`]
//! source, recovering from the damage commonly found in recorded streams
//! (wrong `PreviousTagSize` values, unknown tag types, a cut off tail) and
//! reporting it as [`ReaderEvent`]s. The [`video`], [`audio`] and [`script`]
//! modules decode the sub-headers at the start of each tag body.
//!
//! ```rust
//! use bytes::Bytes;
//! use flv::{FlvHeader, FlvReader, FlvTag, FlvTagType};
//!
//! let mut file = Vec::new();
//! FlvHeader::new(true, false).write(&mut file).unwrap();
//! file.extend_from_slice(&[0, 0, 0, 0]);
//! FlvTag {
//!     tag_type: FlvTagType::Audio,
//!     timestamp_ms: 0,
//!     stream_id: 0,
//!     offset: 0,
//!     data: Bytes::from_static(&[0xAF, 0x01, 0x21]),
//! }
//! .write(&mut file)
//! .unwrap();
//!
//! let (reader, header) = FlvReader::from_bytes(Bytes::from(file)).unwrap();
//! assert!(header.has_audio);
//!
//! let tags = reader.collect::<Result<Vec<_>, _>>().unwrap();
//! assert_eq!(tags.len(), 1);
//! assert_eq!(tags[0].offset, 13);
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod audio;
pub mod error;
pub mod header;
pub mod reader;
pub mod script;
pub mod tag;
pub mod video;

pub use self::error::FlvError;
pub use self::header::FlvHeader;
pub use self::reader::{FlvReader, ReaderEvent};
pub use self::script::{MetadataMap, ScriptData};
pub use self::tag::{FlvTag, FlvTagHeader, FlvTagType};
