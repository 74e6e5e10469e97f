//! H.264 header parsing for container inspection.
//!
//! Covers what is needed to classify frames and describe a stream without
//! decoding it:
//!
//! - iterating the NAL units of an AVCC (length prefixed) payload,
//! - the first fields of a slice header, enough to tell I, P and B apart,
//! - the sequence parameter set, for profile, level and picture size,
//! - the `AVCDecoderConfigurationRecord` found in FLV and MP4.
//!
//! ```rust
//! use bytes::Bytes;
//! use h264::{AvccNalUnits, SliceHeader, SliceType};
//!
//! // one IDR slice NAL with a 4 byte length prefix
//! let payload = Bytes::from_static(&[0, 0, 0, 3, 0x65, 0x88, 0x84]);
//!
//! for nal in AvccNalUnits::new(payload, 4).unwrap() {
//!     let slice = SliceHeader::parse(&nal.unwrap()[..]).unwrap();
//!     assert!(slice.is_idr());
//!     assert_eq!(slice.kind(), Some(SliceType::I));
//! }
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod config;
mod io;
mod nal;
mod slice;
mod sps;

pub use self::config::AVCDecoderConfigurationRecord;
pub use self::io::EmulationPreventionIo;
pub use self::nal::{AvccNalUnits, NALUnitType, NalHeader};
pub use self::slice::{SliceHeader, SliceType};
pub use self::sps::{FrameCrop, Sps, TimingInfo};
