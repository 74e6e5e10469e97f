//! Structural analysis of FLV files.
//!
//! Reads an FLV stream tag by tag and reports what is inside: tag counts,
//! the `onMetaData` properties, frames classified from the H.264 bitstream
//! and grouped into GOPs, per-stream size timelines and bitrate buckets.
//! Damage such as wrong `PreviousTagSize` values or a truncated tail does not
//! fail the analysis, it is listed among the report's [`Warning`]s.
//!
//! ```rust
//! use bytes::Bytes;
//! use flv::{FlvHeader, FlvTag, FlvTagType};
//! use flv_analyzer::{AnalyzeOptions, analyze_bytes};
//!
//! let mut file = Vec::new();
//! FlvHeader::new(true, false).write(&mut file).unwrap();
//! file.extend_from_slice(&[0, 0, 0, 0]);
//! for timestamp_ms in [0, 23, 46] {
//!     FlvTag {
//!         tag_type: FlvTagType::Audio,
//!         timestamp_ms,
//!         stream_id: 0,
//!         offset: 0,
//!         data: Bytes::from_static(&[0x2E, 0xFF, 0xFB, 0x90]),
//!     }
//!     .write(&mut file)
//!     .unwrap();
//! }
//!
//! let report = analyze_bytes(Bytes::from(file), &AnalyzeOptions::default()).unwrap();
//! assert_eq!(report.tag_counts.audio, 3);
//! assert_eq!(report.totals.duration_ms, 46);
//! assert_eq!(report.audio.unwrap().format, "MP3");
//! assert!(report.warnings.is_empty());
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod analyzer;
pub mod codec;
pub mod config;
pub mod demux;
pub mod error;
pub mod gop;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod stats;
pub mod warning;

#[cfg(test)]
mod test_utils;

pub use analyzer::FlvAnalyzer;
pub use codec::{FrameInfo, FrameType, VideoConfig};
pub use config::{AnalyzerConfig, Capabilities};
pub use error::AnalyzeError;
pub use gop::{FrameTypeCounts, Gop};
pub use pipeline::{AnalyzeOptions, analyze, analyze_bytes, analyze_path, analyze_threaded};
pub use progress::{OnProgress, OnWarning, ProgressEvent};
pub use report::AnalysisReport;
pub use stats::StreamKind;
pub use warning::Warning;
