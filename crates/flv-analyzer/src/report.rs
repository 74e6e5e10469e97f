//! The result of an analysis.

use flv::{FlvHeader, MetadataMap};
use serde::Serialize;

use crate::codec::VideoConfig;
use crate::gop::{FrameTypeCounts, Gop};
use crate::stats::{BitrateBucket, TimelineSeries};
use crate::warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSummary {
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
    pub data_offset: u32,
}

impl From<FlvHeader> for HeaderSummary {
    fn from(header: FlvHeader) -> Self {
        Self {
            version: header.version,
            has_audio: header.has_audio,
            has_video: header.has_video,
            data_offset: header.data_offset,
        }
    }
}

/// Tags yielded by the reader, by type. Skipped unknown tags are not
/// included, they only appear as warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub video: u64,
    pub audio: u64,
    pub script: u64,
}

impl TagCounts {
    pub fn total(&self) -> u64 {
        self.video + self.audio + self.script
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timelines {
    pub video: TimelineSeries,
    pub audio: TimelineSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitrateSummary {
    pub window_ms: u32,
    pub video: Vec<BitrateBucket>,
    pub audio: Vec<BitrateBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Largest tag timestamp.
    pub duration_ms: u32,
    /// `duration` from `onMetaData`, converted to milliseconds.
    pub metadata_duration_ms: Option<u64>,
    /// Bits per second.
    pub avg_bitrate_video: f64,
    pub avg_bitrate_audio: f64,
    pub video_bytes: u64,
    pub audio_bytes: u64,
}

/// Audio stream description taken from the first audio tag, refined by
/// the AAC sequence header when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub format_id: u8,
    pub format: String,
    pub sample_rate: u32,
    pub sample_size: u8,
    pub channels: u8,
    pub aac_sequence_header: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aac_object_type: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub header: HeaderSummary,
    /// Properties of the first `onMetaData` tag.
    pub metadata: MetadataMap,
    /// `onMetaData` was found and decoded without error.
    pub metadata_complete: bool,
    pub tag_counts: TagCounts,
    pub total_tags: u64,
    pub gops: Vec<Gop>,
    pub frame_counts: FrameTypeCounts,
    pub timelines: Timelines,
    pub bitrate: BitrateSummary,
    pub totals: Totals,
    pub video_config: Option<VideoConfig>,
    pub audio: Option<AudioInfo>,
    pub warnings: Vec<Warning>,
    /// The file was truncated or the analysis cancelled.
    pub partial: bool,
    pub cancelled: bool,
}

impl AnalysisReport {
    /// A numeric `onMetaData` property such as `width`, `framerate` or
    /// `videodatarate`.
    pub fn metadata_number(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(|value| value.as_number())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Warnings whose `kind` is `kind`.
    pub fn warnings_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings
            .iter()
            .filter(move |warning| warning.kind() == kind)
    }
}
