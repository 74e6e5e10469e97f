//! Size timelines and bitrate figures per elementary stream.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Audio => "audio",
        })
    }
}

/// One tag of a stream: when it is timestamped and how large its payload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub timestamp_ms: u32,
    pub size: u32,
}

pub type TimelineSeries = Vec<TimelinePoint>;

/// Bytes of one stream whose timestamps fall into
/// `[start_ms, start_ms + window_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitrateBucket {
    pub index: u64,
    pub start_ms: u64,
    pub bytes: u64,
    pub bits_per_second: f64,
}

#[derive(Debug, Default)]
struct StreamStats {
    timeline: TimelineSeries,
    bytes: u64,
    min_ms: Option<u32>,
    max_ms: Option<u32>,
}

impl StreamStats {
    fn record(&mut self, timestamp_ms: u32, size: u32) {
        self.timeline.push(TimelinePoint { timestamp_ms, size });
        self.bytes += size as u64;
        self.min_ms = Some(self.min_ms.map_or(timestamp_ms, |min| min.min(timestamp_ms)));
        self.max_ms = self.max_ms.max(Some(timestamp_ms));
    }

    /// Largest minus smallest timestamp, whatever order the tags came in.
    fn span_ms(&self) -> u32 {
        match (self.min_ms, self.max_ms) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }
}

/// Accumulates per-stream sizes while tags stream past.
#[derive(Debug)]
pub struct StatsAggregator {
    window_ms: u32,
    video: StreamStats,
    audio: StreamStats,
    max_timestamp_ms: Option<u32>,
}

impl StatsAggregator {
    /// `window_ms` must be non-zero, which [`crate::AnalyzerConfig::validate`]
    /// guarantees.
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms: window_ms.max(1),
            video: StreamStats::default(),
            audio: StreamStats::default(),
            max_timestamp_ms: None,
        }
    }

    fn stream(&self, stream: StreamKind) -> &StreamStats {
        match stream {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
        }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// Records an audio or video tag.
    pub fn record(&mut self, stream: StreamKind, timestamp_ms: u32, size: u32) {
        self.observe_timestamp(timestamp_ms);
        match stream {
            StreamKind::Video => self.video.record(timestamp_ms, size),
            StreamKind::Audio => self.audio.record(timestamp_ms, size),
        }
    }

    /// Accounts for a tag that belongs to no stream, such as script data.
    pub fn observe_timestamp(&mut self, timestamp_ms: u32) {
        self.max_timestamp_ms = self.max_timestamp_ms.max(Some(timestamp_ms));
    }

    /// Largest tag timestamp seen, 0 without tags.
    pub fn duration_ms(&self) -> u32 {
        self.max_timestamp_ms.unwrap_or(0)
    }

    pub fn bytes(&self, stream: StreamKind) -> u64 {
        self.stream(stream).bytes
    }

    pub fn timeline(&self, stream: StreamKind) -> &[TimelinePoint] {
        &self.stream(stream).timeline
    }

    /// Bits per second over the span of the stream, 0 when the span is
    /// empty.
    pub fn average_bitrate(&self, stream: StreamKind) -> f64 {
        let stats = self.stream(stream);
        let span_ms = stats.span_ms();
        if span_ms == 0 {
            return 0.0;
        }

        8.0 * stats.bytes as f64 / (span_ms as f64 / 1000.0)
    }

    /// Populated buckets of the stream in ascending order.
    pub fn buckets(&self, stream: StreamKind) -> Vec<BitrateBucket> {
        let window_ms = self.window_ms as u64;
        let mut bytes_by_index = BTreeMap::<u64, u64>::new();
        for point in &self.stream(stream).timeline {
            *bytes_by_index
                .entry(point.timestamp_ms as u64 / window_ms)
                .or_default() += point.size as u64;
        }

        let window_s = window_ms as f64 / 1000.0;
        bytes_by_index
            .into_iter()
            .map(|(index, bytes)| BitrateBucket {
                index,
                start_ms: index * window_ms,
                bytes,
                bits_per_second: 8.0 * bytes as f64 / window_s,
            })
            .collect()
    }

    /// Hands the timelines over, leaving empty ones behind.
    pub fn take_timeline(&mut self, stream: StreamKind) -> TimelineSeries {
        match stream {
            StreamKind::Video => std::mem::take(&mut self.video.timeline),
            StreamKind::Audio => std::mem::take(&mut self.audio.timeline),
        }
    }
}
