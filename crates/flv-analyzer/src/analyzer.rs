//! Tag by tag analysis state.
//!
//! [`FlvAnalyzer`] consumes the tags produced by an [`flv::FlvReader`] and
//! turns them into an [`AnalysisReport`]. It does no I/O, the pipeline
//! functions in [`crate::pipeline`] drive it.

use flv::audio::AacAudioConfig;
use flv::{FlvHeader, FlvTag, FlvTagType, MetadataMap, ReaderEvent, ScriptData};
use tracing::{debug, trace, warn};

use crate::codec::{CodecParser, FrameHint, VideoConfig};
use crate::config::AnalyzerConfig;
use crate::demux::{AudioPacket, VideoPacket, VideoPacketKind, demux_audio, demux_video};
use crate::gop::GopReconstructor;
use crate::progress::OnWarning;
use crate::report::{AnalysisReport, AudioInfo, BitrateSummary, TagCounts, Timelines, Totals};
use crate::stats::{StatsAggregator, StreamKind};
use crate::warning::Warning;

pub struct FlvAnalyzer {
    config: AnalyzerConfig,
    header: FlvHeader,
    tag_counts: TagCounts,
    metadata: Option<MetadataMap>,
    metadata_complete: bool,
    metadata_duration_ms: Option<u64>,
    codec: Option<CodecParser>,
    video_config: Option<VideoConfig>,
    audio: Option<AudioInfo>,
    gops: GopReconstructor,
    stats: StatsAggregator,
    warnings: Vec<Warning>,
    on_warning: Option<OnWarning>,
}

impl FlvAnalyzer {
    pub fn new(header: FlvHeader, config: AnalyzerConfig) -> Self {
        let stats = StatsAggregator::new(config.window_ms);
        Self {
            config,
            header,
            tag_counts: TagCounts::default(),
            metadata: None,
            metadata_complete: false,
            metadata_duration_ms: None,
            codec: None,
            video_config: None,
            audio: None,
            gops: GopReconstructor::new(),
            stats,
            warnings: Vec::new(),
            on_warning: None,
        }
    }

    /// Sets a callback invoked for every warning as it is recorded.
    pub fn with_warning_sink(mut self, on_warning: Option<OnWarning>) -> Self {
        self.on_warning = on_warning;
        self
    }

    pub fn tag_counts(&self) -> TagCounts {
        self.tag_counts
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn warn(&mut self, warning: Warning) {
        warn!(kind = warning.kind(), "{warning}");
        if let Some(on_warning) = &self.on_warning {
            on_warning(&warning);
        }
        self.warnings.push(warning);
    }

    /// Records what the reader reported while producing the latest tag.
    pub fn record_reader_events(&mut self, events: impl IntoIterator<Item = ReaderEvent>) {
        for event in events {
            self.warn(event.into());
        }
    }

    pub fn process_tag(&mut self, tag: &FlvTag) {
        trace!(
            tag_type = %tag.tag_type,
            offset = tag.offset,
            timestamp_ms = tag.timestamp_ms,
            size = tag.size(),
            "analyzing tag"
        );

        match tag.tag_type {
            FlvTagType::Audio => {
                self.tag_counts.audio += 1;
                self.stats
                    .record(StreamKind::Audio, tag.timestamp_ms, tag.size() as u32);
                self.process_audio(tag);
            }
            FlvTagType::Video => {
                self.tag_counts.video += 1;
                self.stats
                    .record(StreamKind::Video, tag.timestamp_ms, tag.size() as u32);
                self.process_video(tag);
            }
            FlvTagType::ScriptData => {
                self.tag_counts.script += 1;
                self.stats.observe_timestamp(tag.timestamp_ms);
                self.process_script(tag);
            }
        }
    }

    fn process_script(&mut self, tag: &FlvTag) {
        let script = ScriptData::demux(&tag.data);
        if !script.is_on_metadata() {
            debug!(name = ?script.name, offset = tag.offset, "ignoring script tag");
            return;
        }
        if self.metadata.is_some() {
            debug!(offset = tag.offset, "ignoring repeated onMetaData");
            return;
        }

        let metadata = script.metadata();
        self.metadata_duration_ms = metadata
            .get("duration")
            .and_then(|duration| duration.as_number())
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .map(|seconds| (seconds * 1000.0).round() as u64);
        debug!(
            properties = metadata.len(),
            duration_ms = ?self.metadata_duration_ms,
            "found onMetaData"
        );
        self.metadata = Some(metadata);
        self.metadata_complete = script.is_complete();

        if let Some(error) = &script.error {
            self.warn(Warning::IncompleteMetadata {
                offset: tag.offset,
                reason: error.to_string(),
            });
        } else if script.value.is_none() {
            self.warn(Warning::IncompleteMetadata {
                offset: tag.offset,
                reason: "onMetaData has no value".to_owned(),
            });
        }
    }

    fn process_audio(&mut self, tag: &FlvTag) {
        let packet = match demux_audio(tag) {
            Ok(packet) => packet,
            Err(err) => {
                self.warn(Warning::Demux {
                    offset: tag.offset,
                    stream: StreamKind::Audio,
                    reason: err.to_string(),
                });
                return;
            }
        };

        let info = self.audio.get_or_insert_with(|| audio_info(&packet));
        if packet.is_aac_sequence_header() && !info.aac_sequence_header {
            info.aac_sequence_header = true;
            match AacAudioConfig::parse(&packet.body) {
                Ok(config) => {
                    info.aac_object_type = Some(config.audio_object_type);
                    info.sample_rate = config.sample_rate;
                    if config.channel_configuration > 0 {
                        info.channels = config.channel_configuration;
                    }
                }
                Err(err) => debug!(%err, "unreadable AudioSpecificConfig"),
            }
        }
    }

    fn process_video(&mut self, tag: &FlvTag) {
        let packet = match demux_video(tag) {
            Ok(packet) => packet,
            Err(err) => {
                self.warn(Warning::Demux {
                    offset: tag.offset,
                    stream: StreamKind::Video,
                    reason: err.to_string(),
                });
                return;
            }
        };

        if self
            .codec
            .as_ref()
            .is_none_or(|codec| codec.codec_id() != packet.codec_id)
        {
            debug!(codec = %packet.codec_id, "selecting video codec parser");
            self.codec = Some(CodecParser::select(
                packet.codec_id,
                &self.config.capabilities,
            ));
        }
        let Some(codec) = self.codec.as_mut() else {
            return;
        };

        match &packet.kind {
            VideoPacketKind::SequenceHeader(body) => match codec.configure(body) {
                Ok(Some(config)) => {
                    debug!(?config, "video sequence header");
                    self.video_config.get_or_insert(config);
                }
                Ok(None) => {}
                Err(err) => self.warn(Warning::FrameDecode {
                    offset: tag.offset,
                    timestamp_ms: tag.timestamp_ms,
                    reason: format!("invalid sequence header: {err}"),
                }),
            },
            VideoPacketKind::Frame(body) => {
                let frame = codec.parse(body, &frame_hint(&packet));
                if let Some(reason) = frame.warning.clone() {
                    self.warn(Warning::FrameDecode {
                        offset: tag.offset,
                        timestamp_ms: tag.timestamp_ms,
                        reason,
                    });
                }
                self.gops.push(frame);
            }
            VideoPacketKind::EndOfSequence | VideoPacketKind::Command => {}
        }
    }

    fn check_header_flags(&mut self) {
        let checks = [
            (StreamKind::Video, self.header.has_video, self.tag_counts.video),
            (StreamKind::Audio, self.header.has_audio, self.tag_counts.audio),
        ];

        for (stream, flag, tags) in checks {
            if flag != (tags > 0) {
                self.warn(Warning::HeaderFlagMismatch { stream, flag, tags });
            }
        }
    }

    fn check_duration(&mut self) {
        let Some(metadata_ms) = self.metadata_duration_ms else {
            return;
        };

        let observed_ms = self.stats.duration_ms();
        let tolerance_ms = self.config.duration_tolerance_ms;
        if metadata_ms.abs_diff(observed_ms as u64) > tolerance_ms as u64 {
            self.warn(Warning::DurationMismatch {
                observed_ms,
                metadata_ms,
                tolerance_ms,
            });
        }
    }

    /// Closes the last GOP, runs the whole-file checks and builds the
    /// report.
    pub fn finish(mut self, truncated: bool, cancelled: bool) -> AnalysisReport {
        self.gops.finish();
        // A cancelled run has not seen every tag, the checks would misfire.
        if !cancelled {
            self.check_header_flags();
            self.check_duration();
        }

        let bitrate = BitrateSummary {
            window_ms: self.stats.window_ms(),
            video: self.stats.buckets(StreamKind::Video),
            audio: self.stats.buckets(StreamKind::Audio),
        };
        let totals = Totals {
            duration_ms: self.stats.duration_ms(),
            metadata_duration_ms: self.metadata_duration_ms,
            avg_bitrate_video: self.stats.average_bitrate(StreamKind::Video),
            avg_bitrate_audio: self.stats.average_bitrate(StreamKind::Audio),
            video_bytes: self.stats.bytes(StreamKind::Video),
            audio_bytes: self.stats.bytes(StreamKind::Audio),
        };
        let timelines = Timelines {
            video: self.stats.take_timeline(StreamKind::Video),
            audio: self.stats.take_timeline(StreamKind::Audio),
        };
        let frame_counts = self.gops.counts();

        debug!(
            tags = self.tag_counts.total(),
            gops = self.gops.gops().len(),
            warnings = self.warnings.len(),
            truncated,
            cancelled,
            "analysis finished"
        );

        AnalysisReport {
            header: self.header.into(),
            metadata: self.metadata.unwrap_or_default(),
            metadata_complete: self.metadata_complete,
            tag_counts: self.tag_counts,
            total_tags: self.tag_counts.total(),
            gops: self.gops.into_gops(),
            frame_counts,
            timelines,
            bitrate,
            totals,
            video_config: self.video_config,
            audio: self.audio,
            warnings: self.warnings,
            partial: truncated || cancelled,
            cancelled,
        }
    }
}

fn frame_hint(packet: &VideoPacket) -> FrameHint {
    FrameHint {
        is_keyframe: packet.frame_type_hint.is_keyframe(),
        timestamp_ms: packet.timestamp_ms,
        composition_time: packet.composition_time,
    }
}

fn audio_info(packet: &AudioPacket) -> AudioInfo {
    AudioInfo {
        format_id: packet.format.into(),
        format: packet.format.name().to_owned(),
        sample_rate: packet.rate.hz(),
        sample_size: packet.size.bits(),
        channels: packet.channels(),
        aac_sequence_header: false,
        aac_object_type: None,
    }
}
