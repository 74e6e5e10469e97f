//! Splits audio and video tag payloads into their FLV sub-header and the
//! codec payload behind it.

use std::io;

use bytes::Bytes;
use flv::audio::{AacPacketType, AudioTagHeader, SoundFormat, SoundRate, SoundSize, SoundType};
use flv::video::{AvcPacketType, VideoCodecId, VideoFrameType, VideoTagHeader};
use flv::{FlvTag, FlvTagType};

#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    #[error("empty {0} tag")]
    Empty(FlvTagType),
    #[error("malformed {tag_type} sub-header: {source}")]
    Header {
        tag_type: FlvTagType,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoPacketKind {
    /// Coded picture data.
    Frame(Bytes),
    /// Decoder configuration, an `AVCDecoderConfigurationRecord` for AVC.
    SequenceHeader(Bytes),
    EndOfSequence,
    /// A video info / command frame, carries no picture.
    Command,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoPacket {
    pub codec_id: VideoCodecId,
    /// Frame type as declared by the container.
    pub frame_type_hint: VideoFrameType,
    pub timestamp_ms: u32,
    pub composition_time: i32,
    pub kind: VideoPacketKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioPacket {
    pub format: SoundFormat,
    pub rate: SoundRate,
    pub size: SoundSize,
    pub sound_type: SoundType,
    pub aac_packet_type: Option<AacPacketType>,
    pub timestamp_ms: u32,
    pub body: Bytes,
}

impl AudioPacket {
    pub fn channels(&self) -> u8 {
        self.sound_type.channels()
    }

    pub fn is_aac_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AacPacketType::SequenceHeader)
    }
}

fn remaining(cursor: &io::Cursor<Bytes>) -> Bytes {
    let position = (cursor.position() as usize).min(cursor.get_ref().len());
    cursor.get_ref().slice(position..)
}

/// Demuxes a video tag. The codec payload shares the tag's buffer.
pub fn demux_video(tag: &FlvTag) -> Result<VideoPacket, DemuxError> {
    if tag.data.is_empty() {
        return Err(DemuxError::Empty(FlvTagType::Video));
    }

    let mut cursor = io::Cursor::new(tag.data.clone());
    let header = VideoTagHeader::demux(&mut cursor).map_err(|source| DemuxError::Header {
        tag_type: FlvTagType::Video,
        source,
    })?;
    let body = remaining(&cursor);

    let kind = match header.avc_packet_type {
        Some(AvcPacketType::SequenceHeader) => VideoPacketKind::SequenceHeader(body),
        Some(AvcPacketType::EndOfSequence) => VideoPacketKind::EndOfSequence,
        _ if header.frame_type == VideoFrameType::VideoInfoFrame => VideoPacketKind::Command,
        _ => VideoPacketKind::Frame(body),
    };

    Ok(VideoPacket {
        codec_id: header.codec_id,
        frame_type_hint: header.frame_type,
        timestamp_ms: tag.timestamp_ms,
        composition_time: header.composition_time,
        kind,
    })
}

/// Demuxes an audio tag. The codec payload shares the tag's buffer.
pub fn demux_audio(tag: &FlvTag) -> Result<AudioPacket, DemuxError> {
    if tag.data.is_empty() {
        return Err(DemuxError::Empty(FlvTagType::Audio));
    }

    let mut cursor = io::Cursor::new(tag.data.clone());
    let header = AudioTagHeader::demux(&mut cursor).map_err(|source| DemuxError::Header {
        tag_type: FlvTagType::Audio,
        source,
    })?;

    Ok(AudioPacket {
        format: header.sound_format,
        rate: header.sound_rate,
        size: header.sound_size,
        sound_type: header.sound_type,
        aac_packet_type: header.aac_packet_type,
        timestamp_ms: tag.timestamp_ms,
        body: remaining(&cursor),
    })
}
