//! Legacy FLV video tag header.
//!
//! The first payload byte carries the frame type (high nibble) and the codec
//! id (low nibble). AVC adds a 4 byte packet header: the packet type and a
//! signed 24 bit composition time offset.
//!
//! Defined by video_file_format_spec_v10.pdf (Annex E.4.3.1 - VIDEODATA).
//! The enhanced (FourCC) header of E-RTMP is not decoded; such tags show up
//! with [`VideoCodecId::ExHeader`].
//!
//! ```
//! use std::io::Cursor;
//!
//! use bytes::Bytes;
//! use flv::video::{AvcPacketType, VideoCodecId, VideoFrameType, VideoTagHeader};
//!
//! let mut cursor = Cursor::new(Bytes::from_static(&[0x17, 0x01, 0x00, 0x00, 0x21, 0x00]));
//! let header = VideoTagHeader::demux(&mut cursor).unwrap();
//!
//! assert_eq!(header.frame_type, VideoFrameType::KeyFrame);
//! assert_eq!(header.codec_id, VideoCodecId::Avc);
//! assert_eq!(header.avc_packet_type, Some(AvcPacketType::Nalu));
//! assert_eq!(header.composition_time, 33);
//! assert_eq!(cursor.position(), 5);
//! ```

use std::fmt;
use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

/// Type of video frame, as the container declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFrameType {
    /// 1, a seekable frame.
    KeyFrame,
    /// 2, a non-seekable frame.
    InterFrame,
    /// 3, H.263 only.
    DisposableInterFrame,
    /// 4, reserved for server use.
    GeneratedKeyFrame,
    /// 5, the payload is a command, not video data.
    VideoInfoFrame,
    /// Reserved values.
    Unknown(u8),
}

impl From<u8> for VideoFrameType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::KeyFrame,
            2 => Self::InterFrame,
            3 => Self::DisposableInterFrame,
            4 => Self::GeneratedKeyFrame,
            5 => Self::VideoInfoFrame,
            other => Self::Unknown(other),
        }
    }
}

impl VideoFrameType {
    /// Whether the container marks the frame as a random access point.
    pub const fn is_keyframe(self) -> bool {
        matches!(self, Self::KeyFrame | Self::GeneratedKeyFrame)
    }
}

/// Video codec id, the low nibble of the first video payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VideoCodecId {
    SorensonH263,
    ScreenVideo,
    On2VP6,
    On2VP6Alpha,
    ScreenVideoV2,
    /// AVC (H.264)
    Avc,
    /// Enhanced header marker used by some encoders.
    ExHeader,
    /// HEVC with the non-standard id 12.
    LegacyHevc,
    Unknown(u8),
}

impl From<u8> for VideoCodecId {
    fn from(value: u8) -> Self {
        match value {
            2 => Self::SorensonH263,
            3 => Self::ScreenVideo,
            4 => Self::On2VP6,
            5 => Self::On2VP6Alpha,
            6 => Self::ScreenVideoV2,
            7 => Self::Avc,
            9 => Self::ExHeader,
            12 => Self::LegacyHevc,
            other => Self::Unknown(other),
        }
    }
}

impl From<VideoCodecId> for u8 {
    fn from(codec_id: VideoCodecId) -> Self {
        match codec_id {
            VideoCodecId::SorensonH263 => 2,
            VideoCodecId::ScreenVideo => 3,
            VideoCodecId::On2VP6 => 4,
            VideoCodecId::On2VP6Alpha => 5,
            VideoCodecId::ScreenVideoV2 => 6,
            VideoCodecId::Avc => 7,
            VideoCodecId::ExHeader => 9,
            VideoCodecId::LegacyHevc => 12,
            VideoCodecId::Unknown(other) => other,
        }
    }
}

impl VideoCodecId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::SorensonH263 => "Sorenson H.263",
            Self::ScreenVideo => "Screen Video",
            Self::On2VP6 => "On2 VP6",
            Self::On2VP6Alpha => "On2 VP6 with alpha",
            Self::ScreenVideoV2 => "Screen Video v2",
            Self::Avc => "AVC",
            Self::ExHeader => "Enhanced",
            Self::LegacyHevc => "HEVC",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for VideoCodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown ({id})"),
            other => f.write_str(other.name()),
        }
    }
}

/// AVC packet type, the byte after the codec byte for [`VideoCodecId::Avc`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcPacketType {
    /// `AVCDecoderConfigurationRecord`
    SequenceHeader = 0,
    /// One or more length prefixed NAL units.
    Nalu = 1,
    /// Empty body, the lower level end of sequence is not required.
    EndOfSequence = 2,
}

impl TryFrom<u8> for AvcPacketType {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SequenceHeader),
            1 => Ok(Self::Nalu),
            2 => Ok(Self::EndOfSequence),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid AVC packet type: {value}"),
            )),
        }
    }
}

/// The video sub-header in front of the codec payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTagHeader {
    pub frame_type: VideoFrameType,
    pub codec_id: VideoCodecId,
    /// Present for AVC only.
    pub avc_packet_type: Option<AvcPacketType>,
    /// Presentation minus decode time in milliseconds, 0 unless AVC NALU.
    pub composition_time: i32,
}

impl VideoTagHeader {
    /// Reads the sub-header and leaves the cursor at the codec payload.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let byte = reader.read_u8()?;
        let frame_type = VideoFrameType::from(byte >> 4);
        let codec_id = VideoCodecId::from(byte & 0x0F);

        let (avc_packet_type, composition_time) = if codec_id == VideoCodecId::Avc {
            let packet_type = AvcPacketType::try_from(reader.read_u8()?)?;
            (Some(packet_type), reader.read_i24::<BigEndian>()?)
        } else {
            (None, 0)
        };

        Ok(Self {
            frame_type,
            codec_id,
            avc_packet_type,
            composition_time,
        })
    }

    /// Length of the sub-header in bytes.
    pub const fn size(&self) -> usize {
        if self.avc_packet_type.is_some() { 5 } else { 1 }
    }
}
