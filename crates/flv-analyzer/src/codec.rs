//! Frame classification from the codec bitstream.
//!
//! Only H.264 is understood. Every other codec, and H.264 when it is
//! switched off, classifies frames as [`FrameType::Unknown`] and relies on
//! the container keyframe bit alone.

use std::io;
use std::num::TryFromIntError;

use bytes::Bytes;
use flv::video::VideoCodecId;
use h264::{
    AVCDecoderConfigurationRecord, AvccNalUnits, NALUnitType, NalHeader, SliceHeader, SliceType,
    Sps,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::Capabilities;

/// NAL unit length prefix used until a sequence header says otherwise.
pub const DEFAULT_NAL_LENGTH_SIZE: u8 = 4;

/// Picture type found in the bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameType {
    I,
    P,
    B,
    Unknown,
}

impl From<SliceType> for FrameType {
    fn from(slice_type: SliceType) -> Self {
        match slice_type {
            SliceType::I | SliceType::SI => Self::I,
            SliceType::P | SliceType::SP => Self::P,
            SliceType::B => Self::B,
        }
    }
}

/// What the container says about a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHint {
    pub is_keyframe: bool,
    pub timestamp_ms: u32,
    pub composition_time: i32,
}

/// One classified video frame.
///
/// `is_keyframe` is the container flag and `frame_type` the bitstream
/// verdict; the two are reported side by side and may disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub codec_id: u8,
    pub frame_type: FrameType,
    pub is_keyframe: bool,
    pub timestamp_ms: u32,
    pub composition_time: i32,
    /// Codec payload size in bytes.
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_idc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_idc: Option<u8>,
    /// Why `frame_type` could not be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl FrameInfo {
    fn unknown(codec_id: VideoCodecId, payload: &Bytes, hint: &FrameHint) -> Self {
        Self {
            codec_id: codec_id.into(),
            frame_type: FrameType::Unknown,
            is_keyframe: hint.is_keyframe,
            timestamp_ms: hint.timestamp_ms,
            composition_time: hint.composition_time,
            size: payload.len() as u32,
            width: None,
            height: None,
            profile_idc: None,
            level_idc: None,
            warning: None,
        }
    }
}

/// Stream parameters from a sequence header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    pub codec_id: u8,
    pub codec: String,
    pub profile_idc: u8,
    pub level_idc: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub nal_length_size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpsSummary {
    profile_idc: u8,
    level_idc: u8,
    width: u32,
    height: u32,
    frame_rate: Option<f64>,
}

impl TryFrom<&Sps> for SpsSummary {
    type Error = TryFromIntError;

    fn try_from(sps: &Sps) -> Result<Self, Self::Error> {
        Ok(Self {
            profile_idc: sps.profile_idc,
            level_idc: sps.level_idc,
            width: u32::try_from(sps.width())?,
            height: u32::try_from(sps.height())?,
            frame_rate: sps.frame_rate(),
        })
    }
}

/// H.264 slice classifier for AVCC payloads.
#[derive(Debug, Clone)]
pub struct H264Parser {
    nal_length_size: u8,
    sps: Option<SpsSummary>,
}

impl Default for H264Parser {
    fn default() -> Self {
        Self {
            nal_length_size: DEFAULT_NAL_LENGTH_SIZE,
            sps: None,
        }
    }
}

impl H264Parser {
    pub fn nal_length_size(&self) -> u8 {
        self.nal_length_size
    }

    fn configure(&mut self, sequence_header: &Bytes) -> io::Result<VideoConfig> {
        let record =
            AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(sequence_header.clone()))?;
        self.nal_length_size = record.nal_length_size();

        match record.first_sps() {
            Some(Ok(sps)) => self.update_sps(&sps),
            Some(Err(err)) => debug!(%err, "sequence header carries an unreadable SPS"),
            None => debug!("sequence header carries no SPS"),
        }

        Ok(VideoConfig {
            codec_id: VideoCodecId::Avc.into(),
            codec: VideoCodecId::Avc.name().to_owned(),
            profile_idc: record.profile_indication,
            level_idc: record.level_indication,
            width: self.sps.map(|sps| sps.width),
            height: self.sps.map(|sps| sps.height),
            frame_rate: self.sps.and_then(|sps| sps.frame_rate),
            nal_length_size: self.nal_length_size,
        })
    }

    fn update_sps(&mut self, sps: &Sps) {
        match SpsSummary::try_from(sps) {
            Ok(summary) => self.sps = Some(summary),
            Err(err) => debug!(
                %err,
                width = sps.width(),
                height = sps.height(),
                "ignoring SPS with an out of range picture size"
            ),
        }
    }

    /// Classifies by the first slice of the access unit. SPS units on the
    /// way update the stream parameters.
    fn classify(&mut self, payload: &Bytes) -> Result<FrameType, String> {
        let nal_units = AvccNalUnits::new(payload.clone(), self.nal_length_size)
            .map_err(|err| err.to_string())?;

        let mut frame_type = None;
        for nal in nal_units {
            let nal = nal.map_err(|err| format!("malformed NAL unit: {err}"))?;
            // zero length units are skipped by the iterator
            let header = NalHeader::parse(nal[0]).map_err(|err| err.to_string())?;

            match header.nal_unit_type {
                NALUnitType::Sps => match Sps::parse_with_emulation_prevention(&nal[..]) {
                    Ok(sps) => self.update_sps(&sps),
                    Err(err) => debug!(%err, "skipping unreadable in-band SPS"),
                },
                NALUnitType::NonIdrSlice | NALUnitType::IdrSlice if frame_type.is_none() => {
                    let slice = SliceHeader::parse(&nal[..])
                        .map_err(|err| format!("malformed slice header: {err}"))?;
                    trace!(?slice, "first slice");

                    frame_type = Some(if slice.is_idr() {
                        FrameType::I
                    } else {
                        slice
                            .kind()
                            .map(FrameType::from)
                            .ok_or_else(|| format!("slice_type {} out of range", slice.slice_type))?
                    });
                }
                _ => {}
            }
        }

        frame_type.ok_or_else(|| "no slice NAL unit in frame".to_owned())
    }

    fn parse(&mut self, payload: &Bytes, hint: &FrameHint) -> FrameInfo {
        let mut info = FrameInfo::unknown(VideoCodecId::Avc, payload, hint);

        match self.classify(payload) {
            Ok(frame_type) => info.frame_type = frame_type,
            Err(warning) => info.warning = Some(warning),
        }

        if let Some(sps) = self.sps {
            info.width = Some(sps.width);
            info.height = Some(sps.height);
            info.profile_idc = Some(sps.profile_idc);
            info.level_idc = Some(sps.level_idc);
        }

        info
    }
}

/// Bitstream parser for the video codec of a stream.
#[derive(Debug, Clone)]
pub enum CodecParser {
    H264(H264Parser),
    Unsupported { codec_id: VideoCodecId },
}

impl CodecParser {
    pub fn select(codec_id: VideoCodecId, capabilities: &Capabilities) -> Self {
        match codec_id {
            VideoCodecId::Avc if capabilities.h264 => Self::H264(H264Parser::default()),
            codec_id => Self::Unsupported { codec_id },
        }
    }

    pub fn codec_id(&self) -> VideoCodecId {
        match self {
            Self::H264(_) => VideoCodecId::Avc,
            Self::Unsupported { codec_id } => *codec_id,
        }
    }

    /// Applies a sequence header. `Ok(None)` for codecs without a parser.
    pub fn configure(&mut self, sequence_header: &Bytes) -> io::Result<Option<VideoConfig>> {
        match self {
            Self::H264(parser) => parser.configure(sequence_header).map(Some),
            Self::Unsupported { .. } => Ok(None),
        }
    }

    pub fn parse(&mut self, payload: &Bytes, hint: &FrameHint) -> FrameInfo {
        match self {
            Self::H264(parser) => parser.parse(payload, hint),
            Self::Unsupported { codec_id } => FrameInfo::unknown(*codec_id, payload, hint),
        }
    }
}
