use std::fmt;
use std::io::{self, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

/// Size of the header in front of every tag payload.
pub const TAG_HEADER_SIZE: usize = 11;
/// Size of the `PreviousTagSize` field after every tag.
pub const PREVIOUS_TAG_SIZE: usize = 4;

/// FLV tag type, the low five bits of the first tag header byte.
///
/// Defined by video_file_format_spec_v10.pdf (Chapter 1 - FLV tags). Only
/// the three types below exist; anything else is skipped by the reader.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlvTagType {
    Audio = 8,
    Video = 9,
    ScriptData = 18,
}

impl FlvTagType {
    /// Maps a tag type byte, ignoring the filter and reserved bits.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value & 0x1F {
            8 => Some(Self::Audio),
            9 => Some(Self::Video),
            18 => Some(Self::ScriptData),
            _ => None,
        }
    }
}

impl fmt::Display for FlvTagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::ScriptData => "script",
        })
    }
}

/// The 11 byte tag header, with the tag type still raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvTagHeader {
    pub tag_type: u8,
    pub data_size: u32,
    /// `Timestamp` and `TimestampExtended` combined.
    pub timestamp_ms: u32,
    pub stream_id: u32,
}

impl FlvTagHeader {
    pub fn parse(mut reader: impl io::Read) -> io::Result<Self> {
        let tag_type = reader.read_u8()?;
        let data_size = reader.read_u24::<BigEndian>()?;
        // 24 bits plus an extension byte holding the upper 8 bits.
        let timestamp_ms = reader.read_u24::<BigEndian>()? | ((reader.read_u8()? as u32) << 24);
        let stream_id = reader.read_u24::<BigEndian>()?;

        Ok(Self {
            tag_type,
            data_size,
            timestamp_ms,
            stream_id,
        })
    }

    /// `PreviousTagSize` value a well formed trailer carries for this tag.
    pub const fn expected_trailer(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size
    }

    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_u8(self.tag_type)?;
        writer.write_u24::<BigEndian>(self.data_size)?;
        writer.write_u24::<BigEndian>(self.timestamp_ms & 0x00FF_FFFF)?;
        writer.write_u8((self.timestamp_ms >> 24) as u8)?;
        writer.write_u24::<BigEndian>(self.stream_id)
    }
}

/// A tag as yielded by [`crate::FlvReader`].
///
/// `data` is a slice of the reader's buffer, cloning the tag does not copy
/// the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvTag {
    pub tag_type: FlvTagType,
    pub timestamp_ms: u32,
    pub stream_id: u32,
    /// Byte offset of the tag header in the source.
    pub offset: u64,
    pub data: Bytes,
}

impl FlvTag {
    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_video(&self) -> bool {
        self.tag_type == FlvTagType::Video
    }

    pub fn is_audio(&self) -> bool {
        self.tag_type == FlvTagType::Audio
    }

    pub fn is_script(&self) -> bool {
        self.tag_type == FlvTagType::ScriptData
    }

    /// Writes header, payload and the matching `PreviousTagSize`.
    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        let data_size = u32::try_from(self.data.len())
            .ok()
            .filter(|size| *size <= 0x00FF_FFFF)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "tag payload over 16 MiB"))?;

        let header = FlvTagHeader {
            tag_type: self.tag_type as u8,
            data_size,
            timestamp_ms: self.timestamp_ms,
            stream_id: self.stream_id,
        };
        header.write(writer)?;
        writer.write_all(&self.data)?;
        writer.write_u32::<BigEndian>(header.expected_trailer())
    }
}
