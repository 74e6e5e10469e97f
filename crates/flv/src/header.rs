use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::FlvError;

/// Size of the header defined by FLV version 1.
pub const FLV_HEADER_SIZE: usize = 9;

const FLV_SIGNATURE: [u8; 3] = *b"FLV";
const FLAG_AUDIO: u8 = 0b0000_0100;
const FLAG_VIDEO: u8 = 0b0000_0001;

/// The FLV file header.
///
/// Defined by video_file_format_spec_v10.pdf (Chapter 1 - The FLV header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    /// File format version, 1 for every file seen in practice.
    pub version: u8,
    /// `TypeFlagsAudio`
    pub has_audio: bool,
    /// `TypeFlagsVideo`
    pub has_video: bool,
    /// Offset of the first `PreviousTagSize`, the header length.
    pub data_offset: u32,
}

impl FlvHeader {
    /// A version 1 header with the standard 9 byte length.
    pub const fn new(has_audio: bool, has_video: bool) -> Self {
        Self {
            version: 1,
            has_audio,
            has_video,
            data_offset: FLV_HEADER_SIZE as u32,
        }
    }

    /// Parses the 9 fixed header bytes.
    ///
    /// The signature is checked before anything else, a mismatch is
    /// [`FlvError::InvalidSignature`]. A `data_offset` below 9 is
    /// [`FlvError::InvalidHeader`]; a larger one is accepted and the caller
    /// skips the extra bytes.
    pub fn parse(mut reader: impl io::Read) -> Result<Self, FlvError> {
        let mut signature = [0u8; 3];
        reader.read_exact(&mut signature)?;
        if signature != FLV_SIGNATURE {
            return Err(FlvError::InvalidSignature(signature));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let data_offset = reader.read_u32::<BigEndian>()?;

        if (data_offset as usize) < FLV_HEADER_SIZE {
            return Err(FlvError::InvalidHeader(format!(
                "data offset {data_offset} is smaller than the header"
            )));
        }

        Ok(Self {
            version,
            has_audio: flags & FLAG_AUDIO != 0,
            has_video: flags & FLAG_VIDEO != 0,
            data_offset,
        })
    }

    /// The `TypeFlags` byte.
    pub const fn flags(&self) -> u8 {
        (if self.has_audio { FLAG_AUDIO } else { 0 }) | (if self.has_video { FLAG_VIDEO } else { 0 })
    }

    /// Writes the header, padding up to `data_offset` with zeros.
    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&FLV_SIGNATURE)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.flags())?;
        writer.write_u32::<BigEndian>(self.data_offset)?;

        let padding = u64::from(self.data_offset).saturating_sub(FLV_HEADER_SIZE as u64);
        io::copy(&mut io::repeat(0).take(padding), writer)?;
        Ok(())
    }
}

impl fmt::Display for FlvHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FLV v{} (audio: {}, video: {}, header size: {})",
            self.version, self.has_audio, self.has_video, self.data_offset
        )
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_video_header() {
        let header = FlvHeader::parse(&[0x46, 0x4C, 0x56, 0x01, 0x05, 0x00, 0x00, 0x00, 0x09][..])
            .unwrap();

        assert_eq!(header, FlvHeader::new(true, true));
        assert_eq!(header.to_string(), "FLV v1 (audio: true, video: true, header size: 9)");
    }

    #[test]
    fn test_flags() {
        for (flags, has_audio, has_video) in [(0x01, false, true), (0x04, true, false), (0x00, false, false)] {
            let header =
                FlvHeader::parse(&[b'F', b'L', b'V', 0x01, flags, 0, 0, 0, 9][..]).unwrap();
            assert_eq!(header.has_audio, has_audio);
            assert_eq!(header.has_video, has_video);
            assert_eq!(header.flags(), flags);
        }
    }

    #[test]
    fn test_invalid_signature() {
        let err = FlvHeader::parse(&b"ABC\x01\x05\x00\x00\x00\x09"[..]).unwrap_err();
        assert!(matches!(err, FlvError::InvalidSignature(sig) if &sig == b"ABC"));
    }

    #[test]
    fn test_small_data_offset() {
        let err = FlvHeader::parse(&b"FLV\x01\x05\x00\x00\x00\x04"[..]).unwrap_err();
        assert!(matches!(err, FlvError::InvalidHeader(_)));
    }

    #[test]
    fn test_short_input() {
        let err = FlvHeader::parse(&b"FLV\x01"[..]).unwrap_err();
        assert!(matches!(err, FlvError::Io(_)));
    }

    #[test]
    fn test_write_with_padding() {
        let header = FlvHeader {
            data_offset: 13,
            ..FlvHeader::new(false, true)
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();

        assert_eq!(buf.len(), 13);
        assert_eq!(FlvHeader::parse(&buf[..]).unwrap(), header);
    }
}
