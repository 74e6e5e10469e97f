use std::io::{self, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use bytes_util::{BytesCursor, BytesCursorExt};

use crate::Sps;

/// The AVC decoder configuration record, ISO/IEC 14496-15 clause 5.3.2.1.
///
/// FLV carries it as the body of an AVC sequence header packet. The high
/// profile extension (chroma format and bit depths) is not kept, the same
/// values are available from the SPS.
#[derive(Debug, Clone, PartialEq)]
pub struct AVCDecoderConfigurationRecord {
    /// Always 1.
    pub configuration_version: u8,
    /// `AVCProfileIndication`, the SPS `profile_idc`.
    pub profile_indication: u8,
    /// `profile_compatibility`, the SPS constraint flags byte.
    pub profile_compatibility: u8,
    /// `AVCLevelIndication`, the SPS `level_idc`.
    pub level_indication: u8,
    /// Size of the NAL unit length prefix minus one.
    pub length_size_minus_one: u8,
    /// Sequence parameter set NAL units.
    pub sps: Vec<Bytes>,
    /// Picture parameter set NAL units.
    pub pps: Vec<Bytes>,
}

impl AVCDecoderConfigurationRecord {
    /// Parses a record, parameter sets are zero-copy slices of the input.
    pub fn parse(reader: &mut BytesCursor) -> io::Result<Self> {
        let configuration_version = reader.read_u8()?;
        let profile_indication = reader.read_u8()?;
        let profile_compatibility = reader.read_u8()?;
        let level_indication = reader.read_u8()?;
        let length_size_minus_one = reader.read_u8()? & 0b0000_0011;

        let sps_count = reader.read_u8()? & 0b0001_1111;
        let sps = Self::read_parameter_sets(reader, sps_count)?;

        let pps_count = reader.read_u8()?;
        let pps = Self::read_parameter_sets(reader, pps_count)?;

        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    fn read_parameter_sets(reader: &mut BytesCursor, count: u8) -> io::Result<Vec<Bytes>> {
        (0..count)
            .map(|_| {
                let len = reader.read_u16::<BigEndian>()?;
                reader.extract_bytes(len as usize)
            })
            .collect()
    }

    /// Length of the NAL unit size prefix in the stream, 1 to 4 bytes.
    pub const fn nal_length_size(&self) -> u8 {
        self.length_size_minus_one + 1
    }

    /// Parses the first SPS, if there is one.
    pub fn first_sps(&self) -> Option<io::Result<Sps>> {
        self.sps
            .first()
            .map(|sps| Sps::parse_with_emulation_prevention(&sps[..]))
    }

    /// Writes the record, reserved bits set to one.
    pub fn build<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.configuration_version)?;
        writer.write_u8(self.profile_indication)?;
        writer.write_u8(self.profile_compatibility)?;
        writer.write_u8(self.level_indication)?;
        writer.write_u8(0b1111_1100 | (self.length_size_minus_one & 0b11))?;

        let sps_count = u8::try_from(self.sps.len())
            .ok()
            .filter(|count| *count <= 0b1_1111)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many SPS units"))?;
        writer.write_u8(0b1110_0000 | sps_count)?;
        Self::write_parameter_sets(writer, &self.sps)?;

        let pps_count = u8::try_from(self.pps.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many PPS units"))?;
        writer.write_u8(pps_count)?;
        Self::write_parameter_sets(writer, &self.pps)
    }

    fn write_parameter_sets<W: Write>(writer: &mut W, sets: &[Bytes]) -> io::Result<()> {
        for set in sets {
            let len = u16::try_from(set.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "parameter set over 65535 bytes")
            })?;
            writer.write_u16::<BigEndian>(len)?;
            writer.write_all(set)?;
        }
        Ok(())
    }
}
