use std::io;

use bytes::Bytes;

/// `nal_unit_type`, ISO/IEC 14496-10 Table 7-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// Coded slice of a non-IDR picture (1)
    NonIdrSlice,
    /// Slice data partition A, B or C (2-4)
    SliceDataPartition,
    /// Coded slice of an IDR picture (5)
    IdrSlice,
    /// Supplemental enhancement information (6)
    Sei,
    /// Sequence parameter set (7)
    Sps,
    /// Picture parameter set (8)
    Pps,
    /// Access unit delimiter (9)
    AccessUnitDelimiter,
    /// End of sequence (10)
    EndOfSeq,
    /// End of stream (11)
    EndOfStream,
    /// Filler data (12)
    FillerData,
    /// Any other type, including reserved and unspecified values.
    Other(u8),
}

impl From<u8> for NALUnitType {
    /// Only the low five bits are looked at.
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => Self::NonIdrSlice,
            2..=4 => Self::SliceDataPartition,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSeq,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            other => Self::Other(other),
        }
    }
}

impl NALUnitType {
    /// Types carrying a slice header that starts with `first_mb_in_slice`
    /// and `slice_type`.
    pub const fn is_slice(self) -> bool {
        matches!(self, Self::NonIdrSlice | Self::IdrSlice)
    }
}

/// The one byte NAL unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// `nal_ref_idc`, 0 for non-reference pictures.
    pub nal_ref_idc: u8,
    /// `nal_unit_type`
    pub nal_unit_type: NALUnitType,
}

impl NalHeader {
    /// Parses the header byte, rejecting a set `forbidden_zero_bit`.
    pub fn parse(byte: u8) -> io::Result<Self> {
        if byte & 0x80 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "forbidden zero bit is set",
            ));
        }

        Ok(Self {
            nal_ref_idc: (byte >> 5) & 0b11,
            nal_unit_type: NALUnitType::from(byte),
        })
    }
}

/// Iterates over the NAL units of an AVCC (length prefixed) payload, as
/// carried in FLV and MP4.
///
/// Each item is a zero-copy slice of the payload starting at the NAL header.
/// Zero-length units are skipped. After the first error the iterator is
/// exhausted.
#[derive(Debug, Clone)]
pub struct AvccNalUnits {
    data: Bytes,
    pos: usize,
    length_size: usize,
    failed: bool,
}

impl AvccNalUnits {
    /// `length_size` is `lengthSizeMinusOne + 1` from the decoder
    /// configuration record, one to four bytes.
    pub fn new(data: Bytes, length_size: u8) -> io::Result<Self> {
        if !(1..=4).contains(&length_size) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid NAL length size {length_size}"),
            ));
        }

        Ok(Self {
            data,
            pos: 0,
            length_size: length_size as usize,
            failed: false,
        })
    }

    fn fail(&mut self, kind: io::ErrorKind, msg: String) -> Option<io::Result<Bytes>> {
        self.failed = true;
        Some(Err(io::Error::new(kind, msg)))
    }
}

impl Iterator for AvccNalUnits {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let remaining = self.data.len() - self.pos;
            if self.failed || remaining == 0 {
                return None;
            }

            if remaining < self.length_size {
                return self.fail(
                    io::ErrorKind::UnexpectedEof,
                    format!("{remaining} trailing bytes are too short for a NAL length"),
                );
            }

            let len = self.data[self.pos..self.pos + self.length_size]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            let start = self.pos + self.length_size;

            if len > self.data.len() - start {
                return self.fail(
                    io::ErrorKind::InvalidData,
                    format!(
                        "NAL length {len} at offset {} runs past the payload end ({} bytes left)",
                        self.pos,
                        self.data.len() - start
                    ),
                );
            }

            self.pos = start + len;
            if len > 0 {
                return Some(Ok(self.data.slice(start..start + len)));
            }
        }
    }
}
