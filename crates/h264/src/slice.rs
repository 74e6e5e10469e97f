use std::io;

use bytes_util::BitReader;
use expgolomb::BitReaderExpGolombExt;

use crate::{EmulationPreventionIo, NALUnitType, NalHeader};

/// `slice_type` modulo 5, Table 7-6. Values 5 to 9 only add the promise
/// that every slice of the picture has the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    /// 0 / 5
    P,
    /// 1 / 6
    B,
    /// 2 / 7
    I,
    /// 3 / 8, switching P
    SP,
    /// 4 / 9, switching I
    SI,
}

impl SliceType {
    /// Maps a raw `slice_type`, `None` above 9.
    pub const fn from_raw(slice_type: u64) -> Option<Self> {
        if slice_type > 9 {
            return None;
        }

        Some(match slice_type % 5 {
            0 => Self::P,
            1 => Self::B,
            2 => Self::I,
            3 => Self::SP,
            _ => Self::SI,
        })
    }

    /// Intra-only slices, I and SI.
    pub const fn is_intra(self) -> bool {
        matches!(self, Self::I | Self::SI)
    }
}

/// The first fields of a slice header, 7.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHeader {
    /// Header of the NAL unit the slice came from.
    pub nal: NalHeader,
    /// `first_mb_in_slice`
    pub first_mb_in_slice: u64,
    /// Raw `slice_type`, see [`SliceHeader::slice_type`].
    pub slice_type: u64,
    /// `pic_parameter_set_id`, `None` when the NAL unit ends before it.
    pub pic_parameter_set_id: Option<u64>,
}

impl SliceHeader {
    /// Parses the start of a slice NAL unit, header byte included. Emulation
    /// prevention bytes are removed on the way.
    ///
    /// `first_mb_in_slice` and `slice_type` are required, anything after
    /// them is read only if present.
    pub fn parse(reader: impl io::Read) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(EmulationPreventionIo::new(reader));

        let nal = NalHeader::parse(bit_reader.read_u8()?)?;
        if !nal.nal_unit_type.is_slice() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{:?} does not carry a slice header", nal.nal_unit_type),
            ));
        }

        let first_mb_in_slice = bit_reader.read_exp_golomb()?;
        let slice_type = bit_reader.read_exp_golomb()?;

        Ok(Self {
            nal,
            first_mb_in_slice,
            slice_type,
            pic_parameter_set_id: bit_reader.read_exp_golomb().ok(),
        })
    }

    /// `true` for slices of an IDR picture.
    pub fn is_idr(&self) -> bool {
        self.nal.nal_unit_type == NALUnitType::IdrSlice
    }

    /// The slice type, `None` when the raw value is out of range.
    pub const fn kind(&self) -> Option<SliceType> {
        SliceType::from_raw(self.slice_type)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes_util::BitWriter;
    use expgolomb::BitWriterExpGolombExt;

    use super::*;

    fn slice_nal(header: u8, slice_type: u64) -> Vec<u8> {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(header as u64, 8).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(slice_type).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_bit(true).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_slice_type_mapping() {
        let cases = [
            (0, Some(SliceType::P)),
            (1, Some(SliceType::B)),
            (2, Some(SliceType::I)),
            (3, Some(SliceType::SP)),
            (4, Some(SliceType::SI)),
            (5, Some(SliceType::P)),
            (6, Some(SliceType::B)),
            (7, Some(SliceType::I)),
            (8, Some(SliceType::SP)),
            (9, Some(SliceType::SI)),
            (10, None),
        ];

        for (raw, expected) in cases {
            assert_eq!(SliceType::from_raw(raw), expected, "slice_type {raw}");
        }
        assert!(SliceType::SI.is_intra());
        assert!(!SliceType::SP.is_intra());
    }

    #[test]
    fn test_parse_idr_slice() {
        let header = SliceHeader::parse(&slice_nal(0x65, 7)[..]).unwrap();

        insta::assert_debug_snapshot!(header, @r"
        SliceHeader {
            nal: NalHeader {
                nal_ref_idc: 3,
                nal_unit_type: IdrSlice,
            },
            first_mb_in_slice: 0,
            slice_type: 7,
            pic_parameter_set_id: Some(
                0,
            ),
        }
        ");
        assert!(header.is_idr());
        assert_eq!(header.kind(), Some(SliceType::I));
    }

    #[test]
    fn test_parse_b_slice() {
        let header = SliceHeader::parse(&slice_nal(0x01, 1)[..]).unwrap();
        assert!(!header.is_idr());
        assert_eq!(header.nal.nal_ref_idc, 0);
        assert_eq!(header.kind(), Some(SliceType::B));
    }

    #[test]
    fn test_out_of_range_slice_type() {
        let header = SliceHeader::parse(&slice_nal(0x41, 12)[..]).unwrap();
        assert_eq!(header.slice_type, 12);
        assert_eq!(header.kind(), None);
    }

    #[test]
    fn test_rejects_non_slice() {
        let err = SliceHeader::parse(&[0x06, 0x05, 0x80][..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_slice_cut_after_type() {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0x65, 8).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(7).unwrap();
        let data = writer.finish().unwrap();
        assert_eq!(data.len(), 2);

        let header = SliceHeader::parse(&data[..]).unwrap();
        assert_eq!(header.kind(), Some(SliceType::I));
        assert_eq!(header.pic_parameter_set_id, None);
    }

    #[test]
    fn test_truncated_slice() {
        let err = SliceHeader::parse(&[0x41, 0x00][..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
