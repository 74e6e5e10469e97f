use std::io;

use bytes_util::BitReader;
use expgolomb::BitReaderExpGolombExt;

use crate::{EmulationPreventionIo, NALUnitType, NalHeader};

/// Longest `num_ref_frames_in_pic_order_cnt_cycle` allowed by 7.4.2.1.1.
const MAX_POC_CYCLE: u64 = 255;

/// Upper bound on `pic_width_in_mbs_minus1 + 1` and
/// `pic_height_in_map_units_minus1 + 1`, far above any level limit.
const MAX_PIC_SIZE_IN_MBS: u64 = 1 << 16;

/// `frame_crop_*_offset` values, in crop units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCrop {
    /// `frame_crop_left_offset`
    pub left: u64,
    /// `frame_crop_right_offset`
    pub right: u64,
    /// `frame_crop_top_offset`
    pub top: u64,
    /// `frame_crop_bottom_offset`
    pub bottom: u64,
}

/// VUI timing information, E.1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    /// `num_units_in_tick`
    pub num_units_in_tick: u32,
    /// `time_scale`
    pub time_scale: u32,
    /// `fixed_frame_rate_flag`
    pub fixed_frame_rate_flag: bool,
}

/// The fields of a sequence parameter set needed to describe the stream:
/// profile, level, chroma format and picture size.
///
/// ISO/IEC 14496-10 clause 7.3.2.1.1. Scaling lists, picture order count
/// details and most of the VUI are read past and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// `profile_idc`
    pub profile_idc: u8,
    /// `constraint_set0_flag` through `constraint_set5_flag` plus the two
    /// reserved bits, as one byte.
    pub constraint_flags: u8,
    /// `level_idc`, ten times the level number.
    pub level_idc: u8,
    /// `seq_parameter_set_id`
    pub seq_parameter_set_id: u64,
    /// `chroma_format_idc`, 1 (4:2:0) unless a high profile says otherwise.
    pub chroma_format_idc: u8,
    /// `separate_colour_plane_flag`
    pub separate_colour_plane_flag: bool,
    /// `bit_depth_luma_minus8`
    pub bit_depth_luma_minus8: u8,
    /// `bit_depth_chroma_minus8`
    pub bit_depth_chroma_minus8: u8,
    /// `pic_order_cnt_type`
    pub pic_order_cnt_type: u8,
    /// `max_num_ref_frames`
    pub max_num_ref_frames: u64,
    /// `pic_width_in_mbs_minus1`
    pub pic_width_in_mbs_minus1: u64,
    /// `pic_height_in_map_units_minus1`
    pub pic_height_in_map_units_minus1: u64,
    /// `frame_mbs_only_flag`
    pub frame_mbs_only_flag: bool,
    /// Present when `frame_cropping_flag` is set.
    pub frame_crop: Option<FrameCrop>,
    /// Present when the VUI carries timing information.
    pub timing_info: Option<TimingInfo>,
}

impl Sps {
    /// Parses an SPS NAL unit, header byte included, that has already had
    /// its emulation prevention bytes removed.
    pub fn parse(reader: impl io::Read) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(reader);

        let header = NalHeader::parse(bit_reader.read_u8()?)?;
        if header.nal_unit_type != NALUnitType::Sps {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected an SPS, got {:?}", header.nal_unit_type),
            ));
        }

        let profile_idc = bit_reader.read_u8()?;
        let constraint_flags = bit_reader.read_u8()?;
        let level_idc = bit_reader.read_u8()?;
        let seq_parameter_set_id = bit_reader.read_exp_golomb()?;

        let mut sps = Sps {
            profile_idc,
            constraint_flags,
            level_idc,
            seq_parameter_set_id,
            chroma_format_idc: 1,
            separate_colour_plane_flag: false,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            pic_order_cnt_type: 0,
            max_num_ref_frames: 0,
            pic_width_in_mbs_minus1: 0,
            pic_height_in_map_units_minus1: 0,
            frame_mbs_only_flag: true,
            frame_crop: None,
            timing_info: None,
        };

        if matches!(
            profile_idc,
            100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
        ) {
            sps.chroma_format_idc = bit_reader.read_exp_golomb()? as u8;
            if sps.chroma_format_idc == 3 {
                sps.separate_colour_plane_flag = bit_reader.read_bit()?;
            }
            sps.bit_depth_luma_minus8 = bit_reader.read_exp_golomb()? as u8;
            sps.bit_depth_chroma_minus8 = bit_reader.read_exp_golomb()? as u8;
            // qpprime_y_zero_transform_bypass_flag
            bit_reader.read_bit()?;

            if bit_reader.read_bit()? {
                let lists = if sps.chroma_format_idc == 3 { 12 } else { 8 };
                for i in 0..lists {
                    if bit_reader.read_bit()? {
                        skip_scaling_list(&mut bit_reader, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        // log2_max_frame_num_minus4
        bit_reader.read_exp_golomb()?;
        sps.pic_order_cnt_type = bit_reader.read_exp_golomb()? as u8;
        match sps.pic_order_cnt_type {
            0 => {
                // log2_max_pic_order_cnt_lsb_minus4
                bit_reader.read_exp_golomb()?;
            }
            1 => {
                // delta_pic_order_always_zero_flag
                bit_reader.read_bit()?;
                // offset_for_non_ref_pic, offset_for_top_to_bottom_field
                bit_reader.read_signed_exp_golomb()?;
                bit_reader.read_signed_exp_golomb()?;

                let cycle = bit_reader.read_exp_golomb()?;
                if cycle > MAX_POC_CYCLE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("num_ref_frames_in_pic_order_cnt_cycle {cycle} out of range"),
                    ));
                }
                for _ in 0..cycle {
                    bit_reader.read_signed_exp_golomb()?;
                }
            }
            _ => {}
        }

        sps.max_num_ref_frames = bit_reader.read_exp_golomb()?;
        // gaps_in_frame_num_value_allowed_flag
        bit_reader.read_bit()?;
        sps.pic_width_in_mbs_minus1 = bit_reader.read_exp_golomb()?;
        sps.pic_height_in_map_units_minus1 = bit_reader.read_exp_golomb()?;
        if sps.pic_width_in_mbs_minus1 >= MAX_PIC_SIZE_IN_MBS
            || sps.pic_height_in_map_units_minus1 >= MAX_PIC_SIZE_IN_MBS
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "picture size {}x{} macroblocks out of range",
                    sps.pic_width_in_mbs_minus1.saturating_add(1),
                    sps.pic_height_in_map_units_minus1.saturating_add(1)
                ),
            ));
        }

        sps.frame_mbs_only_flag = bit_reader.read_bit()?;
        if !sps.frame_mbs_only_flag {
            // mb_adaptive_frame_field_flag
            bit_reader.read_bit()?;
        }
        // direct_8x8_inference_flag
        bit_reader.read_bit()?;

        if bit_reader.read_bit()? {
            let crop = FrameCrop {
                left: bit_reader.read_exp_golomb()?,
                right: bit_reader.read_exp_golomb()?,
                top: bit_reader.read_exp_golomb()?,
                bottom: bit_reader.read_exp_golomb()?,
            };
            sps.frame_crop = Some(crop);

            // the cropped picture must keep at least one sample each way
            let (unit_x, unit_y) = sps.crop_units();
            let fits = |unit: u64, a: u64, b: u64, coded: u64| {
                a.checked_add(b)
                    .and_then(|sum| sum.checked_mul(unit))
                    .is_some_and(|cropped| cropped < coded)
            };
            if !fits(unit_x, crop.left, crop.right, sps.coded_width())
                || !fits(unit_y, crop.top, crop.bottom, sps.coded_height())
            {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame crop {crop:?} larger than the picture"),
                ));
            }
        }

        // Encoders often truncate the VUI, losing it is not worth failing
        // the whole SPS.
        sps.timing_info = read_vui_timing(&mut bit_reader).ok().flatten();

        Ok(sps)
    }

    /// Parses an SPS NAL unit straight from the bitstream.
    pub fn parse_with_emulation_prevention(reader: impl io::Read) -> io::Result<Self> {
        Self::parse(EmulationPreventionIo::new(reader))
    }

    /// `ChromaArrayType`
    const fn chroma_array_type(&self) -> u8 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    /// `(CropUnitX, CropUnitY)`, equations 7-19 to 7-22.
    pub const fn crop_units(&self) -> (u64, u64) {
        let frame_factor = 2 - self.frame_mbs_only_flag as u64;
        let (sub_width_c, sub_height_c) = match self.chroma_array_type() {
            0 => return (1, frame_factor),
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        };
        (sub_width_c, sub_height_c * frame_factor)
    }

    fn coded_width(&self) -> u64 {
        self.pic_width_in_mbs_minus1
            .saturating_add(1)
            .saturating_mul(16)
    }

    fn coded_height(&self) -> u64 {
        let frame_factor = 2 - self.frame_mbs_only_flag as u64;
        self.pic_height_in_map_units_minus1
            .saturating_add(1)
            .saturating_mul(16)
            .saturating_mul(frame_factor)
    }

    /// Picture width in luma samples after cropping.
    pub fn width(&self) -> u64 {
        let crop = self.frame_crop.unwrap_or_default();
        let cropped = crop.left.saturating_add(crop.right).saturating_mul(self.crop_units().0);
        self.coded_width().saturating_sub(cropped)
    }

    /// Picture height in luma samples after cropping. Field coded streams
    /// count map units as pairs of macroblock rows.
    pub fn height(&self) -> u64 {
        let crop = self.frame_crop.unwrap_or_default();
        let cropped = crop.top.saturating_add(crop.bottom).saturating_mul(self.crop_units().1);
        self.coded_height().saturating_sub(cropped)
    }

    /// `time_scale / (2 * num_units_in_tick)` when the VUI has timing info.
    pub fn frame_rate(&self) -> Option<f64> {
        self.timing_info
            .filter(|timing| timing.num_units_in_tick > 0)
            .map(|timing| timing.time_scale as f64 / (2.0 * timing.num_units_in_tick as f64))
    }
}

/// 7.3.2.1.1.1, values are discarded.
fn skip_scaling_list<R: io::Read>(reader: &mut BitReader<R>, size: usize) -> io::Result<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_exp_golomb()?;
            next_scale = (last_scale + delta_scale.rem_euclid(256)).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

/// Walks the VUI up to `timing_info_present_flag`, Annex E.1.1.
fn read_vui_timing<R: io::Read>(reader: &mut BitReader<R>) -> io::Result<Option<TimingInfo>> {
    if !reader.read_bit()? {
        return Ok(None);
    }

    // aspect_ratio_info_present_flag
    if reader.read_bit()? && reader.read_u8()? == 255 {
        // Extended_SAR: sar_width, sar_height
        reader.skip_bits(32)?;
    }

    // overscan_info_present_flag
    if reader.read_bit()? {
        reader.skip_bits(1)?;
    }

    // video_signal_type_present_flag
    if reader.read_bit()? {
        // video_format, video_full_range_flag
        reader.skip_bits(4)?;
        if reader.read_bit()? {
            // colour_primaries, transfer_characteristics, matrix_coefficients
            reader.skip_bits(24)?;
        }
    }

    // chroma_loc_info_present_flag
    if reader.read_bit()? {
        reader.read_exp_golomb()?;
        reader.read_exp_golomb()?;
    }

    if !reader.read_bit()? {
        return Ok(None);
    }

    Ok(Some(TimingInfo {
        num_units_in_tick: reader.read_bits(32)? as u32,
        time_scale: reader.read_bits(32)? as u32,
        fixed_frame_rate_flag: reader.read_bit()?,
    }))
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::io::Write;

    use bytes_util::BitWriter;
    use expgolomb::BitWriterExpGolombExt;

    use super::*;

    /// Baseline SPS, level 3.1, with the given size fields and no VUI.
    fn baseline(
        width_mbs_minus1: u64,
        height_map_units_minus1: u64,
        crop: Option<FrameCrop>,
    ) -> Vec<u8> {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0x67, 8).unwrap();
        writer.write_bits(66, 8).unwrap();
        writer.write_bits(0xC0, 8).unwrap();
        writer.write_bits(31, 8).unwrap();
        writer.write_exp_golomb(0).unwrap(); // sps id
        writer.write_exp_golomb(0).unwrap(); // log2_max_frame_num_minus4
        writer.write_exp_golomb(2).unwrap(); // poc type
        writer.write_exp_golomb(1).unwrap(); // max_num_ref_frames
        writer.write_bit(false).unwrap();
        writer.write_exp_golomb(width_mbs_minus1).unwrap();
        writer.write_exp_golomb(height_map_units_minus1).unwrap();
        writer.write_bit(true).unwrap(); // frame_mbs_only
        writer.write_bit(true).unwrap(); // direct_8x8
        writer.write_bit(crop.is_some()).unwrap();
        if let Some(crop) = crop {
            for offset in [crop.left, crop.right, crop.top, crop.bottom] {
                writer.write_exp_golomb(offset).unwrap();
            }
        }
        writer.write_bit(false).unwrap(); // vui
        writer.write_bit(true).unwrap(); // rbsp stop bit
        writer.finish().unwrap()
    }

    /// 80x45 macroblocks, 1280x720.
    fn baseline_720p() -> Vec<u8> {
        baseline(79, 44, None)
    }

    /// High profile 1920x1080: 120x68 macroblocks cropped by 4 units at the
    /// bottom, with VUI timing for 30 fps.
    fn high_1080p() -> Vec<u8> {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0x67, 8).unwrap();
        writer.write_bits(100, 8).unwrap();
        writer.write_bits(0x00, 8).unwrap();
        writer.write_bits(40, 8).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(1).unwrap(); // chroma_format_idc
        writer.write_exp_golomb(0).unwrap(); // bit_depth_luma_minus8
        writer.write_exp_golomb(0).unwrap(); // bit_depth_chroma_minus8
        writer.write_bit(false).unwrap(); // qpprime
        writer.write_bit(true).unwrap(); // seq_scaling_matrix_present_flag
        for i in 0..8 {
            // only the first list is transmitted, as a flat run ending early
            writer.write_bit(i == 0).unwrap();
            if i == 0 {
                writer.write_signed_exp_golomb(8).unwrap();
                writer.write_signed_exp_golomb(-16).unwrap();
            }
        }
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(0).unwrap(); // poc type 0
        writer.write_exp_golomb(2).unwrap(); // log2_max_poc_lsb_minus4
        writer.write_exp_golomb(4).unwrap();
        writer.write_bit(false).unwrap();
        writer.write_exp_golomb(119).unwrap();
        writer.write_exp_golomb(67).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_bit(true).unwrap(); // cropping
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(4).unwrap();
        writer.write_bit(true).unwrap(); // vui
        writer.write_bit(false).unwrap(); // aspect ratio
        writer.write_bit(false).unwrap(); // overscan
        writer.write_bit(false).unwrap(); // video signal type
        writer.write_bit(false).unwrap(); // chroma loc
        writer.write_bit(true).unwrap(); // timing
        writer.write_bits(1, 32).unwrap();
        writer.write_bits(60, 32).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_bit(true).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_parse_baseline() {
        let sps = Sps::parse(&baseline_720p()[..]).unwrap();

        insta::assert_debug_snapshot!(sps, @r"
        Sps {
            profile_idc: 66,
            constraint_flags: 192,
            level_idc: 31,
            seq_parameter_set_id: 0,
            chroma_format_idc: 1,
            separate_colour_plane_flag: false,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            pic_order_cnt_type: 2,
            max_num_ref_frames: 1,
            pic_width_in_mbs_minus1: 79,
            pic_height_in_map_units_minus1: 44,
            frame_mbs_only_flag: true,
            frame_crop: None,
            timing_info: None,
        }
        ");
        assert_eq!(sps.width(), 1280);
        assert_eq!(sps.height(), 720);
        assert_eq!(sps.frame_rate(), None);
    }

    #[test]
    fn test_parse_high_with_crop_and_timing() {
        let sps = Sps::parse(&high_1080p()[..]).unwrap();

        assert_eq!(sps.profile_idc, 100);
        assert_eq!(sps.level_idc, 40);
        assert_eq!(sps.crop_units(), (2, 2));
        assert_eq!(
            sps.frame_crop,
            Some(FrameCrop {
                left: 0,
                right: 0,
                top: 0,
                bottom: 4
            })
        );
        assert_eq!(sps.width(), 1920);
        assert_eq!(sps.height(), 1080);
        assert_eq!(sps.frame_rate(), Some(30.0));
    }

    #[test]
    fn test_parse_through_emulation_prevention() {
        let raw = baseline_720p();
        let mut escaped = Vec::new();
        EmulationPreventionIo::new(&mut escaped)
            .write_all(&raw)
            .unwrap();

        let sps = Sps::parse_with_emulation_prevention(&escaped[..]).unwrap();
        assert_eq!(sps, Sps::parse(&raw[..]).unwrap());
    }

    #[test]
    fn test_field_coded_height() {
        let sps = Sps {
            frame_mbs_only_flag: false,
            pic_height_in_map_units_minus1: 16,
            frame_crop: Some(FrameCrop {
                bottom: 2,
                ..Default::default()
            }),
            ..Sps::parse(&baseline_720p()[..]).unwrap()
        };

        // 2 * 17 * 16 = 544, crop unit y is 2 * 2
        assert_eq!(sps.height(), 536);
    }

    #[test]
    fn test_monochrome_crop_units() {
        let sps = Sps {
            chroma_format_idc: 0,
            ..Sps::parse(&baseline_720p()[..]).unwrap()
        };
        assert_eq!(sps.crop_units(), (1, 1));
    }

    #[test]
    fn test_rejects_other_nal_types() {
        let err = Sps::parse(&[0x68, 0xCE, 0x38, 0x80][..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_sps() {
        let raw = baseline_720p();
        assert!(Sps::parse(&raw[..5]).is_err());
    }

    #[test]
    fn test_rejects_oversized_picture() {
        for (width, height) in [(1 << 60, 44), (79, 1 << 60), (1 << 16, 44), (u64::MAX - 1, 0)] {
            let err = Sps::parse(&baseline(width, height, None)[..]).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{width}x{height}");
        }

        let largest = Sps::parse(&baseline((1 << 16) - 1, (1 << 16) - 1, None)[..]).unwrap();
        assert_eq!(largest.width(), 1 << 20);
        assert_eq!(largest.height(), 1 << 20);
    }

    #[test]
    fn test_rejects_crop_larger_than_picture() {
        let crops = [
            FrameCrop {
                left: 320,
                right: 320,
                ..Default::default()
            },
            FrameCrop {
                bottom: u64::MAX - 1,
                ..Default::default()
            },
            FrameCrop {
                left: 1 << 63,
                right: 1 << 63,
                ..Default::default()
            },
        ];
        for crop in crops {
            let err = Sps::parse(&baseline(79, 44, Some(crop))[..]).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{crop:?}");
        }

        let crop = FrameCrop {
            right: 4,
            bottom: 4,
            ..Default::default()
        };
        let sps = Sps::parse(&baseline(79, 44, Some(crop))[..]).unwrap();
        assert_eq!((sps.width(), sps.height()), (1272, 712));
    }

    #[test]
    fn test_size_saturates_on_unchecked_fields() {
        let sps = Sps {
            frame_mbs_only_flag: false,
            pic_width_in_mbs_minus1: u64::MAX,
            pic_height_in_map_units_minus1: u64::MAX,
            frame_crop: Some(FrameCrop {
                left: u64::MAX,
                top: 1,
                ..Default::default()
            }),
            ..Sps::parse(&baseline_720p()[..]).unwrap()
        };

        assert_eq!(sps.width(), 0);
        assert_eq!(sps.height(), u64::MAX - 4);
    }

    #[test]
    fn test_scaling_list_extreme_delta() {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0x67, 8).unwrap();
        writer.write_bits(100, 8).unwrap();
        writer.write_bits(0x00, 8).unwrap();
        writer.write_bits(40, 8).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(1).unwrap(); // chroma_format_idc
        writer.write_exp_golomb(0).unwrap();
        writer.write_exp_golomb(0).unwrap();
        writer.write_bit(false).unwrap(); // qpprime
        writer.write_bit(true).unwrap(); // seq_scaling_matrix_present_flag
        writer.write_bit(true).unwrap();
        writer.write_signed_exp_golomb(i64::MAX).unwrap();

        // runs out of bits afterwards, but must not overflow first
        assert!(Sps::parse(&writer.finish().unwrap()[..]).is_err());
    }
}
