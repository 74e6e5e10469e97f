//! # Test Utilities
//!
//! Builders for FLV byte streams and the H.264/AAC payloads inside them,
//! shared by the unit tests and the integration tests in `tests/`.
#![allow(dead_code)]

use std::borrow::Cow;

use amf0::{Amf0Encoder, Amf0Value};
use bytes::Bytes;
use bytes_util::BitWriter;
use expgolomb::BitWriterExpGolombExt;
use flv::{FlvHeader, FlvTag, FlvTagType};
use h264::AVCDecoderConfigurationRecord;

/// Initialize tracing for tests with appropriate settings
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Writes an FLV file tag by tag.
#[derive(Debug, Clone)]
pub struct FlvFileBuilder {
    buf: Vec<u8>,
}

impl FlvFileBuilder {
    /// Header plus `PreviousTagSize0`.
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        let mut buf = Vec::new();
        FlvHeader::new(has_audio, has_video).write(&mut buf).unwrap();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self { buf }
    }

    /// Appends a tag and its matching `PreviousTagSize`.
    pub fn tag(mut self, tag_type: FlvTagType, timestamp_ms: u32, data: Vec<u8>) -> Self {
        FlvTag {
            tag_type,
            timestamp_ms,
            stream_id: 0,
            offset: 0,
            data: Bytes::from(data),
        }
        .write(&mut self.buf)
        .unwrap();
        self
    }

    pub fn video(self, timestamp_ms: u32, data: Vec<u8>) -> Self {
        self.tag(FlvTagType::Video, timestamp_ms, data)
    }

    pub fn audio(self, timestamp_ms: u32, data: Vec<u8>) -> Self {
        self.tag(FlvTagType::Audio, timestamp_ms, data)
    }

    pub fn script(self, timestamp_ms: u32, data: Vec<u8>) -> Self {
        self.tag(FlvTagType::ScriptData, timestamp_ms, data)
    }

    /// Overwrites the `PreviousTagSize` written last.
    pub fn corrupt_last_trailer(mut self, value: u32) -> Self {
        let len = self.buf.len();
        self.buf[len - 4..].copy_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends bytes as they are.
    pub fn raw(mut self, data: &[u8]) -> Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Drops the last `count` bytes.
    pub fn cut(mut self, count: usize) -> Self {
        self.buf.truncate(self.buf.len().saturating_sub(count));
        self
    }

    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

/// Baseline SPS, level 3.1, 1280x720, no VUI.
pub fn baseline_sps() -> Vec<u8> {
    sps_with_size(79, 44)
}

/// Baseline SPS with the given `pic_width_in_mbs_minus1` and
/// `pic_height_in_map_units_minus1`.
pub fn sps_with_size(width_mbs_minus1: u64, height_map_units_minus1: u64) -> Vec<u8> {
    let mut writer = BitWriter::<Vec<u8>>::default();
    writer.write_bits(0x67, 8).unwrap();
    writer.write_bits(66, 8).unwrap();
    writer.write_bits(0xC0, 8).unwrap();
    writer.write_bits(31, 8).unwrap();
    writer.write_exp_golomb(0).unwrap(); // seq_parameter_set_id
    writer.write_exp_golomb(0).unwrap(); // log2_max_frame_num_minus4
    writer.write_exp_golomb(2).unwrap(); // pic_order_cnt_type
    writer.write_exp_golomb(1).unwrap(); // max_num_ref_frames
    writer.write_bit(false).unwrap();
    writer.write_exp_golomb(width_mbs_minus1).unwrap();
    writer.write_exp_golomb(height_map_units_minus1).unwrap();
    writer.write_bit(true).unwrap(); // frame_mbs_only_flag
    writer.write_bit(true).unwrap(); // direct_8x8_inference_flag
    writer.write_bit(false).unwrap(); // frame_cropping_flag
    writer.write_bit(false).unwrap(); // vui_parameters_present_flag
    writer.write_bit(true).unwrap();
    writer.finish().unwrap()
}

/// A slice NAL unit carrying just enough of the header to classify it.
pub fn slice_nal(header: u8, slice_type: u64) -> Vec<u8> {
    let mut writer = BitWriter::<Vec<u8>>::default();
    writer.write_bits(header as u64, 8).unwrap();
    writer.write_exp_golomb(0).unwrap(); // first_mb_in_slice
    writer.write_exp_golomb(slice_type).unwrap();
    writer.write_exp_golomb(0).unwrap(); // pic_parameter_set_id
    writer.write_bits(0b1000_0100, 8).unwrap();
    writer.finish().unwrap()
}

pub fn idr_slice() -> Vec<u8> {
    slice_nal(0x65, 7)
}

pub fn p_slice() -> Vec<u8> {
    slice_nal(0x41, 5)
}

/// A non-reference B slice.
pub fn b_slice() -> Vec<u8> {
    slice_nal(0x01, 6)
}

/// Length prefixed NAL units as found in AVC video tags.
pub fn avcc(length_size: u8, nal_units: &[Vec<u8>]) -> Bytes {
    let mut buf = Vec::new();
    for nal in nal_units {
        let len = (nal.len() as u32).to_be_bytes();
        buf.extend_from_slice(&len[4 - length_size as usize..]);
        buf.extend_from_slice(nal);
    }
    Bytes::from(buf)
}

pub fn avc_decoder_record(sps: &[u8], nal_length_size: u8) -> Vec<u8> {
    let record = AVCDecoderConfigurationRecord {
        configuration_version: 1,
        profile_indication: sps[1],
        profile_compatibility: sps[2],
        level_indication: sps[3],
        length_size_minus_one: nal_length_size - 1,
        sps: vec![Bytes::copy_from_slice(sps)],
        pps: vec![Bytes::from_static(&[0x68, 0xCE, 0x38, 0x80])],
    };

    let mut buf = Vec::new();
    record.build(&mut buf).unwrap();
    buf
}

/// Body of an AVC sequence header tag with 4 byte NAL lengths.
pub fn avc_sequence_header(sps: &[u8]) -> Vec<u8> {
    let mut data = vec![0x17, 0x00, 0x00, 0x00, 0x00];
    data.extend(avc_decoder_record(sps, 4));
    data
}

/// Body of an AVC NALU tag.
pub fn avc_video(keyframe: bool, composition_time: i32, nal_units: &Bytes) -> Vec<u8> {
    let frame_type: u8 = if keyframe { 1 } else { 2 };
    let mut data = vec![(frame_type << 4) | 7, 0x01];
    data.extend_from_slice(&composition_time.to_be_bytes()[1..]);
    data.extend_from_slice(nal_units);
    data
}

/// AAC LC, 44.1 kHz, stereo.
pub fn aac_sequence_header() -> Vec<u8> {
    vec![0xAF, 0x00, 0x12, 0x10]
}

pub fn aac_frame(len: usize) -> Vec<u8> {
    let mut data = vec![0xAF, 0x01];
    data.resize(len.max(2), 0x21);
    data
}

/// An `onMetaData` script tag body with the properties in an ECMA array.
pub fn metadata_payload(properties: &[(&str, Amf0Value<'_>)]) -> Vec<u8> {
    let properties: Vec<_> = properties
        .iter()
        .map(|(key, value)| (Cow::Borrowed(*key), value.clone()))
        .collect();

    let mut buf = Vec::new();
    Amf0Encoder::encode_string(&mut buf, "onMetaData").unwrap();
    Amf0Encoder::encode_ecma_array(&mut buf, &properties).unwrap();
    buf
}
