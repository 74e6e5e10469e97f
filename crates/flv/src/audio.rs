//! Legacy FLV audio tag header.
//!
//! One byte: `SoundFormat(4) | SoundRate(2) | SoundSize(1) | SoundType(1)`,
//! followed for AAC by an `AACPacketType` byte.
//!
//! Defined by video_file_format_spec_v10.pdf (Annex E.4.2.1 - AUDIODATA).
//! For AAC the rate and type bits are fixed at 44 kHz stereo, the real
//! values live in the `AudioSpecificConfig` of the sequence header, see
//! [`AacAudioConfig`].

use std::fmt;
use std::io;

use byteorder::ReadBytesExt;
use bytes::Bytes;
use bytes_util::BitReader;

/// Audio codec, the high nibble of the first audio payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundFormat {
    /// Linear PCM, platform endian
    Pcm,
    AdPcm,
    Mp3,
    /// Linear PCM, little endian
    PcmLe,
    Nellymoser16kMono,
    Nellymoser8kMono,
    Nellymoser,
    G711ALaw,
    G711MuLaw,
    /// Enhanced (FourCC) header, not decoded here.
    ExHeader,
    Aac,
    Speex,
    Mp3_8k,
    DeviceSpecific,
    Unknown(u8),
}

impl From<u8> for SoundFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Pcm,
            1 => Self::AdPcm,
            2 => Self::Mp3,
            3 => Self::PcmLe,
            4 => Self::Nellymoser16kMono,
            5 => Self::Nellymoser8kMono,
            6 => Self::Nellymoser,
            7 => Self::G711ALaw,
            8 => Self::G711MuLaw,
            9 => Self::ExHeader,
            10 => Self::Aac,
            11 => Self::Speex,
            14 => Self::Mp3_8k,
            15 => Self::DeviceSpecific,
            other => Self::Unknown(other),
        }
    }
}

impl From<SoundFormat> for u8 {
    fn from(format: SoundFormat) -> Self {
        match format {
            SoundFormat::Pcm => 0,
            SoundFormat::AdPcm => 1,
            SoundFormat::Mp3 => 2,
            SoundFormat::PcmLe => 3,
            SoundFormat::Nellymoser16kMono => 4,
            SoundFormat::Nellymoser8kMono => 5,
            SoundFormat::Nellymoser => 6,
            SoundFormat::G711ALaw => 7,
            SoundFormat::G711MuLaw => 8,
            SoundFormat::ExHeader => 9,
            SoundFormat::Aac => 10,
            SoundFormat::Speex => 11,
            SoundFormat::Mp3_8k => 14,
            SoundFormat::DeviceSpecific => 15,
            SoundFormat::Unknown(other) => other,
        }
    }
}

impl SoundFormat {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pcm => "PCM",
            Self::AdPcm => "ADPCM",
            Self::Mp3 => "MP3",
            Self::PcmLe => "PCM LE",
            Self::Nellymoser16kMono => "Nellymoser 16 kHz mono",
            Self::Nellymoser8kMono => "Nellymoser 8 kHz mono",
            Self::Nellymoser => "Nellymoser",
            Self::G711ALaw => "G.711 A-law",
            Self::G711MuLaw => "G.711 mu-law",
            Self::ExHeader => "Enhanced",
            Self::Aac => "AAC",
            Self::Speex => "Speex",
            Self::Mp3_8k => "MP3 8 kHz",
            Self::DeviceSpecific => "Device specific",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for SoundFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown ({id})"),
            other => f.write_str(other.name()),
        }
    }
}

/// The two rate bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundRate {
    Hz5512,
    Hz11025,
    Hz22050,
    Hz44100,
}

impl SoundRate {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Hz5512,
            1 => Self::Hz11025,
            2 => Self::Hz22050,
            _ => Self::Hz44100,
        }
    }

    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz5512 => 5512,
            Self::Hz11025 => 11025,
            Self::Hz22050 => 22050,
            Self::Hz44100 => 44100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundSize {
    Bits8,
    Bits16,
}

impl SoundSize {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits8 => 8,
            Self::Bits16 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundType {
    Mono,
    Stereo,
}

impl SoundType {
    pub const fn channels(self) -> u8 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// `AACPacketType`
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacPacketType {
    /// `AudioSpecificConfig`
    SequenceHeader = 0,
    /// Raw AAC frame data.
    Raw = 1,
}

impl TryFrom<u8> for AacPacketType {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SequenceHeader),
            1 => Ok(Self::Raw),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid AAC packet type: {value}"),
            )),
        }
    }
}

/// The audio sub-header in front of the codec payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagHeader {
    pub sound_format: SoundFormat,
    pub sound_rate: SoundRate,
    pub sound_size: SoundSize,
    pub sound_type: SoundType,
    /// Present for AAC only.
    pub aac_packet_type: Option<AacPacketType>,
}

impl AudioTagHeader {
    /// Reads the sub-header and leaves the cursor at the codec payload.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let byte = reader.read_u8()?;
        let sound_format = SoundFormat::from(byte >> 4);

        let aac_packet_type = if sound_format == SoundFormat::Aac {
            Some(AacPacketType::try_from(reader.read_u8()?)?)
        } else {
            None
        };

        Ok(Self {
            sound_format,
            sound_rate: SoundRate::from_bits(byte >> 2),
            sound_size: if byte & 0b10 != 0 { SoundSize::Bits16 } else { SoundSize::Bits8 },
            sound_type: if byte & 0b01 != 0 { SoundType::Stereo } else { SoundType::Mono },
            aac_packet_type,
        })
    }

    pub fn is_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AacPacketType::SequenceHeader)
    }

    /// Length of the sub-header in bytes.
    pub const fn size(&self) -> usize {
        if self.aac_packet_type.is_some() { 2 } else { 1 }
    }
}

const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// The leading fields of an MPEG-4 `AudioSpecificConfig` (ISO/IEC 14496-3
/// 1.6.2.1), enough to report the real rate and channel count of AAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacAudioConfig {
    /// 2 is AAC LC.
    pub audio_object_type: u8,
    pub sample_rate: u32,
    /// `channelConfiguration`, 0 means defined elsewhere.
    pub channel_configuration: u8,
}

impl AacAudioConfig {
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let mut reader = BitReader::new_from_slice(data);

        let mut audio_object_type = reader.read_bits(5)? as u8;
        if audio_object_type == 31 {
            audio_object_type = 32 + reader.read_bits(6)? as u8;
        }

        let frequency_index = reader.read_bits(4)? as usize;
        let sample_rate = if frequency_index == 0x0F {
            reader.read_bits(24)? as u32
        } else {
            *AAC_SAMPLE_RATES.get(frequency_index).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("reserved sampling frequency index {frequency_index}"),
                )
            })?
        };

        let channel_configuration = reader.read_bits(4)? as u8;

        Ok(Self {
            audio_object_type,
            sample_rate,
            channel_configuration,
        })
    }
}
