use std::borrow::Cow;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use super::define::Amf0Marker;
use super::{Amf0Value, Amf0WriteError};

/// AMF0 encoder.
///
/// Every [`Amf0Value`] variant can be written, so decoding the output
/// reproduces the input exactly.
pub struct Amf0Encoder;

impl Amf0Encoder {
    /// Encodes any value.
    pub fn encode(writer: &mut impl io::Write, value: &Amf0Value) -> Result<(), Amf0WriteError> {
        match value {
            Amf0Value::Number(val) => Self::encode_number(writer, *val),
            Amf0Value::Boolean(val) => Self::encode_bool(writer, *val),
            Amf0Value::String(val) => Self::encode_string(writer, val),
            Amf0Value::Object(val) => Self::encode_object(writer, val),
            Amf0Value::Null => Self::encode_marker(writer, Amf0Marker::Null),
            Amf0Value::Undefined => Self::encode_marker(writer, Amf0Marker::Undefined),
            Amf0Value::EcmaArray(val) => Self::encode_ecma_array(writer, val),
            Amf0Value::StrictArray(val) => Self::encode_strict_array(writer, val),
            Amf0Value::Date { time, timezone } => Self::encode_date(writer, *time, *timezone),
            Amf0Value::LongString(val) => Self::encode_long_string(writer, val),
        }
    }

    fn encode_marker(writer: &mut impl io::Write, marker: Amf0Marker) -> Result<(), Amf0WriteError> {
        writer.write_u8(marker as u8)?;
        Ok(())
    }

    fn write_key(writer: &mut impl io::Write, key: &str) -> Result<(), Amf0WriteError> {
        let len = u16::try_from(key.len()).map_err(|_| Amf0WriteError::NormalStringTooLong)?;
        writer.write_u16::<BigEndian>(len)?;
        writer.write_all(key.as_bytes())?;
        Ok(())
    }

    fn write_count(writer: &mut impl io::Write, count: usize) -> Result<(), Amf0WriteError> {
        let count = u32::try_from(count).map_err(|_| Amf0WriteError::ArrayTooLong)?;
        writer.write_u32::<BigEndian>(count)?;
        Ok(())
    }

    fn write_properties(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        for (key, value) in properties {
            Self::write_key(writer, key)?;
            Self::encode(writer, value)?;
        }

        Self::object_eof(writer)
    }

    /// Writes the `00 00 09` object end marker.
    pub fn object_eof(writer: &mut impl io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u24::<BigEndian>(Amf0Marker::ObjectEnd as u32)?;
        Ok(())
    }

    /// Encodes a number.
    pub fn encode_number(writer: &mut impl io::Write, value: f64) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::Number)?;
        writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Encodes a boolean.
    pub fn encode_bool(writer: &mut impl io::Write, value: bool) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::Boolean)?;
        writer.write_u8(value as u8)?;
        Ok(())
    }

    /// Encodes a string of at most 65535 bytes.
    pub fn encode_string(writer: &mut impl io::Write, value: &str) -> Result<(), Amf0WriteError> {
        if value.len() > u16::MAX as usize {
            return Err(Amf0WriteError::NormalStringTooLong);
        }

        Self::encode_marker(writer, Amf0Marker::String)?;
        Self::write_key(writer, value)
    }

    /// Encodes a long string.
    pub fn encode_long_string(writer: &mut impl io::Write, value: &str) -> Result<(), Amf0WriteError> {
        let len = u32::try_from(value.len()).map_err(|_| Amf0WriteError::LongStringTooLong)?;
        Self::encode_marker(writer, Amf0Marker::LongString)?;
        writer.write_u32::<BigEndian>(len)?;
        writer.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Encodes a date.
    pub fn encode_date(
        writer: &mut impl io::Write,
        time: f64,
        timezone: i16,
    ) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::Date)?;
        writer.write_f64::<BigEndian>(time)?;
        writer.write_i16::<BigEndian>(timezone)?;
        Ok(())
    }

    /// Encodes an anonymous object.
    pub fn encode_object(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::Object)?;
        Self::write_properties(writer, properties)
    }

    /// Encodes an ECMA array, count prefix and end marker included.
    pub fn encode_ecma_array(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::EcmaArray)?;
        Self::write_count(writer, properties.len())?;
        Self::write_properties(writer, properties)
    }

    /// Encodes a strict array.
    pub fn encode_strict_array(
        writer: &mut impl io::Write,
        values: &[Amf0Value<'_>],
    ) -> Result<(), Amf0WriteError> {
        Self::encode_marker(writer, Amf0Marker::StrictArray)?;
        Self::write_count(writer, values.len())?;
        for value in values {
            Self::encode(writer, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::Amf0Decoder;

    #[test]
    fn test_write_number() {
        let mut expected = vec![0x00];
        expected.extend_from_slice(&772.161_f64.to_be_bytes());

        let mut vec = Vec::<u8>::new();
        Amf0Encoder::encode_number(&mut vec, 772.161).unwrap();

        assert_eq!(vec, expected);
    }

    #[test]
    fn test_write_string() {
        let mut expected = vec![0x02, 0x00, 0x0b];
        expected.extend_from_slice(b"Hello World");

        let mut vec = Vec::<u8>::new();
        Amf0Encoder::encode_string(&mut vec, "Hello World").unwrap();

        assert_eq!(vec, expected);
    }

    #[test]
    fn test_write_string_too_long() {
        let long = "a".repeat(u16::MAX as usize + 1);
        let mut vec = Vec::<u8>::new();

        let err = Amf0Encoder::encode_string(&mut vec, &long).unwrap_err();
        assert!(matches!(err, Amf0WriteError::NormalStringTooLong));
        assert!(vec.is_empty());

        Amf0Encoder::encode_long_string(&mut vec, &long).unwrap();
        assert_eq!(vec.len(), 1 + 4 + long.len());
    }

    #[test]
    fn test_write_ecma_array_layout() {
        let mut vec = Vec::<u8>::new();
        Amf0Encoder::encode(
            &mut vec,
            &Amf0Value::EcmaArray(vec![("a".into(), Amf0Value::Null)].into()),
        )
        .unwrap();

        assert_eq!(
            vec,
            vec![0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, b'a', 0x05, 0x00, 0x00, 0x09]
        );
    }

    #[test]
    fn test_round_trip_every_variant() {
        let value = Amf0Value::EcmaArray(
            vec![
                ("duration".into(), Amf0Value::Number(63.44)),
                ("stereo".into(), Amf0Value::Boolean(true)),
                ("encoder".into(), Amf0Value::String("Lavf58.29.100".into())),
                (
                    "custom".into(),
                    Amf0Value::Object(
                        vec![
                            ("nothing".into(), Amf0Value::Null),
                            ("missing".into(), Amf0Value::Undefined),
                        ]
                        .into(),
                    ),
                ),
                (
                    "keyframes".into(),
                    Amf0Value::StrictArray(
                        vec![Amf0Value::Number(0.0), Amf0Value::Number(2.0)].into(),
                    ),
                ),
                (
                    "creationdate".into(),
                    Amf0Value::Date {
                        time: 1_600_000_000_000.0,
                        timezone: 0,
                    },
                ),
                ("comment".into(), Amf0Value::LongString("x".repeat(300).into())),
            ]
            .into(),
        );

        let mut vec = Vec::<u8>::new();
        Amf0Encoder::encode(&mut vec, &value).unwrap();

        let mut decoder = Amf0Decoder::new(&vec);
        assert_eq!(decoder.decode().unwrap(), value);
        assert!(decoder.is_empty());
    }
}
