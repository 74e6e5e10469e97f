use std::borrow::Cow;
use std::io::{self, Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use num_traits::FromPrimitive;

use super::define::Amf0Properties;
use super::{Amf0Marker, Amf0ReadError, Amf0Value};

/// Caps the up-front allocation for a strict array, the declared count comes
/// straight from the wire.
const MAX_PREALLOCATED_VALUES: usize = 1024;

/// Deepest object or array nesting the decoder follows.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A failed decode together with whatever was built before the failure.
struct Partial<'a> {
    value: Option<Amf0Value<'a>>,
    error: Amf0ReadError,
}

impl Partial<'_> {
    fn into_error(self) -> Amf0ReadError {
        self.error
    }
}

impl From<Amf0ReadError> for Partial<'_> {
    fn from(error: Amf0ReadError) -> Self {
        Self { value: None, error }
    }
}

impl From<io::Error> for Partial<'_> {
    fn from(error: io::Error) -> Self {
        Amf0ReadError::from(error).into()
    }
}

/// An AMF0 decoder over a borrowed buffer.
///
/// Strings and property keys are returned as slices of the buffer, so
/// decoding does not copy text.
pub struct Amf0Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    /// Creates a decoder positioned at the start of `buff`.
    pub const fn new(buff: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buff),
            depth: 0,
        }
    }

    /// Returns `true` once every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.cursor.get_ref().len() <= self.cursor.position() as usize
    }

    /// Byte offset of the next read.
    pub const fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Amf0ReadError> {
        let buf = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        self.cursor.set_position(end as u64);
        Ok(&buf[start..end])
    }

    /// Decodes every value left in the buffer.
    ///
    /// Decoding stops at the first error, the values decoded before it are
    /// still returned.
    pub fn decode_all(&mut self) -> (Vec<Amf0Value<'a>>, Option<Amf0ReadError>) {
        let mut results = vec![];

        while !self.is_empty() {
            match self.decode() {
                Ok(value) => results.push(value),
                Err(err) => return (results, Some(err)),
            }
        }

        (results, None)
    }

    /// Decodes the next value, failing on any malformed input.
    pub fn decode(&mut self) -> Result<Amf0Value<'a>, Amf0ReadError> {
        self.decode_value().map_err(Partial::into_error)
    }

    /// Decodes the next value, keeping what was read before an error.
    ///
    /// When an object or array is cut short by an unknown marker or the end
    /// of the buffer, the returned value holds every entry decoded up to
    /// that point and the error says why decoding stopped. The value is
    /// `None` only when nothing could be decoded at all.
    pub fn decode_partial(&mut self) -> (Option<Amf0Value<'a>>, Option<Amf0ReadError>) {
        match self.decode_value() {
            Ok(value) => (Some(value), None),
            Err(Partial { value, error }) => (value, Some(error)),
        }
    }

    /// Decodes the next value and checks that it carries `specified_marker`.
    /// The cursor does not move if the marker differs.
    pub fn decode_with_type(
        &mut self,
        specified_marker: Amf0Marker,
    ) -> Result<Amf0Value<'a>, Amf0ReadError> {
        let marker = self.cursor.read_u8()?;
        self.cursor.seek(SeekFrom::Current(-1))?;

        let marker = Amf0Marker::from_u8(marker).ok_or(Amf0ReadError::UnknownMarker(marker))?;
        if marker != specified_marker {
            return Err(Amf0ReadError::WrongType {
                expected: specified_marker,
                got: marker,
            });
        }

        self.decode()
    }

    fn decode_value(&mut self) -> Result<Amf0Value<'a>, Partial<'a>> {
        let marker = self.cursor.read_u8()?;
        let marker = Amf0Marker::from_u8(marker).ok_or(Amf0ReadError::UnknownMarker(marker))?;

        if matches!(
            marker,
            Amf0Marker::Object | Amf0Marker::EcmaArray | Amf0Marker::StrictArray
        ) {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(Amf0ReadError::NestingTooDeep(MAX_NESTING_DEPTH).into());
            }

            self.depth += 1;
            let result = self.decode_container(marker);
            self.depth -= 1;
            return result;
        }

        match marker {
            Amf0Marker::Number => Ok(Amf0Value::Number(self.cursor.read_f64::<BigEndian>()?)),
            Amf0Marker::Boolean => Ok(Amf0Value::Boolean(self.cursor.read_u8()? > 0)),
            Amf0Marker::String => Ok(Amf0Value::String(self.read_string()?)),
            Amf0Marker::Null => Ok(Amf0Value::Null),
            Amf0Marker::Undefined => Ok(Amf0Value::Undefined),
            Amf0Marker::Date => {
                let time = self.cursor.read_f64::<BigEndian>()?;
                let timezone = self.cursor.read_i16::<BigEndian>()?;
                Ok(Amf0Value::Date { time, timezone })
            }
            Amf0Marker::LongString => Ok(Amf0Value::LongString(self.read_long_string()?)),
            _ => Err(Amf0ReadError::UnsupportedType(marker).into()),
        }
    }

    fn decode_container(&mut self, marker: Amf0Marker) -> Result<Amf0Value<'a>, Partial<'a>> {
        match marker {
            Amf0Marker::Object => self.read_properties(None, Amf0Value::Object),
            Amf0Marker::EcmaArray => {
                let count = self.cursor.read_u32::<BigEndian>()?;
                self.read_properties(Some(count), Amf0Value::EcmaArray)
            }
            Amf0Marker::StrictArray => self.read_strict_array(),
            _ => Err(Amf0ReadError::UnsupportedType(marker).into()),
        }
    }

    fn read_string(&mut self) -> Result<Cow<'a, str>, Amf0ReadError> {
        let len = self.cursor.read_u16::<BigEndian>()?;
        let bytes = self.read_bytes(len as usize)?;

        Ok(Cow::Borrowed(std::str::from_utf8(bytes)?))
    }

    fn read_long_string(&mut self) -> Result<Cow<'a, str>, Amf0ReadError> {
        let len = self.cursor.read_u32::<BigEndian>()?;
        let bytes = self.read_bytes(len as usize)?;

        Ok(Cow::Borrowed(std::str::from_utf8(bytes)?))
    }

    /// Consumes `00 00 09` if it is next, otherwise leaves the cursor alone.
    fn is_read_object_eof(&mut self) -> bool {
        let pos = self.cursor.position();
        match self.cursor.read_u24::<BigEndian>() {
            Ok(end) if end == Amf0Marker::ObjectEnd as u32 => true,
            _ => {
                self.cursor.set_position(pos);
                false
            }
        }
    }

    /// Reads `(key, value)` pairs up to the object end marker.
    ///
    /// `count` is the ECMA array length prefix. Encoders disagree on whether
    /// an ECMA array ends with the marker, so it is optional once `count`
    /// entries have been read and the buffer is exhausted.
    fn read_properties(
        &mut self,
        count: Option<u32>,
        wrap: fn(Amf0Properties<'a>) -> Amf0Value<'a>,
    ) -> Result<Amf0Value<'a>, Partial<'a>> {
        let mut properties = Vec::new();

        loop {
            if self.is_read_object_eof() {
                break;
            }

            if let Some(count) = count
                && self.is_empty()
                && properties.len() >= count as usize
            {
                break;
            }

            let key = match self.read_string() {
                Ok(key) => key,
                Err(error) => {
                    return Err(Partial {
                        value: Some(wrap(properties.into())),
                        error,
                    });
                }
            };

            match self.decode_value() {
                Ok(value) => properties.push((key, value)),
                Err(Partial { value, error }) => {
                    if let Some(value) = value {
                        properties.push((key, value));
                    }
                    return Err(Partial {
                        value: Some(wrap(properties.into())),
                        error,
                    });
                }
            }
        }

        Ok(wrap(properties.into()))
    }

    fn read_strict_array(&mut self) -> Result<Amf0Value<'a>, Partial<'a>> {
        let len = self.cursor.read_u32::<BigEndian>()? as usize;
        let mut values = Vec::with_capacity(len.min(MAX_PREALLOCATED_VALUES));

        for _ in 0..len {
            match self.decode_value() {
                Ok(value) => values.push(value),
                Err(Partial { value, error }) => {
                    values.extend(value);
                    return Err(Partial {
                        value: Some(Amf0Value::StrictArray(values.into())),
                        error,
                    });
                }
            }
        }

        Ok(Amf0Value::StrictArray(values.into()))
    }
}

impl<'a> Iterator for Amf0Decoder<'a> {
    type Item = Result<Amf0Value<'a>, Amf0ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }

        Some(self.decode())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn key(buf: &mut Vec<u8>, name: &str) {
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
    }

    fn number(buf: &mut Vec<u8>, value: f64) {
        buf.push(0x00);
        buf.extend_from_slice(&value.to_be_bytes());
    }

    #[test]
    fn test_reader_bool() {
        let amf0_bool = vec![0x01, 0x01];
        let mut amf_reader = Amf0Decoder::new(&amf0_bool);
        let value = amf_reader.decode_with_type(Amf0Marker::Boolean).unwrap();
        assert_eq!(value, Amf0Value::Boolean(true));
    }

    #[test]
    fn test_reader_number() {
        let mut amf0_number = vec![];
        number(&mut amf0_number, 772.161);

        let mut amf_reader = Amf0Decoder::new(&amf0_number);
        let value = amf_reader.decode_with_type(Amf0Marker::Number).unwrap();
        assert_eq!(value, Amf0Value::Number(772.161));
        assert!(amf_reader.is_empty());
    }

    #[test]
    fn test_reader_string_borrows_input() {
        let mut amf0_string = vec![0x02, 0x00, 0x0b];
        amf0_string.extend_from_slice(b"Hello World");

        let mut amf_reader = Amf0Decoder::new(&amf0_string);
        let value = amf_reader.decode().unwrap();
        assert!(matches!(value, Amf0Value::String(Cow::Borrowed("Hello World"))));
    }

    #[test]
    fn test_reader_long_string() {
        let mut amf0_string = vec![0x0c, 0x00, 0x00, 0x00, 0x0b];
        amf0_string.extend_from_slice(b"Hello World");

        let mut amf_reader = Amf0Decoder::new(&amf0_string);
        let value = amf_reader.decode_with_type(Amf0Marker::LongString).unwrap();
        assert_eq!(value, Amf0Value::LongString(Cow::Borrowed("Hello World")));
    }

    #[test]
    fn test_reader_date_and_undefined() {
        let mut data = vec![0x0b];
        data.extend_from_slice(&1_700_000_000_000.0_f64.to_be_bytes());
        data.extend_from_slice(&(-60i16).to_be_bytes());
        data.push(0x06);

        let mut amf_reader = Amf0Decoder::new(&data);
        let (values, error) = amf_reader.decode_all();

        assert!(error.is_none());
        assert_eq!(
            values,
            vec![
                Amf0Value::Date {
                    time: 1_700_000_000_000.0,
                    timezone: -60
                },
                Amf0Value::Undefined,
            ]
        );
    }

    #[test]
    fn test_reader_object() {
        let mut amf0_object = vec![0x03];
        key(&mut amf0_object, "test");
        amf0_object.push(0x05);
        amf0_object.extend_from_slice(&[0x00, 0x00, 0x09]);

        let mut amf_reader = Amf0Decoder::new(&amf0_object);
        let value = amf_reader.decode_with_type(Amf0Marker::Object).unwrap();

        assert_eq!(
            value,
            Amf0Value::Object(vec![("test".into(), Amf0Value::Null)].into())
        );
        assert!(amf_reader.is_empty());
    }

    #[test]
    fn test_reader_ecma_array_with_end_marker() {
        let mut data = vec![0x08, 0x00, 0x00, 0x00, 0x02];
        key(&mut data, "width");
        number(&mut data, 1280.0);
        key(&mut data, "height");
        number(&mut data, 720.0);
        data.extend_from_slice(&[0x00, 0x00, 0x09]);
        data.push(0x05);

        let mut amf_reader = Amf0Decoder::new(&data);
        let value = amf_reader.decode_with_type(Amf0Marker::EcmaArray).unwrap();

        assert_eq!(value.get("width"), Some(&Amf0Value::Number(1280.0)));
        assert_eq!(value.get("height"), Some(&Amf0Value::Number(720.0)));
        assert_eq!(amf_reader.decode().unwrap(), Amf0Value::Null);
    }

    #[test]
    fn test_reader_ecma_array_without_end_marker() {
        let mut data = vec![0x08, 0x00, 0x00, 0x00, 0x01];
        key(&mut data, "test");
        data.push(0x05);

        let mut amf_reader = Amf0Decoder::new(&data);
        let value = amf_reader.decode().unwrap();

        assert_eq!(
            value,
            Amf0Value::EcmaArray(vec![("test".into(), Amf0Value::Null)].into())
        );
    }

    #[test]
    fn test_reader_ecma_array_count_is_a_hint() {
        // count says 0 but two entries follow, terminated properly
        let mut data = vec![0x08, 0x00, 0x00, 0x00, 0x00];
        key(&mut data, "a");
        number(&mut data, 1.0);
        key(&mut data, "b");
        data.extend_from_slice(&[0x01, 0x00]);
        data.extend_from_slice(&[0x00, 0x00, 0x09]);

        let value = Amf0Decoder::new(&data).decode().unwrap();
        assert_eq!(value.properties().map(<[_]>::len), Some(2));
        assert_eq!(value.get("b"), Some(&Amf0Value::Boolean(false)));
    }

    #[test]
    fn test_reader_strict_array() {
        let mut amf0_array = vec![0x0a, 0x00, 0x00, 0x00, 0x03];
        number(&mut amf0_array, 1.0);
        amf0_array.extend_from_slice(&[0x01, 0x01]);
        amf0_array.extend_from_slice(&[0x02, 0x00, 0x04]);
        amf0_array.extend_from_slice(b"test");

        let mut amf_reader = Amf0Decoder::new(&amf0_array);
        let value = amf_reader
            .decode_with_type(Amf0Marker::StrictArray)
            .unwrap();

        let expected = Amf0Value::StrictArray(
            vec![
                Amf0Value::Number(1.0),
                Amf0Value::Boolean(true),
                Amf0Value::String(Cow::Borrowed("test")),
            ]
            .into(),
        );

        assert_eq!(value, expected);
    }

    #[test]
    fn test_decode_all_with_error() {
        let mut amf0_data = vec![];
        number(&mut amf0_data, 772.161);
        amf0_data.extend_from_slice(&[0x01, 0x01]);
        amf0_data.push(0xFF);

        let mut amf_reader = Amf0Decoder::new(&amf0_data);
        let (values, error) = amf_reader.decode_all();

        assert_eq!(values.len(), 2);
        assert!(matches!(error, Some(Amf0ReadError::UnknownMarker(0xFF))));
        assert_eq!(values[0], Amf0Value::Number(772.161));
        assert_eq!(values[1], Amf0Value::Boolean(true));
    }

    #[test]
    fn test_reader_iterator() {
        let mut amf0_multi = vec![];
        number(&mut amf0_multi, 772.161);
        amf0_multi.extend_from_slice(&[0x01, 0x01]);
        amf0_multi.extend_from_slice(&[0x02, 0x00, 0x0b]);
        amf0_multi.extend_from_slice(b"Hello World");

        let amf_reader = Amf0Decoder::new(&amf0_multi);
        let values = amf_reader.collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[2], Amf0Value::String(Cow::Borrowed("Hello World")));
    }

    #[test]
    fn test_reader_unsupported_marker() {
        let data = vec![Amf0Marker::Reference as u8, 0x00, 0x01];
        let result = Amf0Decoder::new(&data).decode();

        assert!(matches!(
            result,
            Err(Amf0ReadError::UnsupportedType(Amf0Marker::Reference))
        ));
    }

    #[test]
    fn test_decode_with_wrong_type_keeps_position() {
        let data = vec![0x05];
        let mut amf_reader = Amf0Decoder::new(&data);

        let err = amf_reader.decode_with_type(Amf0Marker::Object).unwrap_err();
        assert!(matches!(
            err,
            Amf0ReadError::WrongType {
                expected: Amf0Marker::Object,
                got: Amf0Marker::Null
            }
        ));
        assert_eq!(amf_reader.position(), 0);
    }

    #[test]
    fn test_partial_object_keeps_decoded_entries() {
        let mut data = vec![0x08, 0x00, 0x00, 0x00, 0x03];
        key(&mut data, "duration");
        number(&mut data, 12.5);
        key(&mut data, "encoder");
        data.extend_from_slice(&[0x02, 0x00, 0x03]);
        data.extend_from_slice(b"obs");
        key(&mut data, "broken");
        data.push(0x42);

        let mut amf_reader = Amf0Decoder::new(&data);
        let (value, error) = amf_reader.decode_partial();

        assert!(matches!(error, Some(Amf0ReadError::UnknownMarker(0x42))));
        let value = value.unwrap();
        assert_eq!(value.marker(), Amf0Marker::EcmaArray);
        assert_eq!(value.get("duration"), Some(&Amf0Value::Number(12.5)));
        assert_eq!(value.get("encoder").and_then(Amf0Value::as_str), Some("obs"));
        assert!(value.get("broken").is_none());
    }

    #[test]
    fn test_partial_nested_underrun() {
        let mut data = vec![0x03];
        key(&mut data, "outer");
        data.push(0x03);
        key(&mut data, "inner");
        number(&mut data, 1.0);
        key(&mut data, "cut");
        data.extend_from_slice(&[0x00, 0x3f]);

        let (value, error) = Amf0Decoder::new(&data).decode_partial();

        assert!(matches!(error, Some(Amf0ReadError::Io(_))));
        assert_eq!(
            value,
            Some(Amf0Value::Object(
                vec![(
                    "outer".into(),
                    Amf0Value::Object(vec![("inner".into(), Amf0Value::Number(1.0))].into())
                )]
                .into()
            ))
        );
    }

    #[test]
    fn test_partial_strict_array() {
        let mut data = vec![0x0a, 0x00, 0x00, 0x00, 0x05];
        number(&mut data, 1.0);
        number(&mut data, 2.0);

        let (value, error) = Amf0Decoder::new(&data).decode_partial();

        assert!(error.is_some());
        assert_eq!(
            value,
            Some(Amf0Value::StrictArray(
                vec![Amf0Value::Number(1.0), Amf0Value::Number(2.0)].into()
            ))
        );
    }

    #[test]
    fn test_partial_scalar_has_no_value() {
        let data = vec![0x00, 0x40, 0x09];
        let (value, error) = Amf0Decoder::new(&data).decode_partial();

        assert!(value.is_none());
        assert!(matches!(error, Some(Amf0ReadError::Io(_))));
    }

    #[test]
    fn test_strict_decode_discards_partial() {
        let mut data = vec![0x03];
        key(&mut data, "a");
        data.push(0x10);

        let err = Amf0Decoder::new(&data).decode().unwrap_err();
        assert!(matches!(
            err,
            Amf0ReadError::UnsupportedType(Amf0Marker::TypedObject)
        ));
    }

    fn nested_strict_arrays(depth: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(depth * 5 + 1);
        for _ in 0..depth {
            data.extend_from_slice(&[0x0a, 0x00, 0x00, 0x00, 0x01]);
        }
        data.push(0x05);
        data
    }

    fn strict_array_depth(mut value: &Amf0Value<'_>) -> usize {
        let mut depth = 0;
        while let Amf0Value::StrictArray(values) = value {
            depth += 1;
            match values.first() {
                Some(inner) => value = inner,
                None => break,
            }
        }
        depth
    }

    #[test]
    fn test_nesting_at_limit_decodes() {
        let data = nested_strict_arrays(MAX_NESTING_DEPTH);
        let value = Amf0Decoder::new(&data).decode().unwrap();
        assert_eq!(strict_array_depth(&value), MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let data = nested_strict_arrays(100_000);
        let mut amf_reader = Amf0Decoder::new(&data);
        let (value, error) = amf_reader.decode_partial();

        assert!(matches!(
            error,
            Some(Amf0ReadError::NestingTooDeep(MAX_NESTING_DEPTH))
        ));
        // every level up to the limit is kept, each one empty at the bottom
        assert_eq!(strict_array_depth(&value.unwrap()), MAX_NESTING_DEPTH);

        // the depth counter unwinds with the error
        let data = nested_strict_arrays(2);
        assert!(Amf0Decoder::new(&data).decode().is_ok());
    }

    #[test]
    fn test_deep_object_nesting_is_rejected() {
        let mut data = Vec::new();
        for _ in 0..200 {
            data.push(0x03);
            key(&mut data, "a");
        }
        data.push(0x05);

        let err = Amf0Decoder::new(&data).decode().unwrap_err();
        assert!(matches!(err, Amf0ReadError::NestingTooDeep(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = vec![0x02, 0x00, 0x02, 0xFF, 0xFE];
        let err = Amf0Decoder::new(&data).decode().unwrap_err();
        assert!(matches!(err, Amf0ReadError::StringParseError(_)));
    }
}
