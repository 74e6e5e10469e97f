use std::borrow::Cow;

use num_derive::FromPrimitive;

/// Type markers, amf0_spec_121207.pdf section 2.1.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// number-marker
    Number = 0x00,
    /// boolean-marker
    Boolean = 0x01,
    /// string-marker
    String = 0x02,
    /// object-marker
    Object = 0x03,
    /// movieclip-marker, reserved
    MovieClip = 0x04,
    /// null-marker
    Null = 0x05,
    /// undefined-marker
    Undefined = 0x06,
    /// reference-marker
    Reference = 0x07,
    /// ecma-array-marker
    EcmaArray = 0x08,
    /// object-end-marker
    ObjectEnd = 0x09,
    /// strict-array-marker
    StrictArray = 0x0a,
    /// date-marker
    Date = 0x0b,
    /// long-string-marker
    LongString = 0x0c,
    /// unsupported-marker
    Unsupported = 0x0d,
    /// recordset-marker, reserved
    Recordset = 0x0e,
    /// xml-document-marker
    XmlDocument = 0x0f,
    /// typed-object-marker
    TypedObject = 0x10,
    /// avmplus-object-marker, switches to AMF3
    AvmPlusObject = 0x11,
}

/// Key/value pairs of an object or ECMA array, in wire order.
pub type Amf0Properties<'a> = Cow<'a, [(Cow<'a, str>, Amf0Value<'a>)]>;

/// A decoded AMF0 value.
///
/// Strings and property lists borrow from the input buffer where possible;
/// use [`Amf0Value::to_owned`] to detach a value from it.
#[derive(PartialEq, Clone, Debug)]
pub enum Amf0Value<'a> {
    /// IEEE-754 double, section 2.2
    Number(f64),
    /// Section 2.3
    Boolean(bool),
    /// UTF-8 string up to 65535 bytes, section 2.4
    String(Cow<'a, str>),
    /// Anonymous object, section 2.5
    Object(Amf0Properties<'a>),
    /// Section 2.7
    Null,
    /// Section 2.8
    Undefined,
    /// Associative array with a count hint, section 2.10
    EcmaArray(Amf0Properties<'a>),
    /// Dense array, section 2.12
    StrictArray(Cow<'a, [Amf0Value<'a>]>),
    /// Milliseconds since the epoch plus a timezone offset in minutes,
    /// section 2.13
    Date {
        /// Milliseconds since 1970-01-01 UTC.
        time: f64,
        /// Reserved timezone field, should be 0.
        timezone: i16,
    },
    /// UTF-8 string with a 32 bit length, section 2.14
    LongString(Cow<'a, str>),
}

impl<'a> Amf0Value<'a> {
    /// The marker this value is encoded with.
    pub fn marker(&self) -> Amf0Marker {
        match self {
            Self::Number(_) => Amf0Marker::Number,
            Self::Boolean(_) => Amf0Marker::Boolean,
            Self::String(_) => Amf0Marker::String,
            Self::Object(_) => Amf0Marker::Object,
            Self::Null => Amf0Marker::Null,
            Self::Undefined => Amf0Marker::Undefined,
            Self::EcmaArray(_) => Amf0Marker::EcmaArray,
            Self::StrictArray(_) => Amf0Marker::StrictArray,
            Self::Date { .. } => Amf0Marker::Date,
            Self::LongString(_) => Amf0Marker::LongString,
        }
    }

    /// Detaches the value from the buffer it was decoded from.
    pub fn to_owned(&self) -> Amf0Value<'static> {
        fn own_props(props: &[(Cow<'_, str>, Amf0Value<'_>)]) -> Amf0Properties<'static> {
            Cow::Owned(
                props
                    .iter()
                    .map(|(k, v)| (Cow::Owned(k.to_string()), v.to_owned()))
                    .collect(),
            )
        }

        match self {
            Self::Number(n) => Amf0Value::Number(*n),
            Self::Boolean(b) => Amf0Value::Boolean(*b),
            Self::String(s) => Amf0Value::String(Cow::Owned(s.to_string())),
            Self::LongString(s) => Amf0Value::LongString(Cow::Owned(s.to_string())),
            Self::Object(props) => Amf0Value::Object(own_props(props)),
            Self::EcmaArray(props) => Amf0Value::EcmaArray(own_props(props)),
            Self::StrictArray(values) => {
                Amf0Value::StrictArray(values.iter().map(Amf0Value::to_owned).collect())
            }
            Self::Date { time, timezone } => Amf0Value::Date {
                time: *time,
                timezone: *timezone,
            },
            Self::Null => Amf0Value::Null,
            Self::Undefined => Amf0Value::Undefined,
        }
    }

    /// Properties of an object or ECMA array.
    pub fn properties(&self) -> Option<&[(Cow<'a, str>, Amf0Value<'a>)]> {
        match self {
            Self::Object(props) | Self::EcmaArray(props) => Some(&props[..]),
            _ => None,
        }
    }

    /// Looks up a property by key, the last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&Amf0Value<'a>> {
        self.properties()?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The number inside a [`Amf0Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text of a string or long string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::LongString(s) => Some(s),
            _ => None,
        }
    }

    /// The flag inside a [`Amf0Value::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use num_traits::FromPrimitive;

    use super::*;

    #[test]
    fn test_marker_of_each_variant() {
        let cases = [
            (Amf0Value::Number(1.0), Amf0Marker::Number),
            (Amf0Value::Boolean(false), Amf0Marker::Boolean),
            (Amf0Value::String("a".into()), Amf0Marker::String),
            (Amf0Value::Object(Cow::Owned(vec![])), Amf0Marker::Object),
            (Amf0Value::EcmaArray(Cow::Owned(vec![])), Amf0Marker::EcmaArray),
            (Amf0Value::StrictArray(Cow::Owned(vec![])), Amf0Marker::StrictArray),
            (
                Amf0Value::Date {
                    time: 0.0,
                    timezone: 0,
                },
                Amf0Marker::Date,
            ),
            (Amf0Value::Null, Amf0Marker::Null),
            (Amf0Value::Undefined, Amf0Marker::Undefined),
            (Amf0Value::LongString("a".into()), Amf0Marker::LongString),
        ];

        for (value, marker) in cases {
            assert_eq!(value.marker(), marker);
        }
    }

    #[test]
    fn test_marker_from_u8() {
        assert_eq!(Amf0Marker::from_u8(0x08), Some(Amf0Marker::EcmaArray));
        assert_eq!(Amf0Marker::from_u8(0x0b), Some(Amf0Marker::Date));
        assert_eq!(Amf0Marker::from_u8(0x11), Some(Amf0Marker::AvmPlusObject));
        assert!(Amf0Marker::from_u8(0x12).is_none());
    }

    #[test]
    fn test_get_last_duplicate_wins() {
        let value = Amf0Value::EcmaArray(Cow::Owned(vec![
            ("width".into(), Amf0Value::Number(640.0)),
            ("title".into(), Amf0Value::String("clip".into())),
            ("width".into(), Amf0Value::Number(1280.0)),
        ]));

        assert_eq!(value.get("width").and_then(Amf0Value::as_number), Some(1280.0));
        assert_eq!(value.get("title").and_then(Amf0Value::as_str), Some("clip"));
        assert!(value.get("height").is_none());
        assert!(Amf0Value::Null.get("width").is_none());
    }

    #[test]
    fn test_to_owned_keeps_structure() {
        let key = String::from("nested");
        let value = Amf0Value::Object(Cow::Owned(vec![(
            Cow::Borrowed(key.as_str()),
            Amf0Value::StrictArray(Cow::Owned(vec![Amf0Value::Boolean(true), Amf0Value::Undefined])),
        )]));

        let owned = value.to_owned();

        assert_eq!(
            owned,
            Amf0Value::Object(Cow::Owned(vec![(
                Cow::Owned("nested".to_string()),
                Amf0Value::StrictArray(Cow::Owned(vec![
                    Amf0Value::Boolean(true),
                    Amf0Value::Undefined
                ])),
            )]))
        );
    }
}
