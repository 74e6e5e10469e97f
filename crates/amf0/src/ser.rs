use serde::ser::{Serialize, SerializeMap, SerializeSeq, SerializeStruct, Serializer};

use crate::Amf0Value;

/// Objects and ECMA arrays become maps, dates become `{time, timezone}`,
/// `Null` and `Undefined` both become unit.
impl Serialize for Amf0Value<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::String(s) | Self::LongString(s) => serializer.serialize_str(s),
            Self::Object(props) | Self::EcmaArray(props) => {
                let mut map = serializer.serialize_map(Some(props.len()))?;
                for (key, value) in props.iter() {
                    map.serialize_entry(key.as_ref(), value)?;
                }
                map.end()
            }
            Self::StrictArray(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values.iter() {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Self::Date { time, timezone } => {
                let mut date = serializer.serialize_struct("Date", 2)?;
                date.serialize_field("time", time)?;
                date.serialize_field("timezone", timezone)?;
                date.end()
            }
            Self::Null | Self::Undefined => serializer.serialize_unit(),
        }
    }
}
