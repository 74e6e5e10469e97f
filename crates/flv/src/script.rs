//! Script data tags.
//!
//! The body is an AMF0 string naming the call, usually `onMetaData`,
//! followed by its argument, an object or ECMA array of properties.
//! Decoding is lenient: a damaged argument keeps whatever properties were
//! readable and remembers the error.

use std::collections::BTreeMap;

use amf0::{Amf0Decoder, Amf0Marker, Amf0ReadError, Amf0Value};
use tracing::debug;

/// Name of the metadata script tag.
pub const ON_METADATA: &str = "onMetaData";

/// Metadata properties by key. A key repeated on the wire keeps its last
/// value.
pub type MetadataMap = BTreeMap<String, Amf0Value<'static>>;

/// A decoded script data tag.
#[derive(Debug)]
pub struct ScriptData {
    /// `None` when the body does not start with an AMF0 string.
    pub name: Option<String>,
    /// The first value after the name, possibly partial.
    pub value: Option<Amf0Value<'static>>,
    /// Why decoding stopped early.
    pub error: Option<Amf0ReadError>,
}

impl ScriptData {
    /// Decodes a script tag body. Never fails, problems end up in
    /// [`ScriptData::error`].
    pub fn demux(data: &[u8]) -> Self {
        let mut decoder = Amf0Decoder::new(data);

        let name = match decoder.decode_with_type(Amf0Marker::String) {
            Ok(name) => name.as_str().map(str::to_owned),
            Err(error) => {
                return Self {
                    name: None,
                    value: None,
                    error: Some(error),
                };
            }
        };

        if decoder.is_empty() {
            return Self {
                name,
                value: None,
                error: None,
            };
        }

        let (value, error) = decoder.decode_partial();
        if let Some(error) = &error {
            debug!(?name, %error, position = decoder.position(), "script data decoded partially");
        }

        Self {
            name,
            value: value.as_ref().map(Amf0Value::to_owned),
            error,
        }
    }

    pub fn is_on_metadata(&self) -> bool {
        self.name.as_deref() == Some(ON_METADATA)
    }

    /// `true` when the name and the value decoded without error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.value.is_some()
    }

    /// The properties of the value as a map, empty if the value is not an
    /// object or ECMA array.
    pub fn metadata(&self) -> MetadataMap {
        self.value
            .as_ref()
            .and_then(Amf0Value::properties)
            .map(|props| {
                props
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
