use std::fmt;

use flv::ReaderEvent;
use serde::Serialize;

use crate::stats::StreamKind;

/// A problem found in the file that did not stop the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum Warning {
    /// A `PreviousTagSize` disagreed with the tag before it.
    RecoverableCorruption {
        offset: u64,
        declared: u32,
        trailer: u32,
    },
    /// The file ends inside a tag.
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },
    UnknownTagType { offset: u64, tag_type: u8 },
    /// `onMetaData` could only be decoded in part.
    IncompleteMetadata { offset: u64, reason: String },
    /// The codec parser could not classify a frame or read a sequence
    /// header.
    FrameDecode {
        offset: u64,
        timestamp_ms: u32,
        reason: String,
    },
    /// The audio or video sub-header is missing or malformed.
    Demux {
        offset: u64,
        stream: StreamKind,
        reason: String,
    },
    DurationMismatch {
        observed_ms: u32,
        metadata_ms: u64,
        tolerance_ms: u32,
    },
    /// A header flag contradicts the tags actually present.
    HeaderFlagMismatch {
        stream: StreamKind,
        flag: bool,
        tags: u64,
    },
}

impl From<ReaderEvent> for Warning {
    fn from(event: ReaderEvent) -> Self {
        match event {
            ReaderEvent::RecoverableCorruption {
                offset,
                declared,
                trailer,
            } => Self::RecoverableCorruption {
                offset,
                declared,
                trailer,
            },
            ReaderEvent::Truncated {
                offset,
                needed,
                available,
            } => Self::Truncated {
                offset,
                needed,
                available,
            },
            ReaderEvent::UnknownTagType { offset, tag_type } => {
                Self::UnknownTagType { offset, tag_type }
            }
        }
    }
}

impl Warning {
    /// The serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RecoverableCorruption { .. } => "RecoverableCorruption",
            Self::Truncated { .. } => "Truncated",
            Self::UnknownTagType { .. } => "UnknownTagType",
            Self::IncompleteMetadata { .. } => "IncompleteMetadata",
            Self::FrameDecode { .. } => "FrameDecode",
            Self::Demux { .. } => "Demux",
            Self::DurationMismatch { .. } => "DurationMismatch",
            Self::HeaderFlagMismatch { .. } => "HeaderFlagMismatch",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecoverableCorruption {
                offset,
                declared,
                trailer,
            } => write!(
                f,
                "previous tag size at {offset} is {trailer}, expected {declared}"
            ),
            Self::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated at {offset}: {needed} bytes needed, {available} available"
            ),
            Self::UnknownTagType { offset, tag_type } => {
                write!(f, "unknown tag type {tag_type} at {offset}")
            }
            Self::IncompleteMetadata { offset, reason } => {
                write!(f, "incomplete metadata at {offset}: {reason}")
            }
            Self::FrameDecode {
                offset,
                timestamp_ms,
                reason,
            } => write!(f, "frame at {offset} ({timestamp_ms}ms): {reason}"),
            Self::Demux {
                offset,
                stream,
                reason,
            } => write!(f, "{stream} tag at {offset}: {reason}"),
            Self::DurationMismatch {
                observed_ms,
                metadata_ms,
                tolerance_ms,
            } => write!(
                f,
                "metadata duration {metadata_ms}ms differs from observed {observed_ms}ms by more than {tolerance_ms}ms"
            ),
            Self::HeaderFlagMismatch { stream, flag, tags } => write!(
                f,
                "header {stream} flag is {flag} but the file has {tags} {stream} tags"
            ),
        }
    }
}
