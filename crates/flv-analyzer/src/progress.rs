use std::sync::Arc;

use flv::FlvTagType;

use crate::warning::Warning;

/// Progress of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A tag was read and is about to be analyzed.
    Tag {
        /// Zero based position among the tags yielded by the reader.
        index: u64,
        tag_type: FlvTagType,
        timestamp_ms: u32,
        size: u32,
        offset: u64,
    },
    /// The analysis is over, the report is being assembled.
    Finished { total_tags: u64, cancelled: bool },
}

/// A callback function for progress updates.
pub type OnProgress = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Receives each warning as soon as it is recorded.
pub type OnWarning = Arc<dyn Fn(&Warning) + Send + Sync>;
