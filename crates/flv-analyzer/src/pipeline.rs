//! Entry points that run a reader and an [`FlvAnalyzer`] over a source.
//!
//! [`analyze`] does everything on the calling thread. [`analyze_threaded`]
//! moves the reader to a scoped producer thread and hands tags to the
//! analyzer through a bounded queue, so reading and analysis overlap.
//! Both produce the same report for the same input.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::thread;

use bytes::Bytes;
use crossbeam_channel::bounded;
use flv::{FlvError, FlvHeader, FlvReader, FlvTag, ReaderEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analyzer::FlvAnalyzer;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::progress::{OnProgress, OnWarning, ProgressEvent};
use crate::report::AnalysisReport;

/// Everything a single analysis call needs besides the source.
#[derive(Clone, Default)]
pub struct AnalyzeOptions {
    pub config: AnalyzerConfig,
    pub on_progress: Option<OnProgress>,
    pub on_warning: Option<OnWarning>,
    /// Stops the analysis early. The report is still produced, with
    /// `cancelled` and `partial` set.
    pub cancellation: CancellationToken,
}

impl AnalyzeOptions {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, on_progress: OnProgress) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn with_warning_sink(mut self, on_warning: OnWarning) -> Self {
        self.on_warning = Some(on_warning);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for AnalyzeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeOptions")
            .field("config", &self.config)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_warning", &self.on_warning.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Consumer side shared by both pipelines.
struct Session {
    analyzer: FlvAnalyzer,
    on_progress: Option<OnProgress>,
    tags: u64,
}

impl Session {
    fn new(header: FlvHeader, options: &AnalyzeOptions) -> Self {
        debug!(%header, config = %options.config, "starting analysis");
        Self {
            analyzer: FlvAnalyzer::new(header, options.config.clone())
                .with_warning_sink(options.on_warning.clone()),
            on_progress: options.on_progress.clone(),
            tags: 0,
        }
    }

    fn events(&mut self, events: Vec<ReaderEvent>) {
        self.analyzer.record_reader_events(events);
    }

    fn tag(&mut self, tag: &FlvTag) {
        if let Some(on_progress) = &self.on_progress {
            on_progress(ProgressEvent::Tag {
                index: self.tags,
                tag_type: tag.tag_type,
                timestamp_ms: tag.timestamp_ms,
                size: tag.size() as u32,
                offset: tag.offset,
            });
        }
        self.tags += 1;
        self.analyzer.process_tag(tag);
    }

    fn finish(self, truncated: bool, cancelled: bool) -> AnalysisReport {
        if let Some(on_progress) = &self.on_progress {
            on_progress(ProgressEvent::Finished {
                total_tags: self.tags,
                cancelled,
            });
        }
        let report = self.analyzer.finish(truncated, cancelled);
        info!(
            tags = report.total_tags,
            gops = report.gops.len(),
            warnings = report.warnings.len(),
            duration_ms = report.totals.duration_ms,
            partial = report.partial,
            "analysis complete"
        );
        report
    }
}

/// Analyzes an FLV stream on the calling thread.
///
/// Fails only if the configuration is invalid, the header cannot be read or
/// the source returns an I/O error. Damage inside the tag stream ends up as
/// warnings in the report.
pub fn analyze<R: Read>(
    source: R,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    options.config.validate()?;
    let (mut reader, header) = FlvReader::with_chunk_size(source, options.config.read_chunk_size)?;
    let mut session = Session::new(header, options);

    let mut cancelled = false;
    loop {
        if options.is_cancelled() {
            debug!(position = reader.position(), "analysis cancelled");
            cancelled = true;
            break;
        }

        let tag = reader.next_tag()?;
        session.events(reader.take_events());
        match tag {
            Some(tag) => session.tag(&tag),
            None => break,
        }
    }

    let truncated = reader.is_truncated();
    drop(reader);
    Ok(session.finish(truncated, cancelled))
}

enum Message {
    /// A tag with the events the reader raised while producing it.
    Tag(FlvTag, Vec<ReaderEvent>),
    Finished {
        events: Vec<ReaderEvent>,
        truncated: bool,
    },
    Failed(FlvError),
}

/// Analyzes an FLV stream with the reader on its own thread.
///
/// At most `queue_capacity` tags are buffered between the two sides, a full
/// queue blocks the reader. Errors and results are the same as [`analyze`].
pub fn analyze_threaded<R: Read + Send>(
    source: R,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    options.config.validate()?;
    let (mut reader, header) = FlvReader::with_chunk_size(source, options.config.read_chunk_size)?;
    let mut session = Session::new(header, options);

    thread::scope(|scope| {
        let (tx, rx) = bounded(options.config.queue_capacity);
        let token = options.cancellation.clone();

        scope.spawn(move || {
            loop {
                if token.is_cancelled() {
                    debug!(position = reader.position(), "reader cancelled");
                    break;
                }

                let message = match reader.next_tag() {
                    Ok(Some(tag)) => Message::Tag(tag, reader.take_events()),
                    Ok(None) => Message::Finished {
                        events: reader.take_events(),
                        truncated: reader.is_truncated(),
                    },
                    Err(err) => Message::Failed(err),
                };
                let last = !matches!(message, Message::Tag(..));

                // the consumer is gone when sending fails
                if tx.send(message).is_err() || last {
                    break;
                }
            }
        });

        let mut truncated = false;
        let mut finished = false;
        for message in rx.iter() {
            if options.is_cancelled() {
                debug!(tags = session.tags, "analysis cancelled");
                break;
            }

            match message {
                Message::Tag(tag, events) => {
                    session.events(events);
                    session.tag(&tag);
                }
                Message::Finished {
                    events,
                    truncated: reader_truncated,
                } => {
                    session.events(events);
                    truncated = reader_truncated;
                    finished = true;
                    break;
                }
                Message::Failed(err) => return Err(err.into()),
            }
        }

        // A producer blocked on a full queue must see the disconnect.
        drop(rx);
        // The reader only stops short of the end when cancelled.
        Ok(session.finish(truncated, !finished))
    })
}

/// Opens `path` and analyzes it with [`analyze_threaded`].
pub fn analyze_path(
    path: impl AsRef<Path>,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    debug!(path = %path.display(), "analyzing file");
    analyze_threaded(file, options)
}

/// Analyzes an in-memory file. The reader copies `data` into its own buffer
/// as it goes, like any other source.
pub fn analyze_bytes(
    data: Bytes,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    analyze(io::Cursor::new(data), options)
}
