use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::FlvError;
use crate::header::{FLV_HEADER_SIZE, FlvHeader};
use crate::tag::{FlvTag, FlvTagHeader, FlvTagType, PREVIOUS_TAG_SIZE, TAG_HEADER_SIZE};

/// Default number of bytes requested from the source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Something the reader noticed and worked around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A `PreviousTagSize` field disagreed with the tag before it. The
    /// declared data size was trusted and reading went on.
    RecoverableCorruption {
        /// Offset of the trailer.
        offset: u64,
        /// `11 + data_size` of the preceding tag, 0 for `PreviousTagSize0`.
        declared: u32,
        /// Value found in the trailer.
        trailer: u32,
    },
    /// The source ended inside a tag. No further tags follow.
    Truncated {
        /// Offset of the incomplete structure.
        offset: u64,
        /// Bytes needed to complete it.
        needed: u64,
        /// Bytes that were left.
        available: u64,
    },
    /// A tag whose type is not audio, video or script data was skipped.
    UnknownTagType { offset: u64, tag_type: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header parsed, the padding and `PreviousTagSize0` come next.
    Preamble,
    Tags,
    Finished,
}

/// Pull based FLV tag reader over any [`io::Read`].
///
/// Bytes are read in chunks into a [`BytesMut`]; each tag payload is split
/// off that buffer and frozen, so tags share the allocation instead of
/// copying it. Recoverable problems are collected as [`ReaderEvent`]s and
/// never end the stream early except for truncation.
///
/// ```rust
/// use bytes::Bytes;
/// use flv::FlvReader;
///
/// let file = Bytes::from_static(b"FLV\x01\x05\x00\x00\x00\x09\x00\x00\x00\x00");
/// let (mut reader, header) = FlvReader::from_bytes(file).unwrap();
///
/// assert!(header.has_audio && header.has_video);
/// assert!(reader.next_tag().unwrap().is_none());
/// assert!(!reader.is_truncated());
/// ```
pub struct FlvReader<R> {
    source: R,
    buffer: BytesMut,
    chunk_size: usize,
    /// Source offset of `buffer[0]`.
    offset: u64,
    eof: bool,
    state: State,
    header: FlvHeader,
    events: Vec<ReaderEvent>,
    truncated: bool,
}

impl<R: Read> FlvReader<R> {
    /// Reads and validates the FLV header. Nothing after the header is read
    /// yet when this returns.
    pub fn open(source: R) -> Result<(Self, FlvHeader), FlvError> {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Like [`FlvReader::open`], with a custom read size.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Result<(Self, FlvHeader), FlvError> {
        let mut reader = Self {
            source,
            buffer: BytesMut::with_capacity(chunk_size.max(FLV_HEADER_SIZE)),
            chunk_size: chunk_size.max(1),
            offset: 0,
            eof: false,
            state: State::Preamble,
            header: FlvHeader::new(false, false),
            events: Vec::new(),
            truncated: false,
        };

        let header = reader.read_header()?;
        Ok((reader, header))
    }

    fn read_header(&mut self) -> Result<FlvHeader, FlvError> {
        if !self.fill(FLV_HEADER_SIZE)? {
            // Report a bad signature even when the file is tiny.
            if self.buffer.len() >= 3 && &self.buffer[..3] != b"FLV" {
                return Err(FlvError::InvalidSignature([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                ]));
            }
            return Err(FlvError::InvalidHeader(format!(
                "source ends after {} of {FLV_HEADER_SIZE} header bytes",
                self.buffer.len()
            )));
        }

        let header = FlvHeader::parse(&self.buffer[..FLV_HEADER_SIZE])?;
        self.consume(FLV_HEADER_SIZE);
        self.header = header;

        debug!(
            version = header.version,
            has_audio = header.has_audio,
            has_video = header.has_video,
            data_offset = header.data_offset,
            "parsed FLV header"
        );

        Ok(header)
    }

    /// The header returned by [`FlvReader::open`].
    pub fn header(&self) -> &FlvHeader {
        &self.header
    }

    /// Number of bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Whether the stream ended in the middle of a tag.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<ReaderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Gives the source back.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Reads until at least `needed` bytes are buffered or the source is
    /// exhausted. Returns whether `needed` bytes are available.
    fn fill(&mut self, needed: usize) -> io::Result<bool> {
        while self.buffer.len() < needed && !self.eof {
            let start = self.buffer.len();
            let want = self.chunk_size.max(needed - start);
            self.buffer.resize(start + want, 0);

            let read = loop {
                match self.source.read(&mut self.buffer[start..]) {
                    Ok(read) => break read,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        self.buffer.truncate(start);
                        return Err(err);
                    }
                }
            };

            self.buffer.truncate(start + read);
            if read == 0 {
                self.eof = true;
            }
        }

        Ok(self.buffer.len() >= needed)
    }

    fn consume(&mut self, len: usize) {
        self.buffer.advance(len);
        self.offset += len as u64;
    }

    fn truncate_at(&mut self, offset: u64, needed: usize) {
        let available = self.buffer.len() as u64;
        self.record_truncation(offset, needed as u64, available);
    }

    fn record_truncation(&mut self, offset: u64, needed: u64, available: u64) {
        let event = ReaderEvent::Truncated {
            offset,
            needed,
            available,
        };
        warn!(?event, "FLV stream is truncated");
        self.events.push(event);
        self.truncated = true;
        self.finish();
    }

    /// Discards `len` bytes, the buffered ones first, then straight from
    /// the source without buffering. Returns `false` once the truncation is
    /// recorded if the source ends early.
    fn discard(&mut self, len: u64) -> io::Result<bool> {
        let start = self.offset;
        let buffered = (self.buffer.len() as u64).min(len);
        self.consume(buffered as usize);

        let remaining = len - buffered;
        let skipped = if remaining > 0 && !self.eof {
            io::copy(&mut (&mut self.source).take(remaining), &mut io::sink())?
        } else {
            0
        };
        self.offset += skipped;

        if skipped < remaining {
            self.eof = true;
            self.record_truncation(start, len, buffered + skipped);
            return Ok(false);
        }

        Ok(true)
    }

    fn finish(&mut self) {
        self.state = State::Finished;
        self.buffer.clear();
    }

    /// Skips header padding and checks `PreviousTagSize0`.
    fn read_preamble(&mut self) -> io::Result<()> {
        let padding = u64::from(self.header.data_offset).saturating_sub(FLV_HEADER_SIZE as u64);
        if padding > 0 && !self.discard(padding)? {
            return Ok(());
        }

        if !self.fill(PREVIOUS_TAG_SIZE)? {
            if self.buffer.is_empty() {
                // Header only file.
                self.finish();
            } else {
                self.truncate_at(self.offset, PREVIOUS_TAG_SIZE);
            }
            return Ok(());
        }

        let trailer = BigEndian::read_u32(&self.buffer[..PREVIOUS_TAG_SIZE]);
        if trailer != 0 {
            self.record_corruption(self.offset, 0, trailer);
        }
        self.consume(PREVIOUS_TAG_SIZE);
        self.state = State::Tags;

        Ok(())
    }

    fn record_corruption(&mut self, offset: u64, declared: u32, trailer: u32) {
        let event = ReaderEvent::RecoverableCorruption {
            offset,
            declared,
            trailer,
        };
        warn!(?event, "previous tag size mismatch, trusting the tag header");
        self.events.push(event);
    }

    /// Returns the next audio, video or script tag, `None` at the end.
    ///
    /// Only I/O failures of the source are errors. Truncation ends the
    /// sequence with a [`ReaderEvent::Truncated`].
    pub fn next_tag(&mut self) -> Result<Option<FlvTag>, FlvError> {
        if self.state == State::Preamble {
            self.read_preamble()?;
        }

        loop {
            if self.state == State::Finished {
                return Ok(None);
            }

            let tag_offset = self.offset;
            if !self.fill(TAG_HEADER_SIZE)? {
                if self.buffer.is_empty() {
                    self.finish();
                } else {
                    self.truncate_at(tag_offset, TAG_HEADER_SIZE);
                }
                return Ok(None);
            }

            let header = FlvTagHeader::parse(&self.buffer[..TAG_HEADER_SIZE])?;
            let total = TAG_HEADER_SIZE + header.data_size as usize;
            if !self.fill(total)? {
                self.truncate_at(tag_offset, total);
                return Ok(None);
            }

            self.consume(TAG_HEADER_SIZE);
            let data = self.buffer.split_to(header.data_size as usize).freeze();
            self.offset += data.len() as u64;

            self.read_trailer(&header)?;

            match FlvTagType::from_u8(header.tag_type) {
                Some(tag_type) => {
                    trace!(
                        %tag_type,
                        offset = tag_offset,
                        timestamp_ms = header.timestamp_ms,
                        size = header.data_size,
                        "read tag"
                    );
                    return Ok(Some(FlvTag {
                        tag_type,
                        timestamp_ms: header.timestamp_ms,
                        stream_id: header.stream_id,
                        offset: tag_offset,
                        data,
                    }));
                }
                None => {
                    debug!(tag_type = header.tag_type, offset = tag_offset, "skipping unknown tag type");
                    self.events.push(ReaderEvent::UnknownTagType {
                        offset: tag_offset,
                        tag_type: header.tag_type,
                    });
                }
            }
        }
    }

    /// Reads the `PreviousTagSize` after a complete tag. A missing trailer
    /// marks the stream truncated but keeps the tag.
    fn read_trailer(&mut self, header: &FlvTagHeader) -> io::Result<()> {
        let trailer_offset = self.offset;
        if !self.fill(PREVIOUS_TAG_SIZE)? {
            self.truncate_at(trailer_offset, PREVIOUS_TAG_SIZE);
            return Ok(());
        }

        let trailer = BigEndian::read_u32(&self.buffer[..PREVIOUS_TAG_SIZE]);
        if trailer != header.expected_trailer() {
            self.record_corruption(trailer_offset, header.expected_trailer(), trailer);
        }
        self.consume(PREVIOUS_TAG_SIZE);

        Ok(())
    }
}

impl<R: Read + Seek> FlvReader<R> {
    /// Seeks the source back to the start and parses the header again.
    /// Pending events are discarded.
    pub fn rewind(&mut self) -> Result<FlvHeader, FlvError> {
        self.source.seek(SeekFrom::Start(0))?;
        self.buffer.clear();
        self.offset = 0;
        self.eof = false;
        self.state = State::Preamble;
        self.events.clear();
        self.truncated = false;

        self.read_header()
    }
}

impl FlvReader<File> {
    /// Opens a file. Reads are already chunked, so no extra buffering layer
    /// is added.
    pub fn from_path(path: impl AsRef<Path>) -> Result<(Self, FlvHeader), FlvError> {
        Self::open(File::open(path)?)
    }
}

impl FlvReader<io::Cursor<Bytes>> {
    /// Reads from memory.
    pub fn from_bytes(data: Bytes) -> Result<(Self, FlvHeader), FlvError> {
        let chunk_size = data.len().max(FLV_HEADER_SIZE);
        Self::with_chunk_size(io::Cursor::new(data), chunk_size)
    }
}

impl<R: Read> Iterator for FlvReader<R> {
    type Item = Result<FlvTag, FlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag().transpose()
    }
}
