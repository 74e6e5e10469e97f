use thiserror::Error;

/// Fatal reader failures. Problems inside the tag stream are reported as
/// [`crate::ReaderEvent`]s instead.
#[derive(Error, Debug)]
pub enum FlvError {
    #[error("not an FLV stream, signature is {0:02x?}")]
    InvalidSignature([u8; 3]),
    #[error("invalid FLV header: {0}")]
    InvalidHeader(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
