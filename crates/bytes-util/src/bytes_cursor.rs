use std::io;

use bytes::Bytes;

/// An [`io::Cursor`] over [`Bytes`], so reads can hand out sub-slices of the
/// backing buffer instead of copies.
pub type BytesCursor = io::Cursor<Bytes>;

/// Zero-copy extraction for [`BytesCursor`].
pub trait BytesCursorExt {
    /// Number of unread bytes.
    fn remaining_len(&self) -> usize;

    /// Takes every unread byte, O(1).
    fn extract_remaining(&mut self) -> Bytes;

    /// Takes the next `size` bytes, O(1). Fails with
    /// [`io::ErrorKind::UnexpectedEof`] if fewer are left, without moving the
    /// cursor.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;
}

impl BytesCursorExt for BytesCursor {
    fn remaining_len(&self) -> usize {
        self.get_ref()
            .len()
            .saturating_sub(self.position() as usize)
    }

    fn extract_remaining(&mut self) -> Bytes {
        let len = self.remaining_len();
        self.extract_bytes(len).unwrap_or_default()
    }

    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        if size > self.remaining_len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted {size} bytes, {} left", self.remaining_len()),
            ));
        }

        let start = self.position() as usize;
        let slice = self.get_ref().slice(start..start + size);
        self.set_position((start + size) as u64);

        Ok(slice)
    }
}
