//! Bounded-memory extraction of delimiter-terminated segments.
//!
//! This module provides [`SegmentReader`], which pulls bytes from any source
//! implementing [`std::io::Read`] into a fixed-capacity buffer and hands out
//! successive segments that end with a caller-chosen delimiter byte. The buffer
//! is allocated once and never grows: when unconsumed bytes crowd the tail it is
//! compacted in place with [`shift`], and a segment that still does not fit is
//! reported as [`AddrStatError::BufferOverflow`].
//!
//! The delimiter search uses the SIMD-accelerated `memchr` crate.
//!
//! # Example
//!
//! ```
//! use addrstat::segment_reader::SegmentReader;
//! use std::io::Cursor;
//!
//! let mut reader = SegmentReader::new(Cursor::new(b"<a/><b/>tail".to_vec()), 16);
//! let mut segments = Vec::new();
//! while let Some(segment) = reader.read_segment(b'>')? {
//!     segments.push(String::from_utf8_lossy(segment).into_owned());
//! }
//! assert_eq!(segments, ["<a/>", "<b/>", "tail"]);
//! # Ok::<(), addrstat::AddrStatError>(())
//! ```

use crate::error::{AddrStatError, Result};
use std::io::{ErrorKind, Read};

/// Smallest refill chunk the reader will use; smaller requests are raised to it.
pub const MIN_READ_SIZE: usize = 16;

/// Refill chunk used by [`crate::PipelineConfig::default`].
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Move `length` bytes inside `buf` from offset `src` down to offset `dst`.
///
/// Only leftward moves are performed: when `src <= dst` nothing is copied and
/// `0` is returned. A `length` reaching past the end of `buf` is truncated.
///
/// Returns the number of bytes actually moved.
///
/// # Examples
///
/// ```
/// use addrstat::segment_reader::shift;
///
/// let mut buf = [0, 1, 2, 3, 4, 5, 6];
/// assert_eq!(shift(&mut buf, 3, 1, 3), 3);
/// assert_eq!(buf, [0, 3, 4, 5, 4, 5, 6]);
/// ```
pub fn shift(buf: &mut [u8], src: usize, dst: usize, length: usize) -> usize {
    if src <= dst || src > buf.len() {
        return 0;
    }
    let length = length.min(buf.len() - src);
    buf.copy_within(src..src + length, dst);
    length
}

/// Fixed byte arena with a read cursor (`pos`) and a fill mark (`len`).
///
/// `buf[pos..len]` holds bytes read from the source but not yet handed out.
#[derive(Debug)]
struct Arena {
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl Arena {
    fn new(capacity: usize) -> Self {
        Arena {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn pending(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    fn spare(&self) -> usize {
        self.buf.len() - self.len
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    fn commit(&mut self, n: usize) {
        self.len += n;
    }

    /// Slide the pending bytes to offset 0.
    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        let moved = shift(&mut self.buf, self.pos, 0, self.len - self.pos);
        self.pos = 0;
        self.len = moved;
    }

    /// Hand out the next `n` pending bytes.
    fn take(&mut self, n: usize) -> &[u8] {
        let start = self.pos;
        self.pos += n;
        if self.pos == self.len {
            // Fully drained: the next refill starts at the front.
            self.pos = 0;
            self.len = 0;
        }
        &self.buf[start..start + n]
    }
}

/// Reader yielding delimiter-terminated segments from a fixed buffer.
///
/// The buffer capacity is twice the (clamped) refill chunk, so memory use is
/// bounded by the configuration regardless of stream length. Every source byte
/// appears in exactly one returned segment, in stream order.
///
/// # Examples
///
/// ```
/// use addrstat::segment_reader::SegmentReader;
/// use std::io::Cursor;
///
/// let reader = SegmentReader::new(Cursor::new(Vec::new()), 4);
/// assert_eq!(reader.read_size(), 16);
/// assert_eq!(reader.capacity(), 32);
/// ```
#[derive(Debug)]
pub struct SegmentReader<R: Read> {
    source: R,
    arena: Arena,
    read_size: usize,
    exhausted: bool,
    segments_read: usize,
}

impl<R: Read> SegmentReader<R> {
    /// Create a new segment reader.
    ///
    /// # Arguments
    ///
    /// * `source` - Any source implementing [`std::io::Read`]
    /// * `read_size` - Refill chunk in bytes, raised to at least [`MIN_READ_SIZE`]
    pub fn new(source: R, read_size: usize) -> Self {
        let read_size = read_size.max(MIN_READ_SIZE);
        SegmentReader {
            source,
            arena: Arena::new(read_size * 2),
            read_size,
            exhausted: false,
            segments_read: 0,
        }
    }

    /// Effective refill chunk in bytes.
    #[must_use]
    pub fn read_size(&self) -> usize {
        self.read_size
    }

    /// Total buffer capacity in bytes; the longest segment that can be returned.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Number of segments handed out so far.
    #[must_use]
    pub fn segments_read(&self) -> usize {
        self.segments_read
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Read the next segment ending with `delimiter`.
    ///
    /// Returns `Ok(Some(segment))` with the delimiter included, or, once the
    /// source is exhausted, the trailing bytes without a delimiter (at most
    /// once). After that every call returns `Ok(None)`.
    ///
    /// The returned slice borrows the internal buffer and is only valid until
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The source fails ([`AddrStatError::SourceRead`])
    /// - No delimiter appears within [`capacity`](Self::capacity) pending bytes
    ///   ([`AddrStatError::BufferOverflow`])
    pub fn read_segment(&mut self, delimiter: u8) -> Result<Option<&[u8]>> {
        // Bytes of the pending region already known to hold no delimiter.
        let mut searched = 0;
        loop {
            if let Some(index) = memchr::memchr(delimiter, &self.arena.pending()[searched..]) {
                self.segments_read += 1;
                return Ok(Some(self.arena.take(searched + index + 1)));
            }
            searched = self.arena.pending().len();

            if self.exhausted {
                if searched == 0 {
                    return Ok(None);
                }
                self.segments_read += 1;
                return Ok(Some(self.arena.take(searched)));
            }

            self.refill()?;
        }
    }

    /// Pull one chunk from the source into the spare tail of the buffer.
    fn refill(&mut self) -> Result<()> {
        if self.arena.spare() < self.read_size {
            self.arena.compact();
        }
        if self.arena.spare() == 0 {
            return self.check_exhausted();
        }

        loop {
            match self.source.read(self.arena.spare_mut()) {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(());
                },
                Ok(n) => {
                    self.arena.commit(n);
                    return Ok(());
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(AddrStatError::SourceRead(e)),
            }
        }
    }

    /// With the buffer full, a pending tail is only valid if the source is done.
    fn check_exhausted(&mut self) -> Result<()> {
        let mut probe = [0u8; 1];
        loop {
            match self.source.read(&mut probe) {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(());
                },
                Ok(_) => {
                    return Err(AddrStatError::BufferOverflow {
                        capacity: self.arena.capacity(),
                    })
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(AddrStatError::SourceRead(e)),
            }
        }
    }
}
