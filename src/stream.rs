//! L1: sequential byte sources with optional seek/tell (spec.md §3.1).
//!
//! The core never opens, closes, or retains a caller-supplied stream beyond the
//! duration of one `parse` call (spec.md §3.3).

use crate::error::ParseError;
use std::io::{self, Read, Seek, SeekFrom};

/// Byte producer consumed by [`crate::field::Field::parse`].
///
/// `read` may return fewer bytes than requested (short read signals exhaustion,
/// mirrored by callers via [`Stream::read_exact`]). `seek`/`tell` are only valid
/// when [`Stream::seekable`] is true; combinators that need look-ahead (Union,
/// lax Padding, [`crate::stream::with_bookmark`]) check this first.
pub trait Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn tell(&mut self) -> io::Result<u64>;
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    fn seekable(&self) -> bool;

    /// Reads exactly `buf.len()` bytes or fails with `StreamExhausted`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ParseError> {
        let mut got = 0;
        while got < buf.len() {
            let n = self.read(&mut buf[got..])?;
            if n == 0 {
                return Err(ParseError::StreamExhausted {
                    needed: buf.len() as u64,
                    got: got as u64,
                });
            }
            got += n;
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, ParseError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }
}

/// In-memory, seekable stream. The typical root stream for tests and for any
/// caller that has already buffered the input.
#[derive(Debug)]
pub struct SliceStream<T> {
    cursor: io::Cursor<T>,
}

impl<T: AsRef<[u8]>> SliceStream<T> {
    pub fn new(inner: T) -> Self {
        Self {
            cursor: io::Cursor::new(inner),
        }
    }
}

impl<T: AsRef<[u8]>> Stream for SliceStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.cursor.position())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }

    fn seekable(&self) -> bool {
        true
    }
}

/// Wraps any [`Read`] that is not also [`Seek`]. Cannot look ahead; `seek`
/// always fails since there is no way to honor it.
#[derive(Debug)]
pub struct ReaderStream<R> {
    inner: R,
    position: u64,
}

impl<R: Read> ReaderStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
        }
    }
}

impl<R: Read> Stream for ReaderStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "underlying reader does not support seeking",
        ))
    }

    fn seekable(&self) -> bool {
        false
    }
}

/// Wraps a [`Read`] + [`Seek`] source (e.g. `std::fs::File`), delegating
/// `seek`/`tell` to the real file position rather than tracking it by hand.
#[derive(Debug)]
pub struct SeekableReaderStream<R> {
    inner: R,
}

impl<R: Read + Seek> SeekableReaderStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Seek> Stream for SeekableReaderStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }

    fn seekable(&self) -> bool {
        true
    }
}

/// Runs `f` with the stream, then restores the stream's original offset
/// regardless of whether `f` succeeded — the scoped "stream state bookmark"
/// of spec.md §4.10, expressed as a closure rather than a `Drop` guard so
/// that `stream` is usable again inside `f` without fighting the borrow
/// checker over a second, simultaneous mutable borrow (see DESIGN.md).
pub fn with_bookmark<R>(
    stream: &mut dyn Stream,
    f: impl FnOnce(&mut dyn Stream) -> Result<R, ParseError>,
) -> Result<R, ParseError> {
    if !stream.seekable() {
        return Err(ParseError::Stream(
            "stream bookmark requires a seekable stream".to_owned(),
        ));
    }
    let offset = stream.tell()?;
    let outcome = f(stream);
    stream.seek(SeekFrom::Start(offset))?;
    outcome
}
