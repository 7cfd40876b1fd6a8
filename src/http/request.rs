//! A parsed HTTP request backed by a pool-checked-out buffer.

use crate::{
    errors::ErrorKind,
    http::{
        parser::ParsedTables,
        types::{self, Method, Version},
    },
    pool::PooledBuffer,
};
use memchr::memmem;
use std::{io, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::sleep,
};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH_LINE: &[u8] = b"\r\nContent-Length:";

/// One HTTP request: an owned, pool-checked-out buffer plus the parse tables
/// that index into it.
///
/// The request borrows nothing from the connection; every accessor resolves
/// an internal byte range against the owned buffer, so views stay valid
/// exactly as long as the request is alive and the backing slab returns to
/// the pool when the request drops.
///
/// Filling and parsing are split so the owner controls the I/O:
/// [`fill`](Request::fill) reads from the connection until the request is
/// complete (or the buffer is full), [`parse`](Request::parse) recognizes the
/// structure, and the typed accessors take over from there. Bodies larger
/// than the buffer are drained incrementally with
/// [`read_body_chunk`](Request::read_body_chunk).
pub struct Request {
    buffer: PooledBuffer,
    len: usize,
    tables: ParsedTables,
    body_consumed: usize,
}

impl Request {
    /// Wraps a checked-out buffer into an unfilled, unparsed request.
    #[inline]
    pub fn new(buffer: PooledBuffer) -> Self {
        Self {
            buffer,
            len: 0,
            tables: ParsedTables::default(),
            body_consumed: 0,
        }
    }

    /// Reads from `stream` into the owned buffer until the request is
    /// complete, the buffer is full, or the peer closes.
    ///
    /// A request counts as complete once the end-of-header boundary is in the
    /// buffer and the declared `Content-Length` worth of body bytes follows
    /// it. Each read is bounded by `timeout`; an expired read fails with
    /// [`io::ErrorKind::TimedOut`]. Returns the total bytes read, `0` when
    /// the peer closed before sending anything.
    pub async fn fill<S>(&mut self, stream: &mut S, timeout: Duration) -> io::Result<usize>
    where
        S: AsyncRead + Unpin,
    {
        let mut total = 0;

        while self.len < self.buffer.len() {
            let read = tokio::select! {
                biased;

                result = stream.read(&mut self.buffer[self.len..]) => result?,
                _ = sleep(timeout) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"));
                }
            };

            if read == 0 {
                break;
            }

            self.len += read;
            total += read;

            if self.request_complete() {
                break;
            }
        }

        Ok(total)
    }

    /// Recognizes the buffered request. Must run before the accessors.
    #[inline]
    pub fn parse(&mut self) {
        let len = self.len;
        self.tables.parse(&self.buffer[..len]);
    }

    /// Fast completeness probe over the raw buffer, run between reads and
    /// before any parsing.
    fn request_complete(&self) -> bool {
        let buf = &self.buffer[..self.len];

        let Some(header_end) = memmem::find(buf, HEADER_TERMINATOR) else {
            return false;
        };

        let declared = declared_content_length(&buf[..header_end + 2]).unwrap_or(0);
        buf.len() - (header_end + HEADER_TERMINATOR.len()) >= declared
    }

    #[inline(always)]
    fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

// Typed accessors
impl Request {
    /// The request method.
    #[inline]
    pub fn method(&self) -> Result<Method, ErrorKind> {
        Method::from_bytes(self.tables.method()?.of(self.bytes()))
    }

    /// The raw request URI.
    #[inline]
    pub fn uri(&self) -> Result<&[u8], ErrorKind> {
        Ok(self.tables.uri()?.of(self.bytes()))
    }

    /// The request URI as UTF-8, when it is valid UTF-8.
    #[inline]
    pub fn uri_str(&self) -> Option<&str> {
        simdutf8::basic::from_utf8(self.uri().ok()?).ok()
    }

    /// The protocol version.
    #[inline]
    pub fn protocol_version(&self) -> Result<Version, ErrorKind> {
        Version::from_bytes(self.tables.version()?.of(self.bytes()))
    }

    /// Looks up a header field by exact byte name.
    #[inline]
    pub fn field(&self, name: &[u8]) -> Result<&[u8], ErrorKind> {
        Ok(self.tables.field(self.bytes(), name)?.of(self.bytes()))
    }

    /// Header field as UTF-8; `None` when absent or not valid UTF-8.
    #[inline]
    pub fn field_str(&self, name: &[u8]) -> Option<&str> {
        simdutf8::basic::from_utf8(self.field(name).ok()?).ok()
    }

    /// Looks up a cookie, parsing the `Cookie` header on first access.
    #[inline]
    pub fn cookie(&self, name: &[u8]) -> Result<&[u8], ErrorKind> {
        Ok(self.tables.cookie(self.bytes(), name)?.of(self.bytes()))
    }

    /// Every cookie name, in order of appearance.
    pub fn cookie_names(&self) -> Vec<&[u8]> {
        self.tables
            .cookie_names(self.bytes())
            .into_iter()
            .map(|span| span.of(self.bytes()))
            .collect()
    }

    /// The declared `Content-Length`, when present and numeric.
    #[inline]
    pub fn content_length(&self) -> Option<usize> {
        types::slice_to_usize(self.field(b"Content-Length").ok()?)
    }

    /// The buffered body region following the header block.
    ///
    /// For bodies larger than the buffer this is only the buffered prefix;
    /// use [`read_body_chunk`](Request::read_body_chunk) to drain the rest.
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.tables.body().of(self.bytes())
    }

    /// Copies the next chunk of body bytes into `dst`.
    ///
    /// Drains the buffered body region first, then continues reading from
    /// `stream`. The caller is responsible for stopping at the declared
    /// `Content-Length`.
    pub async fn read_body_chunk<S>(&mut self, stream: &mut S, dst: &mut [u8]) -> io::Result<usize>
    where
        S: AsyncRead + Unpin,
    {
        let buffered = self.tables.body().of(&self.buffer[..self.len]);
        let pending = &buffered[self.body_consumed.min(buffered.len())..];

        if !pending.is_empty() {
            let n = pending.len().min(dst.len());
            dst[..n].copy_from_slice(&pending[..n]);
            self.body_consumed += n;
            return Ok(n);
        }

        stream.read(dst).await
    }
}

/// Extracts the declared `Content-Length` out of a raw header block.
///
/// Exact-byte header naming, matching the parser's lookup semantics.
fn declared_content_length(head: &[u8]) -> Option<usize> {
    let at = memmem::find(head, CONTENT_LENGTH_LINE)?;
    let value = &head[at + CONTENT_LENGTH_LINE.len()..];

    let skip = value
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    let value = &value[skip..];

    let digits = value
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(value.len());

    types::slice_to_usize(&value[..digits])
}
