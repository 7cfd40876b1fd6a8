//! Response accumulation, snapshotting, and incremental framing.

use crate::http::types::Status;
use bytes::Bytes;
use std::{io, sync::Arc, time::Duration};

/// Destination contract for [`Responder::flush`].
///
/// A sink accepts up to the offered number of bytes per call and is allowed
/// to accept fewer, including zero — a non-blocking socket that is not
/// currently writable simply accepts nothing. The responder never retries
/// internally; the owner calls flush again when the sink can make progress.
pub trait OutputSink {
    /// Writes as much of `data` as the sink will take right now.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl OutputSink for Vec<u8> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }
}

impl OutputSink for tokio::net::TcpStream {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.try_write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Attributes serialized into a `Set-Cookie` line.
///
/// Expiry is carried as `Max-Age`; the flags map to `Secure` and `HttpOnly`.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: Option<Duration>,
    pub secure: bool,
    pub http_only: bool,
}

/// An immutable, replayable response snapshot.
///
/// Holds the status, the keep-alive hint, the fully serialized header block,
/// and the shared body buffer. Building one is the expensive step; replaying
/// it through [`Responder::send_cached`] costs nothing but the writes, which
/// is what makes it worth keeping for hot responses like error pages. Safe to
/// share across threads behind its `Arc`.
#[derive(Debug)]
pub struct CachedResponse {
    status: Status,
    keep_alive: bool,
    header: Vec<u8>,
    body: Bytes,
}

impl CachedResponse {
    /// The status this snapshot was cached as.
    #[inline(always)]
    pub fn status(&self) -> Status {
        self.status
    }

    // The serialized header block and body are only visible to the framing
    // logic below; callers replay a snapshot, they do not pick it apart.
    #[inline(always)]
    fn header(&self) -> &[u8] {
        &self.header
    }

    #[inline(always)]
    fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Accumulates an outbound response and drains it to an [`OutputSink`] in
/// bounded increments.
///
/// The responder collects header fields, cookies, a shared body buffer, and
/// a keep-alive hint. [`send`](Responder::send) marks the response ready;
/// serialization happens lazily the first time bytes are requested. From then
/// on [`flush`](Responder::flush) walks a single write cursor across the
/// logical `header ++ body` stream, advancing by however many bytes the sink
/// actually accepted, so the owning loop can drain cooperatively as the
/// socket becomes writable — the responder never blocks.
///
/// [`cache_as`](Responder::cache_as) snapshots the serialized response for
/// replay via [`send_cached`](Responder::send_cached), which bypasses
/// re-serialization entirely.
///
/// # Examples
/// ```
/// use bytes::Bytes;
/// use ember_web::{Responder, Status};
///
/// let mut responder = Responder::new();
/// responder.set_field("Content-Type", "text/plain");
/// responder.set_body(Bytes::from_static(b"hi"));
/// responder.send(Status::Ok);
///
/// let mut sink = Vec::new();
/// let (completed, written) = responder.flush(&mut sink, usize::MAX).unwrap();
/// assert!(completed);
/// assert_eq!(written, sink.len());
/// assert!(sink.starts_with(b"HTTP/1.1 200 OK\r\n"));
/// assert!(sink.ends_with(b"\r\nhi"));
/// ```
#[derive(Debug, Default)]
pub struct Responder {
    fields: Vec<(String, String)>,
    body: Bytes,
    explicit_keep_alive: Option<bool>,
    status: Option<Status>,
    prepared: Option<Arc<CachedResponse>>,
    write_pos: usize,
}

impl Responder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field line. No deduplication: setting the same name
    /// twice emits two lines.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Appends a `Set-Cookie` line.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.set_cookie_with(name, value, &CookieOptions::default());
    }

    /// Appends a `Set-Cookie` line carrying the given attributes.
    pub fn set_cookie_with(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let mut line = format!("{name}={value}");

        if let Some(domain) = &options.domain {
            line.push_str("; Domain=");
            line.push_str(domain);
        }
        if let Some(path) = &options.path {
            line.push_str("; Path=");
            line.push_str(path);
        }
        if let Some(max_age) = options.max_age {
            line.push_str("; Max-Age=");
            line.push_str(&max_age.as_secs().to_string());
        }
        if options.secure {
            line.push_str("; Secure");
        }
        if options.http_only {
            line.push_str("; HttpOnly");
        }

        self.fields.push(("Set-Cookie".to_string(), line));
    }

    /// Attaches a shared body buffer. The bytes are not copied.
    #[inline]
    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Overrides the connection-persistence hint (default `true`).
    #[inline]
    pub fn set_explicit_keep_alive(&mut self, keep_alive: bool) {
        self.explicit_keep_alive = Some(keep_alive);
    }

    /// The connection-persistence hint the framed response carries.
    #[inline]
    pub fn keep_alive(&self) -> bool {
        match &self.prepared {
            Some(response) => response.keep_alive,
            None => self.explicit_keep_alive.unwrap_or(true),
        }
    }

    /// Finalizes the response for immediate framing.
    ///
    /// Serialization is deferred until the first [`flush`](Responder::flush)
    /// asks for bytes. Any previously installed snapshot is discarded.
    pub fn send(&mut self, status: Status) {
        self.status = Some(status);
        self.prepared = None;
        self.write_pos = 0;
    }

    /// Serializes the accumulated response into an immutable snapshot,
    /// installs it for framing, and returns it for later replay.
    ///
    /// Emits no bytes by itself.
    pub fn cache_as(&mut self, status: Status) -> Arc<CachedResponse> {
        let response = Arc::new(self.build(status));

        self.status = Some(status);
        self.prepared = Some(Arc::clone(&response));
        self.write_pos = 0;

        response
    }

    /// Replaces the pending response with a previously cached snapshot,
    /// bypassing re-serialization.
    pub fn send_cached(&mut self, cached: Arc<CachedResponse>) {
        self.status = Some(cached.status);
        self.explicit_keep_alive = Some(cached.keep_alive);
        self.prepared = Some(cached);
        self.write_pos = 0;
    }

    /// True once `send`, `send_cached`, or `cache_as` ran.
    #[inline]
    pub fn is_sent(&self) -> bool {
        self.status.is_some()
    }

    /// The status most recently requested via `send`/`send_cached`.
    ///
    /// # Panics
    ///
    /// Panics when no status was ever requested.
    #[inline]
    pub fn status(&self) -> Status {
        self.status.expect("status requested before send()")
    }

    /// Writes up to `max_bytes` from the logical `header ++ body` stream into
    /// `sink`, starting at the current write cursor.
    ///
    /// The cursor advances by the bytes the sink actually accepted; a sink
    /// accepting fewer than offered ends the call early. Returns whether the
    /// response is fully drained and how many bytes this call wrote. Calling
    /// again after completion is a `(true, 0)` no-op.
    ///
    /// # Panics
    ///
    /// Panics when called before any `send`/`send_cached` — flushing a
    /// response that was never finalized is a call-site bug.
    pub fn flush<S>(&mut self, sink: &mut S, max_bytes: usize) -> io::Result<(bool, usize)>
    where
        S: OutputSink + ?Sized,
    {
        if self.prepared.is_none() {
            let status = self.status.expect("flush() called before send()");
            self.prepared = Some(Arc::new(self.build(status)));
        }
        let response = Arc::clone(self.prepared.as_ref().unwrap());

        let header = response.header();
        let body = response.body();
        let total = header.len() + body.len();

        let mut written = 0;

        while written < max_bytes && self.write_pos < total {
            let (segment, offset) = if self.write_pos < header.len() {
                (header, self.write_pos)
            } else {
                (body.as_ref(), self.write_pos - header.len())
            };

            let want = (segment.len() - offset).min(max_bytes - written);
            let accepted = sink.write(&segment[offset..offset + want])?;

            self.write_pos += accepted;
            written += accepted;

            if accepted < want {
                break;
            }
        }

        Ok((self.write_pos == total, written))
    }

    /// Serializes the status line and accumulated header lines.
    ///
    /// Deterministic by construction: replaying the snapshot yields the same
    /// bytes as framing the same state directly.
    fn build(&self, status: Status) -> CachedResponse {
        let keep_alive = self.explicit_keep_alive.unwrap_or(true);

        let mut header = Vec::with_capacity(128);
        header.extend_from_slice(status.status_line());

        for (name, value) in &self.fields {
            header.extend_from_slice(name.as_bytes());
            header.extend_from_slice(b": ");
            header.extend_from_slice(value.as_bytes());
            header.extend_from_slice(b"\r\n");
        }

        if !keep_alive {
            header.extend_from_slice(b"Connection: close\r\n");
        }

        header.extend_from_slice(b"Content-Length: ");
        header.extend_from_slice(self.body.len().to_string().as_bytes());
        header.extend_from_slice(b"\r\n\r\n");

        CachedResponse {
            status,
            keep_alive,
            header,
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(responder: &mut Responder, max_bytes: usize) -> Vec<u8> {
        let mut sink = Vec::new();
        loop {
            let (completed, _) = responder.flush(&mut sink, max_bytes).unwrap();
            if completed {
                return sink;
            }
        }
    }

    /// Accepts at most `cap` bytes per write call.
    struct Trickle {
        out: Vec<u8>,
        cap: usize,
    }

    impl OutputSink for Trickle {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let n = data.len().min(self.cap);
            self.out.extend_from_slice(&data[..n]);
            Ok(n)
        }
    }

    #[test]
    fn frames_status_fields_and_body() {
        let mut responder = Responder::new();
        responder.set_field("Content-Type", "text/html");
        responder.set_body(Bytes::from_static(b"<b>hi</b>"));
        responder.send(Status::Ok);

        let bytes = drain(&mut responder, usize::MAX);
        assert_eq!(
            bytes,
            b"HTTP/1.1 200 OK\r\n\
Content-Type: text/html\r\n\
Content-Length: 9\r\n\
\r\n\
<b>hi</b>"
        );
    }

    #[test]
    fn empty_body_frames_zero_length() {
        let mut responder = Responder::new();
        responder.send(Status::NoContent);

        let bytes = drain(&mut responder, usize::MAX);
        assert_eq!(
            bytes,
            b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn duplicate_fields_append() {
        let mut responder = Responder::new();
        responder.set_field("X-Tag", "one");
        responder.set_field("X-Tag", "two");
        responder.send(Status::Ok);

        let bytes = drain(&mut responder, usize::MAX);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("X-Tag: one\r\nX-Tag: two\r\n"));
    }

    #[test]
    fn close_hint_emits_connection_header() {
        let mut responder = Responder::new();
        responder.set_explicit_keep_alive(false);
        responder.send(Status::Ok);

        let bytes = drain(&mut responder, usize::MAX);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("Connection: close\r\n"));
        assert!(!responder.keep_alive());
    }

    #[test]
    fn keep_alive_defaults_to_true() {
        let mut responder = Responder::new();
        assert!(responder.keep_alive());

        responder.send(Status::Ok);
        let bytes = drain(&mut responder, usize::MAX);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(!text.contains("Connection:"));
    }

    #[test]
    fn cookies_serialize_with_options() {
        let mut responder = Responder::new();
        responder.set_cookie("sid", "abcd1234");
        responder.set_cookie_with(
            "theme",
            "dark",
            &CookieOptions {
                domain: Some("example.com".to_string()),
                path: Some("/app".to_string()),
                max_age: Some(Duration::from_secs(3600)),
                secure: true,
                http_only: true,
            },
        );
        responder.send(Status::Ok);

        let bytes = drain(&mut responder, usize::MAX);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("Set-Cookie: sid=abcd1234\r\n"));
        assert!(text.contains(
            "Set-Cookie: theme=dark; Domain=example.com; Path=/app; \
Max-Age=3600; Secure; HttpOnly\r\n"
        ));
    }

    #[test]
    fn small_increments_equal_single_flush() {
        let build = || {
            let mut responder = Responder::new();
            responder.set_field("Content-Type", "text/plain");
            responder.set_cookie("sid", "1");
            responder.set_body(Bytes::from_static(b"incremental flushing!"));
            responder.send(Status::Ok);
            responder
        };

        let whole = drain(&mut build(), usize::MAX);

        for max_bytes in [1, 2, 3, 7, 16] {
            let mut responder = build();
            let mut sink = Vec::new();
            let mut calls = 0;

            loop {
                let (completed, written) = responder.flush(&mut sink, max_bytes).unwrap();
                calls += 1;
                if completed {
                    break;
                }
                assert!(written <= max_bytes);
            }

            assert_eq!(sink, whole, "max_bytes={max_bytes}");
            assert!(calls >= whole.len() / max_bytes);
        }
    }

    #[test]
    fn completed_is_false_until_the_end() {
        let mut responder = Responder::new();
        responder.set_body(Bytes::from_static(b"0123456789"));
        responder.send(Status::Ok);

        let mut sink = Vec::new();
        let mut completions = 0;

        loop {
            let (completed, _) = responder.flush(&mut sink, 8).unwrap();
            if completed {
                completions += 1;
                break;
            }
            assert_eq!(completions, 0);
        }

        assert_eq!(completions, 1);
    }

    #[test]
    fn flush_after_completion_is_a_noop() {
        let mut responder = Responder::new();
        responder.send(Status::Ok);

        let mut sink = Vec::new();
        let (completed, _) = responder.flush(&mut sink, usize::MAX).unwrap();
        assert!(completed);

        let before = sink.len();
        assert_eq!(responder.flush(&mut sink, usize::MAX).unwrap(), (true, 0));
        assert_eq!(sink.len(), before);
    }

    #[test]
    fn saturated_sink_suspends_progress() {
        let mut responder = Responder::new();
        responder.set_body(Bytes::from_static(b"partial writes"));
        responder.send(Status::Ok);

        let mut sink = Trickle {
            out: Vec::new(),
            cap: 5,
        };

        let (completed, written) = responder.flush(&mut sink, usize::MAX).unwrap();
        assert!(!completed);
        assert_eq!(written, 5);

        // The cursor resumes exactly where the sink stopped accepting.
        loop {
            let (completed, written) = responder.flush(&mut sink, usize::MAX).unwrap();
            assert!(written <= 5);
            if completed {
                break;
            }
        }

        let mut whole = Responder::new();
        whole.set_body(Bytes::from_static(b"partial writes"));
        whole.send(Status::Ok);
        assert_eq!(sink.out, drain(&mut whole, usize::MAX));
    }

    #[test]
    fn cached_replay_is_byte_identical() {
        let build = |responder: &mut Responder| {
            responder.set_field("Content-Type", "text/html");
            responder.set_cookie("sid", "42");
            responder.set_explicit_keep_alive(false);
            responder.set_body(Bytes::from_static(b"<h1>404 Not Found</h1>\n"));
        };

        let mut direct = Responder::new();
        build(&mut direct);
        direct.send(Status::NotFound);
        let direct_bytes = drain(&mut direct, usize::MAX);

        let mut origin = Responder::new();
        build(&mut origin);
        let cached = origin.cache_as(Status::NotFound);

        let mut replay = Responder::new();
        replay.send_cached(Arc::clone(&cached));
        let replay_bytes = drain(&mut replay, usize::MAX);

        assert_eq!(replay_bytes, direct_bytes);
        assert_eq!(replay.status(), Status::NotFound);
        assert!(!replay.keep_alive());
    }

    #[test]
    fn cache_as_emits_no_bytes_but_primes_framing() {
        let mut responder = Responder::new();
        responder.set_body(Bytes::from_static(b"page"));

        let cached = responder.cache_as(Status::Ok);
        assert_eq!(cached.status(), Status::Ok);

        // The snapshot is installed: flushing drains it without a send().
        let bytes = drain(&mut responder, usize::MAX);
        assert!(bytes.ends_with(b"\r\npage"));
    }

    #[test]
    fn cached_snapshot_replays_concurrently() {
        let mut origin = Responder::new();
        origin.set_body(Bytes::from_static(b"shared page"));
        let cached = origin.cache_as(Status::Ok);

        let expected = drain(&mut origin, usize::MAX);
        let mut handles = Vec::new();

        for _ in 0..4 {
            let cached = Arc::clone(&cached);
            let expected = expected.clone();
            handles.push(std::thread::spawn(move || {
                let mut responder = Responder::new();
                responder.send_cached(cached);
                assert_eq!(drain(&mut responder, usize::MAX), expected);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn send_discards_installed_snapshot() {
        let mut responder = Responder::new();
        responder.set_body(Bytes::from_static(b"old"));
        let _cached = responder.cache_as(Status::Ok);

        responder.set_body(Bytes::from_static(b"new"));
        responder.send(Status::Created);

        let bytes = drain(&mut responder, usize::MAX);
        assert!(bytes.starts_with(b"HTTP/1.1 201 Created\r\n"));
        assert!(bytes.ends_with(b"\r\nnew"));
    }

    #[test]
    #[should_panic(expected = "flush() called before send()")]
    fn flush_before_send_is_a_bug() {
        let mut responder = Responder::new();
        let mut sink = Vec::new();
        let _ = responder.flush(&mut sink, 16);
    }

    #[test]
    #[should_panic(expected = "status requested before send()")]
    fn status_before_send_is_a_bug() {
        Responder::new().status();
    }
}
