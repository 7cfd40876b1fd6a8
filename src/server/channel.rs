//! Per-connection processing: one stream, one Request/Responder pair at a
//! time, one handler.

use crate::{
    http::{request::Request, responder::Responder, types::Status},
    limits::ConnLimits,
    pool::BufferPool,
};
use std::{future::Future, io, sync::Arc};
use tokio::net::TcpStream;
use tracing::debug;

/// How the connection should proceed after a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep the connection open for the next request.
    KeepAlive,
    /// Close the connection after the response drains.
    Close,
}

/// Request dispatch interface invoked by a [`Channel`].
///
/// One handler instance is shared by every connection, so implementations
/// keep per-request state on the responder, not on themselves.
///
/// [`Router`](crate::Router) is the batteries-included implementation;
/// implement this directly for hand-rolled dispatch:
///
/// ```
/// use ember_web::{Control, Handler, Request, Responder, Status};
///
/// struct Health;
///
/// impl Handler for Health {
///     async fn handle(&self, _req: &Request, responder: &mut Responder) -> Control {
///         responder.send(Status::Ok);
///         Control::KeepAlive
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Processes one request and finalizes the responder.
    fn handle(
        &self,
        request: &Request,
        responder: &mut Responder,
    ) -> impl Future<Output = Control> + Send;
}

/// Owns one accepted connection and serves requests on it until it closes.
///
/// Each iteration checks a fresh buffer out of the pool, fills and parses a
/// request, lets the handler build the response, then drains the responder
/// cooperatively: bounded [`flush`](Responder::flush) calls gated on socket
/// writability, so a slow peer never blocks the worker in a write.
pub struct Channel<H: Handler> {
    stream: TcpStream,
    handler: Arc<H>,
    pool: Arc<BufferPool>,
    limits: ConnLimits,
    request_count: usize,
}

impl<H: Handler> Channel<H> {
    pub fn new(
        stream: TcpStream,
        handler: Arc<H>,
        pool: Arc<BufferPool>,
        limits: ConnLimits,
    ) -> Self {
        Self {
            stream,
            handler,
            pool,
            limits,
            request_count: 0,
        }
    }

    /// Serves requests until the peer closes, a request asks to close, the
    /// per-connection request limit is reached, or I/O fails.
    pub async fn serve(&mut self) -> io::Result<()> {
        loop {
            let mut request = Request::new(self.pool.checkout());

            let read = match request
                .fill(&mut self.stream, self.limits.socket_read_timeout)
                .await
            {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    debug!("idle connection timed out");
                    break;
                }
                Err(e) => return Err(e),
            };

            if read == 0 {
                break;
            }

            request.parse();

            let mut responder = Responder::new();

            // Keep-alive hint derivation lives here, not in the core: the
            // responder only ever sees the explicit override.
            if let Ok(value) = request.field(b"Connection") {
                if value.eq_ignore_ascii_case(b"close") {
                    responder.set_explicit_keep_alive(false);
                }
            }

            let control = self.dispatch(&request, &mut responder).await;
            self.drain(&mut responder).await?;

            self.request_count += 1;

            if control == Control::Close
                || !responder.keep_alive()
                || self.request_count >= self.limits.max_requests_per_connection
            {
                break;
            }
        }

        debug!(requests = self.request_count, "connection complete");
        Ok(())
    }

    /// Screens request-line garbage before the handler sees the request.
    ///
    /// Parsing itself is lenient, so an unrecognizable method or version
    /// surfaces here as a 400-class response instead of a handler call.
    async fn dispatch(&self, request: &Request, responder: &mut Responder) -> Control {
        if request.method().is_err() {
            return reject(responder, Status::BadRequest);
        }
        if request.protocol_version().is_err() {
            return reject(responder, Status::HttpVersionNotSupported);
        }

        debug!(
            method = ?request.method(),
            uri = request.uri_str().unwrap_or("<non-utf8>"),
            "request"
        );

        self.handler.handle(request, responder).await
    }

    /// Drains the responder through bounded flushes as the socket becomes
    /// writable.
    async fn drain(&mut self, responder: &mut Responder) -> io::Result<()> {
        loop {
            match tokio::time::timeout(self.limits.socket_write_timeout, self.stream.writable())
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "write timeout"));
                }
            }

            let (completed, _) =
                responder.flush(&mut self.stream, self.limits.flush_chunk_size)?;

            if completed {
                return Ok(());
            }
        }
    }
}

fn reject(responder: &mut Responder, status: Status) -> Control {
    responder.set_explicit_keep_alive(false);
    responder.send(status);
    Control::Close
}
