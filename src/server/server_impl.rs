//! Endpoint binding, worker pool, and the accept loop.

use crate::{
    limits::{ConnLimits, PoolLimits, ServerLimits, WaitStrategy},
    pool::BufferPool,
    server::channel::{Channel, Handler},
};
use crossbeam::queue::SegQueue;
use socket2::{Domain, Protocol, Socket, Type};
use std::{io, net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    task::yield_now,
    time::sleep,
};
use tracing::{debug, info, warn};

type StreamQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;

/// Binds a TCP listener on `addr` with `SO_REUSEADDR` and the given listen
/// backlog, ready for [`ServerBuilder::listener`].
///
/// Must be called from within a tokio runtime.
pub fn bind_endpoint(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}

/// An HTTP server: an accept loop feeding a fixed pool of connection workers.
///
/// Workers are spawned once by [`ServerBuilder::build`]; each runs an
/// independent loop popping connections off a shared queue and serving one
/// [`Channel`] at a time. The accept loop in [`launch`](Server::launch) only
/// enqueues, so the worker count bounds concurrency regardless of how many
/// connections arrive.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use ember_web::{bind_endpoint, Method, Router, Server, Status};
///
/// #[tokio::main]
/// async fn main() {
///     let mut router = Router::new();
///     router.install_route(Method::Get, "/", |_req, resp, _params| {
///         resp.set_body(Bytes::from_static(b"Hello, world!"));
///         Status::Ok
///     });
///
///     Server::builder()
///         .listener(bind_endpoint("127.0.0.1:8080".parse().unwrap(), 128).unwrap())
///         .handler(router)
///         .build()
///         .launch()
///         .await;
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    queue: StreamQueue,
    limits: ServerLimits,
}

impl Server {
    /// Creates a builder for configuring a server instance.
    #[inline]
    pub fn builder<H: Handler>() -> ServerBuilder<H> {
        ServerBuilder {
            listener: None,
            handler: None,
            server_limits: None,
            connection_limits: None,
            pool_limits: None,
        }
    }

    /// Runs the accept loop, feeding the worker pool until the process ends.
    pub async fn launch(self) {
        info!(
            addr = ?self.listener.local_addr().ok(),
            "accepting connections"
        );

        loop {
            let Ok((stream, addr)) = self.listener.accept().await else {
                continue;
            };

            if self.queue.len() < self.limits.max_pending_connections {
                self.queue.push((stream, addr));
            } else {
                warn!(client = %addr, "connection queue full, dropping connection");
            }
        }
    }

    async fn next_stream(queue: &StreamQueue, wait: &WaitStrategy) -> (TcpStream, SocketAddr) {
        loop {
            if let Some(value) = queue.pop() {
                return value;
            }

            match wait {
                WaitStrategy::Yield => yield_now().await,
                WaitStrategy::Sleep(pause) => sleep(*pause).await,
            }
        }
    }
}

/// Builder for [`Server`] instances.
///
/// A listener and a handler are required; every limit falls back to its
/// default.
pub struct ServerBuilder<H: Handler> {
    listener: Option<TcpListener>,
    handler: Option<Arc<H>>,
    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    pool_limits: Option<PoolLimits>,
}

impl<H: Handler> ServerBuilder<H> {
    /// Sets the TCP listener the server accepts connections from.
    ///
    /// **This is a required component.** See [`bind_endpoint`].
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the handler every worker dispatches requests to.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Overrides worker-pool and queueing limits.
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Overrides per-connection limits and timeouts.
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Overrides request-buffer pool sizing.
    #[inline(always)]
    pub fn pool_limits(mut self, limits: PoolLimits) -> Self {
        self.pool_limits = Some(limits);
        self
    }

    /// Spawns the worker pool and finalizes the server.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when [`listener`](Self::listener) or
    /// [`handler`](Self::handler) was not called.
    #[track_caller]
    pub fn build(self) -> Server {
        let listener = self
            .listener
            .expect("The `listener` method must be called to create");
        let handler = self
            .handler
            .expect("The `handler` method must be called to create");

        let server_limits = self.server_limits.unwrap_or_default();
        let conn_limits = self.connection_limits.unwrap_or_default();
        let pool_limits = self.pool_limits.unwrap_or_default();

        let queue: StreamQueue = Arc::new(SegQueue::new());
        let pool = BufferPool::create(pool_limits.buffer_size, pool_limits.capacity);

        for worker in 0..server_limits.workers {
            Self::spawn_worker(
                worker,
                &queue,
                server_limits.wait_strategy.clone(),
                &handler,
                &pool,
                conn_limits.clone(),
            );
        }

        info!(workers = server_limits.workers, "worker pool ready");

        Server {
            listener,
            queue,
            limits: server_limits,
        }
    }

    fn spawn_worker(
        worker: usize,
        queue: &StreamQueue,
        wait: WaitStrategy,
        handler: &Arc<H>,
        pool: &Arc<BufferPool>,
        limits: ConnLimits,
    ) {
        let queue = Arc::clone(queue);
        let handler = Arc::clone(handler);
        let pool = Arc::clone(pool);

        tokio::spawn(async move {
            loop {
                let (stream, addr) = Server::next_stream(&queue, &wait).await;
                debug!(worker, client = %addr, "connection picked up");

                let mut channel = Channel::new(
                    stream,
                    Arc::clone(&handler),
                    Arc::clone(&pool),
                    limits.clone(),
                );

                if let Err(error) = channel.serve().await {
                    debug!(worker, client = %addr, %error, "connection ended with error");
                }
            }
        });
    }
}
