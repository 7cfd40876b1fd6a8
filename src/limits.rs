//! Server configuration limits and timeouts.
//!
//! Defaults are intentionally conservative: bounded buffers, bounded queues,
//! and short timeouts keep a misbehaving peer from holding resources.
//!
//! # Examples
//!
//! ```no_run
//! use ember_web::limits::{ConnLimits, PoolLimits, ServerLimits};
//! use std::time::Duration;
//!
//! let server = ServerLimits {
//!     workers: 200,
//!     ..ServerLimits::default()
//! };
//! let conn = ConnLimits {
//!     socket_read_timeout: Duration::from_secs(5),
//!     ..ConnLimits::default()
//! };
//! let pool = PoolLimits {
//!     buffer_size: 32 * 1024,
//!     ..PoolLimits::default()
//! };
//! # let _ = (server, conn, pool);
//! ```

use std::time::Duration;

/// Server-level concurrency and queueing behavior.
///
/// Exactly `workers` processing tasks are created when the server is built;
/// each runs an independent loop popping connections from a shared queue.
/// The accept loop only enqueues, so worker count — not connection volume —
/// bounds concurrent request processing.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of connection-processing workers (default: `100`).
    ///
    /// Created once at build time and reused for the life of the server.
    pub workers: usize,

    /// Maximum number of accepted connections waiting for a worker
    /// (default: `250`).
    ///
    /// Connections accepted past this watermark are dropped with a warning.
    pub max_pending_connections: usize,

    /// How idle workers wait for the next connection (default: `Sleep(50µs)`).
    pub wait_strategy: WaitStrategy,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            workers: 100,
            max_pending_connections: 250,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),

            _priv: (),
        }
    }
}

/// Strategy for worker tasks waiting on an empty connection queue.
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// Re-poll after [`tokio::task::yield_now`]. Lowest latency, busy CPU.
    Yield,
    /// Re-poll after [`tokio::time::sleep`] with the given pause.
    Sleep(Duration),
}

/// Per-connection limits and timeouts.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum wait for a single socket read (default: `2 seconds`).
    ///
    /// The primary cleanup mechanism for stalled and slow-drip peers.
    pub socket_read_timeout: Duration,

    /// Maximum wait for the socket to become writable while draining a
    /// response (default: `3 seconds`).
    pub socket_write_timeout: Duration,

    /// Requests served on one connection before it closes (default: `100`).
    pub max_requests_per_connection: usize,

    /// Upper bound on bytes offered to the socket per flush call
    /// (default: `4096`).
    ///
    /// Smaller chunks yield the worker loop more often between writes;
    /// larger chunks reduce syscalls for bulky responses.
    pub flush_chunk_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(2),
            socket_write_timeout: Duration::from_secs(3),
            max_requests_per_connection: 100,
            flush_chunk_size: 4096,

            _priv: (),
        }
    }
}

/// Request buffer pool sizing.
///
/// Every request checks one fixed-size slab out of the pool; `buffer_size`
/// therefore caps the header block plus however much body is buffered before
/// incremental body reads take over.
#[derive(Debug, Clone)]
pub struct PoolLimits {
    /// Size of each pooled request buffer in bytes (default: `16 KiB`).
    pub buffer_size: usize,

    /// Slabs kept on the free list (default: `128`).
    ///
    /// Checkouts beyond this fall back to plain heap allocations, so the
    /// value bounds retained memory, not concurrency.
    pub capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for PoolLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            buffer_size: 16 * 1024,
            capacity: 128,

            _priv: (),
        }
    }
}
