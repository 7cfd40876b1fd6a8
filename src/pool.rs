//! Lock-free pool of fixed-size request buffers.

use crossbeam::queue::ArrayQueue;
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// Concurrent pool of fixed-size byte slabs backing request buffers.
///
/// Workers check a buffer out before parsing and the slab returns to the pool
/// when the [`PooledBuffer`] drops. The free list is lock-free, so checkout
/// and return are safe from any number of connection workers. An empty pool
/// falls back to a fresh heap allocation; a full free list lets returning
/// slabs drop instead of growing without bound.
///
/// # Examples
/// ```
/// use ember_web::BufferPool;
///
/// let pool = BufferPool::create(4096, 16);
/// let buffer = pool.checkout();
/// assert_eq!(buffer.len(), 4096);
/// drop(buffer); // slab returns to the pool
/// ```
#[derive(Debug)]
pub struct BufferPool {
    slabs: ArrayQueue<Box<[u8]>>,
    buffer_size: usize,
}

impl BufferPool {
    /// Creates a pool of `capacity` zeroed slabs of `buffer_size` bytes each.
    pub fn create(buffer_size: usize, capacity: usize) -> Arc<Self> {
        assert!(buffer_size > 0, "buffer_size must be non-zero");
        assert!(capacity > 0, "capacity must be non-zero");

        let slabs = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            let _ = slabs.push(vec![0; buffer_size].into_boxed_slice());
        }

        Arc::new(Self { slabs, buffer_size })
    }

    /// Checks a buffer out of the pool, allocating when the pool is drained.
    pub fn checkout(self: &Arc<Self>) -> PooledBuffer {
        let data = self
            .slabs
            .pop()
            .unwrap_or_else(|| vec![0; self.buffer_size].into_boxed_slice());

        PooledBuffer {
            data: Some(data),
            pool: Arc::clone(self),
        }
    }

    /// The size of every slab handed out by this pool.
    #[inline(always)]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// How many slabs currently sit in the free list.
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.slabs.len()
    }
}

/// A byte slab borrowed from a [`BufferPool`] for the lifetime of one request.
#[derive(Debug)]
pub struct PooledBuffer {
    data: Option<Box<[u8]>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        self.data.as_ref().unwrap()
    }
}

impl DerefMut for PooledBuffer {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data.as_mut().unwrap()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(mut data) = self.data.take() {
            data.fill(0);
            let _ = self.pool.slabs.push(data);
        }
    }
}
