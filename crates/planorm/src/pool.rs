//! Scratch buffer pool.
//!
//! Building signatures and argument lists needs a `String` and a `Vec<Value>` per call.
//! Buffers are checked out as RAII guards and handed back, cleared, when the guard drops. A
//! guard borrows its pool, so a buffer can never be in two places at once.

use crate::value::Value;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Buffers larger than this are dropped instead of being retained.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// A buffer type that can be reset for reuse.
pub trait Recycle: Default {
    fn recycle(&mut self);
    fn retained_capacity(&self) -> usize;
}

impl Recycle for String {
    fn recycle(&mut self) {
        self.clear();
    }

    fn retained_capacity(&self) -> usize {
        self.capacity()
    }
}

impl Recycle for Vec<Value> {
    fn recycle(&mut self) {
        self.clear();
    }

    fn retained_capacity(&self) -> usize {
        self.capacity() * std::mem::size_of::<Value>()
    }
}

/// A free list of reusable buffers.
#[derive(Debug)]
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T: Recycle> Pool<T> {
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Check out a cleared buffer.
    pub fn get(&self) -> Pooled<'_, T> {
        let buf = self.free.lock().pop().unwrap_or_default();
        Pooled { buf, pool: self }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut buf: T) {
        if buf.retained_capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.recycle();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(buf);
        }
    }
}

/// A buffer checked out of a [`Pool`]; returned on drop.
pub struct Pooled<'a, T: Recycle> {
    buf: T,
    pool: &'a Pool<T>,
}

impl<T: Recycle> Pooled<'_, T> {
    /// Take the buffer out of the pool's custody.
    pub fn into_inner(mut self) -> T {
        std::mem::take(&mut self.buf)
    }
}

impl<T: Recycle> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.buf
    }
}

impl<T: Recycle> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.buf
    }
}

impl<T: Recycle> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

/// The pair of pools a [`PlanRegistry`](crate::PlanRegistry) hands out per call.
#[derive(Debug)]
pub struct BufferPool {
    strings: Pool<String>,
    args: Pool<Vec<Value>>,
}

impl BufferPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            strings: Pool::new(max_idle),
            args: Pool::new(max_idle),
        }
    }

    pub fn string(&self) -> Pooled<'_, String> {
        self.strings.get()
    }

    pub fn args(&self) -> Pooled<'_, Vec<Value>> {
        self.args.get()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(64)
    }
}
