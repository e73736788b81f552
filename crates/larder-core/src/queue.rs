// src/queue.rs
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Bounded blocking FIFO used to hand accepted descriptors from the accept
/// thread to the worker pool. Ownership of an item transfers from pusher to
/// popper; nothing else may touch it in between.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks while the queue is full. Returns `false` once the queue has
    /// been closed, in which case the caller keeps ownership of `item`.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() == inner.capacity && !inner.closed {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Blocks while the queue is empty. After `close`, drains whatever
    /// remains and then returns `None`.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Stop accepting new items and wake every blocked pusher and popper.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}
