//! Response Buffer: last-known-good fallback
//!
//! Holds at most one response, the most recent successful fetch. It starts
//! empty, is overwritten (never merged) on every success and is never cleared,
//! so a caller that cannot get fresh data can still be served stale data.

use parking_lot::RwLock;
use switchover_channel_interface::Response;

#[derive(Debug)]
pub struct ResponseBuffer<T> {
    latest: RwLock<Option<Response<T>>>,
}

impl<T: Clone> ResponseBuffer<T> {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
        }
    }

    /// Overwrite the buffer with `response`, returning what it replaced
    pub fn store(&self, response: Response<T>) -> Option<Response<T>> {
        self.latest.write().replace(response)
    }

    /// Clone of the buffered response, if any fetch ever succeeded
    pub fn latest(&self) -> Option<Response<T>> {
        self.latest.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.read().is_none()
    }
}

impl<T: Clone> Default for ResponseBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
