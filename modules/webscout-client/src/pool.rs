use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered provider addresses with a shared round-robin cursor. One pool is
/// created at bootstrap and handed to every client by `Arc`, so the cursor
/// spreads load across the whole process, concurrent runs included.
pub struct EndpointPool {
    endpoints: Vec<String>,
    cursor: AtomicUsize,
}

impl EndpointPool {
    /// `endpoints` must be non-empty; `Config::from_env` guarantees at least
    /// the default gateway address.
    pub fn new(endpoints: Vec<String>) -> Self {
        assert!(!endpoints.is_empty(), "endpoint pool requires at least one address");
        Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next endpoint in rotation. Interleaving under concurrency only
    /// affects which endpoint serves which call, not correctness.
    pub fn next(&self) -> &str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
