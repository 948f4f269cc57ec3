//! Instrumented loaders for cache tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A loader that counts invocations and returns the invocation number.
///
/// Every call returns a different value, so a test can tell a cached
/// result from a reload. An optional delay simulates slow I/O.
#[derive(Debug, Clone, Default)]
pub struct CountingLoader {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each call sleep for `delay` before returning.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Arc::default(),
            delay: Some(delay),
        }
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Run one load for `key`, returning `"{key}#{n}"` where `n` starts at 1.
    pub async fn load(&self, key: String) -> Result<String, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("{key}#{n}"))
    }
}

/// A loader that always fails with `message`, counting calls.
#[derive(Debug, Clone)]
pub struct FailingLoader {
    calls: Arc<AtomicUsize>,
    message: String,
}

impl FailingLoader {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            calls: Arc::default(),
            message: message.into(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn load(&self, _key: String) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.message.clone())
    }
}
