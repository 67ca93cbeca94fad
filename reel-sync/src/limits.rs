//! Shared cap on in-flight remote calls, plus a per-call timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::SourceError;

/// Cloned into every collection task; all clones share one semaphore.
#[derive(Debug, Clone)]
pub struct RemoteLimits {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Duration,
}

impl RemoteLimits {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one remote call under a permit. The timeout covers the call only,
    /// not the wait for a permit; expiry yields [`SourceError::Timeout`].
    pub async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::Closed)?;
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }
}
