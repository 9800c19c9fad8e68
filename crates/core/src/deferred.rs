//! Deferred values: work started at construction, joined at resolution.
//!
//! Builders accept either an immediate value or a future. A future handed to
//! [`Deferred::spawn`] is started right away on the current tokio runtime so
//! independent fragments overlap in wall-clock time; the resolver later joins
//! each handle exactly once, in document order.

use crate::error::NodeError;
use futures::future::BoxFuture;
use std::future::Future;
use tokio::task::JoinHandle;

/// A value that is either available now or being computed.
pub enum Deferred<T> {
    /// Immediate value.
    Ready(T),
    /// Not yet started (no runtime was available at construction).
    Pending(BoxFuture<'static, Result<T, NodeError>>),
    /// Running on the runtime since construction.
    Spawned(JoinHandle<Result<T, NodeError>>),
    /// Already joined; the result lives on the node.
    Taken,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap an immediate value.
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Start `future` eagerly if a tokio runtime is available, otherwise
    /// keep it until [`join`](Self::join) drives it.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, NodeError>> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Self::Spawned(handle.spawn(future)),
            Err(_) => Self::Pending(Box::pin(future)),
        }
    }

    /// Store a future without starting it.
    pub fn lazy<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, NodeError>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Await the value. The underlying computation is never re-invoked:
    /// a second call returns [`NodeError::AlreadyJoined`].
    pub async fn join(&mut self) -> Result<T, NodeError> {
        match std::mem::replace(self, Self::Taken) {
            Self::Ready(value) => Ok(value),
            Self::Pending(future) => future.await,
            Self::Spawned(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "Deferred value task did not complete");
                    Err(NodeError::Join(e.to_string()))
                }
            },
            Self::Taken => Err(NodeError::AlreadyJoined),
        }
    }
}

impl<T> Deferred<T> {
    /// Whether [`join`](Self::join) has already consumed this value.
    pub fn is_taken(&self) -> bool {
        matches!(self, Self::Taken)
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => write!(f, "Deferred::Ready"),
            Self::Pending(_) => write!(f, "Deferred::Pending"),
            Self::Spawned(_) => write!(f, "Deferred::Spawned"),
            Self::Taken => write!(f, "Deferred::Taken"),
        }
    }
}

impl From<String> for Deferred<String> {
    fn from(value: String) -> Self {
        Self::Ready(value)
    }
}

impl From<&str> for Deferred<String> {
    fn from(value: &str) -> Self {
        Self::Ready(value.to_string())
    }
}

impl From<serde_json::Value> for Deferred<serde_json::Value> {
    fn from(value: serde_json::Value) -> Self {
        Self::Ready(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn ready_value_joins_once() {
        let mut value = Deferred::ready("hello".to_string());
        assert_eq!(value.join().await.unwrap(), "hello");
        assert!(value.is_taken());
        assert_eq!(value.join().await.unwrap_err(), NodeError::AlreadyJoined);
    }

    #[tokio::test]
    async fn spawned_work_starts_before_join() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let mut value = Deferred::spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, NodeError>(42usize)
        });
        assert!(matches!(value, Deferred::Spawned(_)));

        tokio::task::yield_now().await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        assert_eq!(value.join().await.unwrap(), 42);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawn_without_runtime_stays_pending() {
        let value = Deferred::spawn(async { Ok::<_, NodeError>(1u8) });
        assert!(matches!(value, Deferred::Pending(_)));
    }

    #[tokio::test]
    async fn rejection_is_returned() {
        let mut value: Deferred<String> =
            Deferred::lazy(async { Err(NodeError::rejected("boom")) });
        assert_eq!(value.join().await.unwrap_err(), NodeError::rejected("boom"));
    }
}
