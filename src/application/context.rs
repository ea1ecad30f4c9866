use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels the context it was created with, and every clone of it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl RequestContext {
    /// A context that never expires on its own.
    pub fn background() -> Self { Self::default() }

    /// Bounds the context by `timeout` from now. An earlier deadline wins; a
    /// timeout too large to represent adds no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(deadline) = Instant::now().checked_add(timeout) else { return self };
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attaches a fresh cancel signal, replacing any previous one.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle(tx))
    }

    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(ContextError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool { self.check().is_err() }

    /// Drives `op` unless the context finishes first, in which case `op` is
    /// dropped mid-flight and the interruption is returned instead.
    pub async fn run<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = cancelled(self.cancel.clone()) => Err(ContextError::Cancelled.into()),
            _ = expired(self.deadline) => Err(ContextError::DeadlineExceeded.into()),
            res = op => res,
        }
    }
}

async fn cancelled(rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = rx else { return std::future::pending().await };
    let fired = rx.wait_for(|c| *c).await.is_ok();
    if !fired {
        // handle dropped without cancelling
        std::future::pending::<()>().await;
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}
