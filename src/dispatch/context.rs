//! Cancellable bounding context handed to loads.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::errors::LoaderError;

/// A cancellable signal with a cause.
///
/// Cloning is cheap and every clone observes the same state. Cancellation is
/// advisory: jobs that want to stop early must poll [`LoadContext::is_done`]
/// or await [`LoadContext::done`] themselves.
#[derive(Clone, Debug)]
pub struct LoadContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    cause: OnceLock<LoaderError>,
    parent: Option<LoadContext>,
}

impl LoadContext {
    /// A root context that is never cancelled unless [`LoadContext::cancel`] is called
    pub fn background() -> Self {
        Self::from_parts(CancellationToken::new(), None)
    }

    fn from_parts(token: CancellationToken, parent: Option<LoadContext>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                cause: OnceLock::new(),
                parent,
            }),
        }
    }

    /// A derived context, cancelled when this one is or when cancelled directly
    pub fn child(&self) -> Self {
        Self::from_parts(self.inner.token.child_token(), Some(self.clone()))
    }

    /// A derived context that cancels itself with [`LoaderError::DeadlineExceeded`] after `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let ctx = self.child();
        let timer = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    timer.cancel_with(LoaderError::deadline_exceeded(timeout_ms));
                }
                _ = timer.inner.token.cancelled() => {}
            }
        });
        ctx
    }

    /// Cancel this context and its children, recording `reason` as the cause
    pub fn cancel<S: Into<String>>(&self, reason: S) {
        self.cancel_with(LoaderError::cancelled(reason));
    }

    fn cancel_with(&self, cause: LoaderError) {
        // First cause wins.
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub async fn done(&self) {
        self.inner.token.cancelled().await
    }

    /// The cancellation cause, or `None` while the context is live
    pub fn err(&self) -> Option<LoaderError> {
        if !self.is_done() {
            return None;
        }
        if let Some(cause) = self.inner.cause.get() {
            return Some(cause.clone());
        }
        self.inner
            .parent
            .as_ref()
            .and_then(LoadContext::err)
            .or_else(|| Some(LoaderError::cancelled("context canceled")))
    }
}

impl Default for LoadContext {
    fn default() -> Self {
        Self::background()
    }
}
