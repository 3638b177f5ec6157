//! Fan-out/join primitive.
//!
//! A [`Waiter`] spawns units onto the tokio runtime and lets its owner wait
//! until every one of them has finished. A unit that panics is recovered at
//! the unit boundary: the panic is logged with a stack trace and the unit
//! counts as finished. Nothing is reported back to the joiner.

use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error, Instrument};

use crate::core::config::LoaderConfig;
use crate::core::errors::LoaderError;

#[derive(Debug)]
pub struct Waiter {
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    config: Arc<LoaderConfig>,
}

/// Decrements the pending count when a unit ends, however it ends
struct PendingGuard {
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

impl Waiter {
    pub fn new(config: Arc<LoaderConfig>) -> Self {
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
            config,
        }
    }

    /// Number of spawned units that have not finished yet
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Run `unit` concurrently. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: impl Into<String>, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            drained: Arc::clone(&self.drained),
        };
        let label = label.into();
        let config = Arc::clone(&self.config);

        tokio::spawn(
            async move {
                let _guard = guard;
                if let Err(payload) = AssertUnwindSafe(unit).catch_unwind().await {
                    let fault = LoaderError::unit_panicked(&label, panic_message(payload.as_ref()));
                    error!(unit = %label, error = %fault, "waiter recovered a panic");
                    if config.capture_backtrace {
                        let stack = stack_trace(config.max_backtrace_bytes);
                        error!(unit = %label, "----------------Panic Stack---------------\n{}", stack);
                    }
                } else {
                    debug!(unit = %label, "unit finished");
                }
            }
            .in_current_span(),
        );
    }

    /// Wait until every spawned unit has finished
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            // Register before checking so a notification between the check
            // and the await is not lost.
            drained.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            drained.await;
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn stack_trace(limit: usize) -> String {
    let mut stack = Backtrace::force_capture().to_string();
    if stack.len() > limit {
        let mut end = limit;
        while !stack.is_char_boundary(end) {
            end -= 1;
        }
        stack.truncate(end);
    }
    stack
}
