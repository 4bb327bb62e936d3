//! Blocking entry point for the async lookup code.
//!
//! A lookup runs to completion on the calling thread; the only bound on it is
//! the one the caller imposes here, from outside the lookup itself.
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build runtime: {0}")]
    Build(#[from] std::io::Error),

    #[error("deadline of {0:?} elapsed")]
    DeadlineElapsed(Duration),

    #[error("cancelled")]
    Cancelled,
}

pub struct SaferRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl SaferRuntime {
    /// Build a single-threaded Tokio runtime.
    ///
    /// ```
    /// use safer_runtime::SaferRuntime;
    ///
    /// let runtime = SaferRuntime::build().expect("runtime builds");
    /// assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    /// ```
    pub fn build() -> Result<Self, RuntimeError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts any future running under [`SaferRuntime::block_on_with_deadline`].
    ///
    /// ```
    /// use safer_runtime::SaferRuntime;
    ///
    /// let runtime = SaferRuntime::build().unwrap();
    /// let cancel = runtime.cancellation();
    /// cancel.cancel();
    /// assert!(runtime.cancellation().is_cancelled());
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Run `fut` until it completes, `deadline` elapses, or the runtime's
    /// token is cancelled. `None` means no deadline.
    ///
    /// ```
    /// use safer_runtime::{RuntimeError, SaferRuntime};
    /// use std::time::Duration;
    ///
    /// let runtime = SaferRuntime::build().unwrap();
    /// let slow = runtime.block_on_with_deadline(
    ///     async { tokio::time::sleep(Duration::from_secs(5)).await },
    ///     Some(Duration::from_millis(10)),
    /// );
    /// assert!(matches!(slow, Err(RuntimeError::DeadlineElapsed(_))));
    /// ```
    pub fn block_on_with_deadline<F: Future>(
        &self,
        fut: F,
        deadline: Option<Duration>,
    ) -> Result<F::Output, RuntimeError> {
        let cancel = self.cancel.clone();
        self.runtime.block_on(async move {
            let bounded = async {
                match deadline {
                    Some(limit) => tokio::time::timeout(limit, fut)
                        .await
                        .map_err(|_| RuntimeError::DeadlineElapsed(limit)),
                    None => Ok(fut.await),
                }
            };
            tokio::select! {
                out = bounded => out,
                _ = cancel.cancelled() => {
                    warn!(target: "safer.runtime", "work cancelled before completion");
                    Err(RuntimeError::Cancelled)
                }
            }
        })
    }

    /// Cancel outstanding work and shut the runtime down, waiting at most
    /// `graceful` for blocking tasks. Async tasks still pending are dropped,
    /// so drain anything that must finish before calling this.
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_within_deadline() {
        let runtime = SaferRuntime::build().unwrap();
        let out = runtime.block_on_with_deadline(async { "done" }, Some(Duration::from_secs(1)));
        assert_eq!(out.unwrap(), "done");
    }

    #[test]
    fn no_deadline_runs_to_completion() {
        let runtime = SaferRuntime::build().unwrap();
        let out = runtime.block_on_with_deadline(
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            },
            None,
        );
        assert_eq!(out.unwrap(), 7);
    }

    #[test]
    fn cancelled_token_aborts_work() {
        let runtime = SaferRuntime::build().unwrap();
        runtime.cancellation().cancel();
        let out = runtime.block_on_with_deadline(std::future::pending::<()>(), None);
        assert!(matches!(out, Err(RuntimeError::Cancelled)));
    }

    #[test]
    fn shutdown_cancels_outstanding_tokens() {
        let runtime = SaferRuntime::build().unwrap();
        let token = runtime.cancellation();
        let handle = runtime.block_on(async { tokio::spawn(async { 1 }) });
        assert_eq!(runtime.block_on(handle).unwrap(), 1);
        runtime.shutdown(Duration::from_millis(10));
        assert!(token.is_cancelled());
    }
}
