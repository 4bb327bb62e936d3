use crate::browser::error::SessionError;
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use url::Url;

/// One live browser owned by a single lookup.
///
/// Implementations are driven sequentially; nothing is shared between
/// sessions and a session is never reused once released.
#[async_trait]
pub trait RenderingSession: Send + Sync {
    /// Load `url` and block until the browser reports the navigation done.
    async fn navigate(&mut self, url: &Url) -> Result<(), SessionError>;

    /// Poll until `selector` matches, bounded by `within`.
    ///
    /// Returns `Ok(false)` when the bound elapses first.
    async fn wait_for(&mut self, selector: &str, within: Duration) -> Result<bool, SessionError>;

    /// Poll until the current URL contains `fragment`, bounded by `within`.
    async fn wait_for_url(
        &mut self,
        fragment: &str,
        within: Duration,
    ) -> Result<bool, SessionError>;

    /// Click the first element matching `selector`. `Ok(false)` if nothing matched.
    async fn click_first(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// Number of elements matching `selector` in the current document.
    async fn count(&self, selector: &str) -> Result<usize, SessionError>;

    /// Serialized DOM of the current document.
    async fn page_source(&self) -> Result<String, SessionError>;

    /// Terminate the browser.
    async fn release(self: Box<Self>) -> Result<(), SessionError>;
}

/// Starts rendering sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn RenderingSession>, SessionError>;
}

fn background_releases() -> &'static TaskTracker {
    static TRACKER: OnceLock<TaskTracker> = OnceLock::new();
    TRACKER.get_or_init(TaskTracker::new)
}

/// Wait up to `within` for sessions handed off by dropped guards to finish
/// releasing. Returns `false` if some were still pending.
pub async fn drain_background_releases(within: Duration) -> bool {
    let tracker = background_releases();
    tracker.close();
    let drained = tokio::time::timeout(within, tracker.wait()).await.is_ok();
    tracker.reopen();
    drained
}

/// Owns a [`RenderingSession`] for the duration of one lookup.
///
/// [`SessionGuard::release`] is the normal exit. If the guard is dropped
/// without it (early return, panic, cancelled future) the session is handed
/// to the ambient Tokio runtime to be released in the background; see
/// [`drain_background_releases`].
pub struct SessionGuard {
    session: Option<Box<dyn RenderingSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn RenderingSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> Result<&mut (dyn RenderingSession + 'static), SessionError> {
        self.session.as_deref_mut().ok_or(SessionError::Closed)
    }

    /// Release the session. A guard that holds nothing is a no-op.
    pub async fn release(mut self) -> Result<(), SessionError> {
        match self.session.take() {
            Some(session) => {
                debug!(target: "safer.session", "releasing browser session");
                session.release().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        warn!(
            target: "safer.session",
            "session guard dropped without release; releasing in background"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                background_releases().spawn_on(
                    async move {
                        if let Err(e) = session.release().await {
                            warn!(target: "safer.session", error = %e, "background release failed");
                        }
                    },
                    &handle,
                );
            }
            Err(_) => {
                warn!(
                    target: "safer.session",
                    "no runtime available; browser session leaked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderingSession for CountingSession {
        async fn navigate(&mut self, _url: &Url) -> Result<(), SessionError> {
            Ok(())
        }
        async fn wait_for(&mut self, _: &str, _: Duration) -> Result<bool, SessionError> {
            Ok(true)
        }
        async fn wait_for_url(&mut self, _: &str, _: Duration) -> Result<bool, SessionError> {
            Ok(true)
        }
        async fn click_first(&mut self, _: &str) -> Result<bool, SessionError> {
            Ok(false)
        }
        async fn count(&self, _: &str) -> Result<usize, SessionError> {
            Ok(0)
        }
        async fn page_source(&self) -> Result<String, SessionError> {
            Ok(String::new())
        }
        async fn release(self: Box<Self>) -> Result<(), SessionError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn explicit_release_runs_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let guard = SessionGuard::new(Box::new(CountingSession {
            releases: releases.clone(),
        }));
        guard.release().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_guard_releases_in_background() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SessionGuard::new(Box::new(CountingSession {
                releases: releases.clone(),
            }));
            assert!(guard.session().is_ok());
        }
        assert!(drain_background_releases(Duration::from_secs(1)).await);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
