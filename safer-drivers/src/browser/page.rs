use crate::browser::{error::SessionError, session::RenderingSession};
use async_trait::async_trait;
use fantoccini::{error::CmdError, Client, Locator};
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::debug;
use url::Url;

/// [`RenderingSession`] backed by a `fantoccini` WebDriver client.
pub struct WebDriverSession {
    client: Client,
    poll_interval: Duration,
}

impl WebDriverSession {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

/// An elapsed wait is a result, not a failure.
fn wait_outcome<T>(found: Result<T, CmdError>) -> Result<bool, SessionError> {
    match found {
        Ok(_) => Ok(true),
        Err(CmdError::WaitTimeout) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RenderingSession for WebDriverSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), SessionError> {
        debug!(target: "safer.session", %url, "navigating");
        self.client.goto(url.as_str()).await?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, within: Duration) -> Result<bool, SessionError> {
        let found = self
            .client
            .wait()
            .at_most(within)
            .every(self.poll_interval)
            .for_element(Locator::Css(selector))
            .await;
        let settled = wait_outcome(found)?;
        if !settled {
            debug!(target: "safer.session", %selector, "settling bound elapsed");
        }
        Ok(settled)
    }

    async fn wait_for_url(
        &mut self,
        fragment: &str,
        within: Duration,
    ) -> Result<bool, SessionError> {
        let mut ticks = interval(self.poll_interval.max(Duration::from_millis(10)));
        let reached = timeout(within, async {
            loop {
                ticks.tick().await;
                let url = self.client.current_url().await?;
                if url.as_str().contains(fragment) {
                    return Ok::<_, SessionError>(());
                }
            }
        })
        .await;
        match reached {
            Ok(done) => done.map(|()| true),
            Err(_) => {
                debug!(target: "safer.session", %fragment, "navigation bound elapsed");
                Ok(false)
            }
        }
    }

    async fn click_first(&mut self, selector: &str) -> Result<bool, SessionError> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        match elements.first() {
            Some(element) => {
                element.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        Ok(elements.len())
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        Ok(self.client.source().await?)
    }

    async fn release(self: Box<Self>) -> Result<(), SessionError> {
        self.client.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_wait_is_not_an_error() {
        assert!(wait_outcome(Ok(())).unwrap());
        assert!(!wait_outcome::<()>(Err(CmdError::WaitTimeout)).unwrap());
    }

    #[test]
    fn other_wait_failures_propagate() {
        let err = wait_outcome::<()>(Err(CmdError::NotJson("<html>".into()))).unwrap_err();
        assert!(matches!(err, SessionError::Command(_)));
    }
}
