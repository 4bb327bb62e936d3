use crate::browser::{
    error::SessionError,
    launch::build_capabilities,
    page::WebDriverSession,
    session::{RenderingSession, SessionLauncher},
};
use async_trait::async_trait;
use fantoccini::{wd::TimeoutConfiguration, ClientBuilder};
use safer_config::BrowserConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Starts one browser per [`SessionLauncher::acquire`] through a running
/// WebDriver service (Chromedriver by default at `http://localhost:9515`).
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    config: BrowserConfig,
    poll_interval: Duration,
}

impl WebDriverLauncher {
    pub fn new(config: BrowserConfig, poll_interval: Duration) -> Self {
        Self {
            config,
            poll_interval,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn acquire(&self) -> Result<Box<dyn RenderingSession>, SessionError> {
        let caps = build_capabilities(&self.config);
        debug!(
            target: "safer.session",
            webdriver = %self.config.webdriver_url,
            headless = self.config.headless,
            "starting browser session"
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.config.webdriver_url)
            .await?;

        let timeouts = TimeoutConfiguration::new(
            None,
            Some(self.config.page_load_timeout()),
            Some(self.config.implicit_wait()),
        );
        let configured = client.update_timeouts(timeouts).await;
        if let Err(e) = configured {
            // The browser is already running; tear it down before bailing.
            let _ = client.close().await;
            return Err(SessionError::Launch(format!(
                "failed to configure session timeouts: {e}"
            )));
        }

        info!(
            target: "safer.session",
            implicit_wait_secs = self.config.implicit_wait_secs,
            "browser session ready"
        );
        Ok(Box::new(WebDriverSession::new(client, self.poll_interval)))
    }
}
