#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use safer_common::observability::{LogConfig, LogFormat};
use safer_drivers::browser::error::SessionError;
use safer_drivers::browser::session::{RenderingSession, SessionLauncher};
use scraper::{Html, Selector};
use url::Url;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "safer-tests",
            log_dir: Some(std::env::temp_dir().join("safer-tests")),
            emit_stderr: true,
            format: if std::env::var("SAFER_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "safer=debug".to_string(),
        };

        safer_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Fault injected into the canned session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    LaunchFails,
    NavigateFails,
    NavigateTimesOut,
    /// Navigation never completes.
    NavigateHangs,
    ClickFails,
    /// The click is accepted but the browser stays on the current page.
    ClickGoesNowhere,
}

/// Serves canned HTML instead of driving a browser.
///
/// Any navigation lands on `landing`; clicking a link loads the page
/// registered under its `href`.
#[derive(Clone)]
pub struct CannedLauncher {
    landing: String,
    pages: Arc<HashMap<String, String>>,
    fault: Fault,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub visited: Arc<Mutex<Vec<String>>>,
    pub waits: Arc<Mutex<Vec<String>>>,
}

impl CannedLauncher {
    pub fn new(landing: &str) -> Self {
        Self {
            landing: landing.to_string(),
            pages: Arc::new(HashMap::new()),
            fault: Fault::None,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            visited: Arc::new(Mutex::new(Vec::new())),
            waits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_page(mut self, href: &str, html: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(href.to_string(), html.to_string());
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    /// Conditions waited on, in order: selectors as-is, URL fragments as `url:<fragment>`.
    pub fn waits(&self) -> Vec<String> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for CannedLauncher {
    async fn acquire(&self) -> Result<Box<dyn RenderingSession>, SessionError> {
        if self.fault == Fault::LaunchFails {
            return Err(SessionError::Launch("chromedriver not reachable".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CannedSession {
            launcher: self.clone(),
            url: String::new(),
            current: String::new(),
        }))
    }
}

struct CannedSession {
    launcher: CannedLauncher,
    url: String,
    current: String,
}

fn count_matches(html: &str, selector: &str) -> usize {
    let document = Html::parse_document(html);
    match Selector::parse(selector) {
        Ok(sel) => document.select(&sel).count(),
        Err(_) => 0,
    }
}

fn first_href(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

#[async_trait]
impl RenderingSession for CannedSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), SessionError> {
        self.launcher.visited.lock().unwrap().push(url.to_string());
        match self.launcher.fault {
            Fault::NavigateFails => Err(SessionError::Command("net::ERR_CONNECTION_RESET".into())),
            Fault::NavigateTimesOut => Err(SessionError::Timeout("page load".into())),
            Fault::NavigateHangs => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => {
                self.url = url.to_string();
                self.current = self.launcher.landing.clone();
                Ok(())
            }
        }
    }

    async fn wait_for(&mut self, selector: &str, _within: Duration) -> Result<bool, SessionError> {
        self.launcher.waits.lock().unwrap().push(selector.to_string());
        Ok(count_matches(&self.current, selector) > 0)
    }

    async fn wait_for_url(
        &mut self,
        fragment: &str,
        _within: Duration,
    ) -> Result<bool, SessionError> {
        self.launcher
            .waits
            .lock()
            .unwrap()
            .push(format!("url:{fragment}"));
        Ok(self.url.contains(fragment))
    }

    async fn click_first(&mut self, selector: &str) -> Result<bool, SessionError> {
        if self.launcher.fault == Fault::ClickFails {
            return Err(SessionError::Command("element click intercepted".into()));
        }
        let Some(href) = first_href(&self.current, selector) else {
            return Ok(false);
        };
        if self.launcher.fault == Fault::ClickGoesNowhere {
            return Ok(true);
        }
        self.launcher.visited.lock().unwrap().push(href.clone());
        self.url = href.clone();
        self.current = self
            .launcher
            .pages
            .get(&href)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string());
        Ok(true)
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        Ok(count_matches(&self.current, selector))
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        Ok(self.current.clone())
    }

    async fn release(self: Box<Self>) -> Result<(), SessionError> {
        self.launcher.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
