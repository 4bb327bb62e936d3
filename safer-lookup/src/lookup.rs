use crate::error::LookupError;
use crate::extract::extract_record;
use crate::labels::{LabelLookup, label_lookup_for};
use crate::record::CarrierRecord;
use safer_config::{BrowserConfig, LookupConfig, SaferConfig};
use safer_drivers::browser::driver::WebDriverLauncher;
use safer_drivers::browser::error::SessionError;
use safer_drivers::browser::session::{RenderingSession, SessionGuard, SessionLauncher};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Why a lookup produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absence {
    /// Blank identifier; no browser was started.
    InvalidIdentifier,
    /// The page rendered no table at all.
    NoDataFound,
    /// Tables were present but named no carrier.
    NoUsableData,
    Timeout,
    /// Any other failure while driving the page.
    Fault(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(CarrierRecord),
    Absent(Absence),
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }

    pub fn into_record(self) -> Option<CarrierRecord> {
        match self {
            LookupOutcome::Found(record) => Some(record),
            LookupOutcome::Absent(_) => None,
        }
    }
}

/// Looks up carrier snapshots, one browser session per call.
pub struct CarrierScraper<L = WebDriverLauncher> {
    launcher: L,
    config: LookupConfig,
    labels: Box<dyn LabelLookup>,
}

impl CarrierScraper<WebDriverLauncher> {
    /// Scraper with default settings whose element queries wait up to
    /// `timeout_secs` before giving up.
    pub fn new(timeout_secs: u64) -> Self {
        let config = SaferConfig {
            browser: BrowserConfig {
                implicit_wait_secs: timeout_secs,
                ..BrowserConfig::default()
            },
            ..SaferConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &SaferConfig) -> Self {
        let launcher =
            WebDriverLauncher::new(config.browser.clone(), config.lookup.poll_interval());
        Self::with_launcher(launcher, config.lookup.clone())
    }
}

impl<L: SessionLauncher> CarrierScraper<L> {
    pub fn with_launcher(launcher: L, config: LookupConfig) -> Self {
        let labels = label_lookup_for(config.label_match);
        Self {
            launcher,
            config,
            labels,
        }
    }

    /// Replace the label matching strategy.
    pub fn with_label_lookup(mut self, labels: Box<dyn LabelLookup>) -> Self {
        self.labels = labels;
        self
    }

    /// Fetch the carrier registered under `identifier`.
    ///
    /// `Ok(None)` covers every way the registry can fail to yield a record
    /// (missing tables, timeouts, page faults); only a browser that cannot be
    /// started is an error.
    pub async fn extract_carrier_data(
        &self,
        identifier: &str,
    ) -> Result<Option<CarrierRecord>, LookupError> {
        Ok(self.lookup(identifier).await?.into_record())
    }

    /// Like [`CarrierScraper::extract_carrier_data`] but reports why nothing was found.
    pub async fn lookup(&self, identifier: &str) -> Result<LookupOutcome, LookupError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            warn!(target: "safer.lookup", "refusing lookup with empty identifier");
            return Ok(LookupOutcome::Absent(Absence::InvalidIdentifier));
        }

        let session = self
            .launcher
            .acquire()
            .await
            .map_err(LookupError::SessionStart)?;
        let mut guard = SessionGuard::new(session);

        let result = match guard.session() {
            Ok(session) => self.scrape(session, identifier).await,
            Err(e) => Err(LookupError::from_session(identifier, e)),
        };

        if let Err(e) = guard.release().await {
            warn!(target: "safer.lookup", %identifier, error = %e, "failed to release browser session");
        }

        Ok(settle(identifier, result))
    }

    async fn scrape(
        &self,
        session: &mut dyn RenderingSession,
        identifier: &str,
    ) -> Result<CarrierRecord, LookupError> {
        let url = build_lookup_url(&self.config.base_url, identifier)?;
        let failed = |e: SessionError| LookupError::from_session(identifier, e);

        session.navigate(&url).await.map_err(failed)?;

        let link_selector = snapshot_link_selector(&self.config.snapshot_link_pattern);
        let settled = session
            .wait_for(&format!("table, {link_selector}"), self.config.settle())
            .await
            .map_err(failed)?;
        debug!(target: "safer.lookup", %identifier, settled, "search page loaded");

        match session.click_first(&link_selector).await {
            Ok(true) => {
                // Arrival is the URL change; search-page tables do not count.
                let started = Instant::now();
                let bound = self.config.follow_settle();
                let arrived = session
                    .wait_for_url(&self.config.snapshot_link_pattern, bound)
                    .await
                    .map_err(failed)?;
                let settled = arrived
                    && session
                        .wait_for("table", bound.saturating_sub(started.elapsed()))
                        .await
                        .map_err(failed)?;
                debug!(target: "safer.lookup", %identifier, arrived, settled, "followed company snapshot link");
            }
            Ok(false) => debug!(target: "safer.lookup", "no company link to click"),
            Err(e) => debug!(target: "safer.lookup", error = %e, "no company link to click"),
        }

        if session.count("table").await.map_err(failed)? == 0 {
            return Err(LookupError::NoDataFound {
                identifier: identifier.to_string(),
            });
        }

        let html = session.page_source().await.map_err(failed)?;
        debug!(target: "safer.extract", page = %snippet(&html, 200), "page source");

        extract_record(&html, identifier, self.labels.as_ref()).inspect_err(|_| {
            debug!(target: "safer.extract", page = %snippet(&html, 500), "page source at error");
        })
    }
}

fn settle(identifier: &str, result: Result<CarrierRecord, LookupError>) -> LookupOutcome {
    match result {
        Ok(record) => {
            info!(target: "safer.lookup", %identifier, "carrier record extracted");
            LookupOutcome::Found(record)
        }
        Err(LookupError::Timeout { .. }) => {
            error!(target: "safer.lookup", %identifier, "timeout extracting carrier");
            LookupOutcome::Absent(Absence::Timeout)
        }
        Err(LookupError::NoDataFound { .. }) => {
            error!(target: "safer.lookup", %identifier, "no data tables found");
            LookupOutcome::Absent(Absence::NoDataFound)
        }
        Err(LookupError::NoUsableData { .. }) => {
            error!(target: "safer.lookup", %identifier, "could not find any carrier data");
            LookupOutcome::Absent(Absence::NoUsableData)
        }
        Err(other) => {
            error!(target: "safer.lookup", %identifier, error = %other, "error scraping carrier");
            LookupOutcome::Absent(Absence::Fault(other.to_string()))
        }
    }
}

/// Carrier snapshot search URL for an MC number.
pub fn build_lookup_url(base: &str, identifier: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("searchtype", "MC")
        .append_pair("query_type", "queryCarrierSnapshot")
        .append_pair("query_param", "MC_MX")
        .append_pair("query_string", identifier);
    Ok(url)
}

/// CSS selector for anchors whose target contains `pattern`.
pub fn snapshot_link_selector(pattern: &str) -> String {
    format!("a[href*=\"{}\"]", pattern.replace('"', "\\\""))
}

fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_url_embeds_identifier() {
        let url = build_lookup_url(safer_config::DEFAULT_BASE_URL, "720604").unwrap();
        assert_eq!(
            url.as_str(),
            "https://safer.fmcsa.dot.gov/query.asp?searchtype=MC&query_type=queryCarrierSnapshot&query_param=MC_MX&query_string=720604"
        );
    }

    #[test]
    fn lookup_url_encodes_identifier_and_replaces_existing_query() {
        let url = build_lookup_url("https://example.test/query.asp?stale=1", "12 34&x").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(!pairs.iter().any(|(k, _)| k == "stale"));
        assert_eq!(
            pairs.last(),
            Some(&("query_string".to_string(), "12 34&x".to_string()))
        );
    }

    #[test]
    fn link_selector_matches_on_href_fragment() {
        assert_eq!(
            snapshot_link_selector("CompanySnapshot.aspx"),
            r#"a[href*="CompanySnapshot.aspx"]"#
        );
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("héllo", 2), "hé");
        assert_eq!(snippet("abc", 10), "abc");
    }
}
