use safer_drivers::browser::error::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// The browser could not be launched. The only failure callers see.
    #[error("failed to start browser session: {0}")]
    SessionStart(#[source] SessionError),

    #[error("timed out looking up carrier {identifier}")]
    Timeout { identifier: String },

    #[error("no data tables found for carrier {identifier}")]
    NoDataFound { identifier: String },

    #[error("could not find any carrier data for {identifier}")]
    NoUsableData { identifier: String },

    #[error("error scraping carrier {identifier}: {source}")]
    Session {
        identifier: String,
        #[source]
        source: SessionError,
    },

    #[error("invalid lookup url: {0}")]
    Url(#[from] url::ParseError),
}

impl LookupError {
    /// Classify a session failure that happened while looking up `identifier`.
    pub fn from_session(identifier: &str, source: SessionError) -> Self {
        if source.is_timeout() {
            LookupError::Timeout {
                identifier: identifier.to_string(),
            }
        } else {
            LookupError::Session {
                identifier: identifier.to_string(),
                source,
            }
        }
    }
}
