use fantoccini::error::{CmdError, ErrorStatus, NewSessionError};
use thiserror::Error;

/// Failures raised by a rendering session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser (or the WebDriver endpoint fronting it) could not be started.
    #[error("failed to start browser session: {0}")]
    Launch(String),

    /// A page load, script, or element wait exceeded its bound.
    #[error("browser operation timed out: {0}")]
    Timeout(String),

    /// Any other WebDriver command failure.
    #[error("browser command failed: {0}")]
    Command(String),

    /// The session was used after it had been released.
    #[error("browser session already released")]
    Closed,
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}

impl From<CmdError> for SessionError {
    fn from(err: CmdError) -> Self {
        match &err {
            CmdError::WaitTimeout => SessionError::Timeout(err.to_string()),
            CmdError::Standard(wd) if matches!(wd.error, ErrorStatus::Timeout) => {
                SessionError::Timeout(err.to_string())
            }
            CmdError::Standard(wd) if matches!(wd.error, ErrorStatus::ScriptTimeout) => {
                SessionError::Timeout(err.to_string())
            }
            _ => SessionError::Command(err.to_string()),
        }
    }
}

impl From<NewSessionError> for SessionError {
    fn from(err: NewSessionError) -> Self {
        SessionError::Launch(err.to_string())
    }
}
