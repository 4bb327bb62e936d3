//! `tracing` setup shared by the `safer` binary and integration tests.
//!
//! Events go to a daily rolling `<app_name>.log` and, when asked, to
//! `stderr` in the same encoding. The subscriber is global, so only the first
//! [`init_logging`] call installs anything.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Overrides the log directory when [`LogConfig::log_dir`] is unset.
pub const LOG_DIR_ENV: &str = "SAFER_LOG_DIR";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn file_layer(self, writer: NonBlocking) -> BoxedLayer {
        match self {
            LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        }
    }

    fn stderr_layer(self) -> BoxedLayer {
        match self {
            LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the default directory.
    pub app_name: &'static str,
    pub log_dir: Option<PathBuf>,
    /// Mirror events to `stderr`.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "safer",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// `log_dir`, else `$SAFER_LOG_DIR`, else `~/.local/share/<app_name>`,
    /// with a leading `~` expanded.
    pub fn resolved_dir(&self) -> PathBuf {
        let raw = match (&self.log_dir, std::env::var(LOG_DIR_ENV)) {
            (Some(dir), _) => dir.to_string_lossy().into_owned(),
            (None, Ok(from_env)) => from_env,
            (None, Err(_)) => format!("~/.local/share/{}", self.app_name),
        };
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = config.resolved_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_name = format!("{}.log", config.app_name);
    let today_path = dir.join(format!("{file_name}.{}", Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_name));
    let _ = LOG_GUARD.set(guard);

    let mut layers = vec![config.format.file_layer(writer)];
    if config.emit_stderr {
        layers.push(config.format.stderr_layer());
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(today_path.clone());
    Ok(today_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config_with_dir(dir: Option<&str>) -> LogConfig {
        LogConfig {
            log_dir: dir.map(PathBuf::from),
            ..LogConfig::default()
        }
    }

    #[test]
    #[serial]
    fn explicit_dir_wins_over_env() {
        temp_env::with_var(LOG_DIR_ENV, Some("/tmp/from-env"), || {
            assert_eq!(
                config_with_dir(Some("/var/log/safer")).resolved_dir(),
                PathBuf::from("/var/log/safer")
            );
        });
    }

    #[test]
    #[serial]
    fn env_dir_used_when_no_explicit_dir() {
        temp_env::with_var(LOG_DIR_ENV, Some("/tmp/from-env"), || {
            assert_eq!(
                config_with_dir(None).resolved_dir(),
                PathBuf::from("/tmp/from-env")
            );
        });
    }

    #[test]
    #[serial]
    fn falls_back_to_home_data_dir() {
        temp_env::with_vars(
            [(LOG_DIR_ENV, None), ("HOME", Some("/home/tester"))],
            || {
                assert_eq!(
                    config_with_dir(None).resolved_dir(),
                    PathBuf::from("/home/tester/.local/share/safer")
                );
            },
        );
    }

    #[test]
    #[serial]
    fn tilde_is_expanded() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(
                config_with_dir(Some("~/logs")).resolved_dir(),
                PathBuf::from("/home/tester/logs")
            );
        });
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
