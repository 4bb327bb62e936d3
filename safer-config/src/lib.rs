//! Loader for lookup configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, with `SAFER__`-prefixed
//! environment variables layered on top (`SAFER__BROWSER__WEBDRIVER_URL`,
//! `SAFER__LOOKUP__SETTLE_MS`, ...). String values may reference other
//! environment variables as `${VAR}`; those are expanded after merging.
//! Every section is optional and falls back to the defaults below.
use config::{Config, Environment, File};
use safer_common::observability::LogFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SAFER";

/// Default query endpoint of the SAFER carrier snapshot search.
pub const DEFAULT_BASE_URL: &str = "https://safer.fmcsa.dot.gov/query.asp";
/// Path fragment identifying the "company snapshot" link on result pages.
pub const DEFAULT_SNAPSHOT_LINK_PATTERN: &str = "CompanySnapshot.aspx";

#[derive(Debug, Error)]
pub enum SaferConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaferConfig {
    pub browser: BrowserConfig,
    pub lookup: LookupConfig,
    pub logging: LoggingConfig,
}

/// How the WebDriver-backed browser session is launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Implicit per-element wait applied to every element query.
    pub implicit_wait_secs: u64,
    pub page_load_timeout_secs: u64,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            window_width: 1920,
            window_height: 1080,
            implicit_wait_secs: 10,
            page_load_timeout_secs: 30,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

/// Label matching strategy used by field extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatch {
    /// Case-insensitive substring match against the label cell text.
    #[default]
    Substring,
    /// Case-insensitive match against the whole label text, ignoring a trailing colon.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub snapshot_link_pattern: String,
    /// Upper bound of the settling wait after the initial page load.
    pub settle_ms: u64,
    /// Upper bound of the settling wait after following the snapshot link.
    pub follow_settle_ms: u64,
    pub poll_interval_ms: u64,
    pub label_match: LabelMatch,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            snapshot_link_pattern: DEFAULT_SNAPSHOT_LINK_PATTERN.into(),
            settle_ms: 3_000,
            follow_settle_ms: 2_000,
            poll_interval_ms: 250,
            label_match: LabelMatch::Substring,
        }
    }
}

impl LookupConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn follow_settle(&self) -> Duration {
        Duration::from_millis(self.follow_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
        }
    }
}

impl SaferConfig {
    /// Reject values that would make a lookup impossible.
    pub fn validate(&self) -> Result<(), SaferConfigError> {
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(SaferConfigError::Invalid {
                field: "browser.window_width/window_height",
                reason: "viewport dimensions must be non-zero".into(),
            });
        }
        Url::parse(&self.browser.webdriver_url).map_err(|e| SaferConfigError::Invalid {
            field: "browser.webdriver_url",
            reason: e.to_string(),
        })?;
        Url::parse(&self.lookup.base_url).map_err(|e| SaferConfigError::Invalid {
            field: "lookup.base_url",
            reason: e.to_string(),
        })?;
        if self.lookup.poll_interval_ms == 0 {
            return Err(SaferConfigError::Invalid {
                field: "lookup.poll_interval_ms",
                reason: "poll interval must be non-zero".into(),
            });
        }
        if self.lookup.snapshot_link_pattern.trim().is_empty() {
            return Err(SaferConfigError::Invalid {
                field: "lookup.snapshot_link_pattern",
                reason: "pattern must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring (files, inline YAML, env overrides).
pub struct SaferConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_overrides: bool,
}

impl Default for SaferConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SaferConfigLoader {
    /// Start with no sources; `SAFER__` env overrides are applied last on load.
    ///
    /// ```
    /// use safer_config::SaferConfigLoader;
    ///
    /// let config = SaferConfigLoader::new()
    ///     .with_yaml_str("browser:\n  headless: false")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(!config.browser.headless);
    /// assert_eq!(config.browser.implicit_wait_secs, 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_overrides: true,
        }
    }

    /// Skip `SAFER__` environment overrides (tests, reproducible runs).
    pub fn without_env(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is merged only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and validate.
    ///
    /// ```
    /// use safer_config::{LabelMatch, SaferConfigLoader};
    ///
    /// unsafe { std::env::set_var("DRIVER_HOST", "chromedriver.internal"); }
    ///
    /// let config = SaferConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(r#"
    /// browser:
    ///   webdriver_url: "http://${DRIVER_HOST}:4444"
    /// lookup:
    ///   label_match: exact
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.browser.webdriver_url, "http://chromedriver.internal:4444");
    /// assert_eq!(config.lookup.label_match, LabelMatch::Exact);
    /// assert_eq!(config.lookup.settle_ms, 3000);
    ///
    /// unsafe { std::env::remove_var("DRIVER_HOST"); }
    /// ```
    pub fn load(self) -> Result<SaferConfig, SaferConfigError> {
        let mut builder = self.builder;
        if self.env_overrides {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: SaferConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
