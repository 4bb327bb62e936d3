use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use safer_common::observability::LogConfig;
use safer_config::{LoggingConfig, SaferConfig, SaferConfigLoader};
use std::path::PathBuf;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "safer.yaml";

#[derive(Debug, Parser)]
#[command(
    name = "safer",
    version,
    about = "Look up carrier snapshots on the FMCSA SAFER registry"
)]
pub struct Cli {
    /// Configuration file (YAML/TOML/JSON).
    #[arg(long, global = true, env = "SAFER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mirror debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up one carrier by MC number; exits 1 when nothing is found.
    Lookup(LookupArgs),
    /// Print the resolved configuration.
    CheckConfig,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// MC number to look up.
    #[arg(default_value = "720604")]
    pub mc_number: String,

    /// WebDriver endpoint, e.g. http://localhost:9515.
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    pub headed: bool,

    /// Implicit element wait in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Abort the whole lookup after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Pretty-print the JSON record.
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<SaferConfig> {
        let loader = SaferConfigLoader::new();
        let loader = match &self.config {
            Some(path) => loader.with_file(path),
            None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
        };
        loader.load().context("failed to load configuration")
    }
}

impl LookupArgs {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply(&self, config: &mut SaferConfig) -> Result<()> {
        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = url.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(secs) = self.timeout_secs {
            config.browser.implicit_wait_secs = secs;
        }
        config.validate().context("invalid command-line override")?;
        Ok(())
    }
}

pub fn log_config(logging: &LoggingConfig, verbose: bool) -> LogConfig {
    LogConfig {
        app_name: "safer",
        log_dir: logging.dir.clone(),
        emit_stderr: logging.stderr || verbose,
        format: logging.format,
        default_filter: if verbose {
            "debug".to_string()
        } else {
            logging.filter.clone()
        },
    }
}
