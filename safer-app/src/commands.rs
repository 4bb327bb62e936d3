use crate::cli::LookupArgs;
use anyhow::{Context, Result};
use safer_config::SaferConfig;
use safer_drivers::browser::session::drain_background_releases;
use safer_lookup::{Absence, CarrierScraper, LookupOutcome};
use safer_runtime::{RuntimeError, SaferRuntime};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// Time given to a browser session released in the background (cancelled or
/// timed-out lookups) before the runtime goes away.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub fn lookup(mut config: SaferConfig, args: LookupArgs) -> Result<ExitCode> {
    args.apply(&mut config)?;

    let runtime = SaferRuntime::build().context("failed to start runtime")?;
    let cancel = runtime.cancellation();
    let scraper = CarrierScraper::from_config(&config);
    let deadline = args.deadline_secs.map(Duration::from_secs);
    let mc_number = args.mc_number.clone();

    info!(target: "safer.app", %mc_number, "looking up carrier");
    let result = runtime.block_on_with_deadline(
        async move {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            scraper.lookup(&mc_number).await
        },
        deadline,
    );
    if !runtime.block_on(drain_background_releases(SHUTDOWN_GRACE)) {
        warn!(target: "safer.app", "browser session still releasing at shutdown");
    }
    runtime.shutdown(SHUTDOWN_GRACE);

    let outcome = match result {
        Ok(outcome) => outcome?,
        Err(RuntimeError::DeadlineElapsed(limit)) => {
            warn!(target: "safer.app", ?limit, "lookup deadline elapsed");
            eprintln!("lookup of MC {} exceeded {limit:?}", args.mc_number);
            return Ok(ExitCode::FAILURE);
        }
        Err(RuntimeError::Cancelled) => {
            eprintln!("lookup of MC {} cancelled", args.mc_number);
            return Ok(ExitCode::FAILURE);
        }
        Err(other) => return Err(other.into()),
    };

    match outcome {
        LookupOutcome::Found(record) => {
            let rendered = if args.pretty {
                serde_json::to_string_pretty(&record)?
            } else {
                serde_json::to_string(&record)?
            };
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        LookupOutcome::Absent(absence) => {
            eprintln!("no record for MC {}: {}", args.mc_number, describe(&absence));
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn check_config(config: &SaferConfig) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

fn describe(absence: &Absence) -> String {
    match absence {
        Absence::InvalidIdentifier => "identifier is blank".into(),
        Absence::NoDataFound => "no data tables on the result page".into(),
        Absence::NoUsableData => "result page names no carrier".into(),
        Absence::Timeout => "timed out".into(),
        Absence::Fault(message) => message.clone(),
    }
}
