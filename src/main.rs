//! Runs a connected board through the factory hardware checks.
//!
//! Usage:
//! ```bash
//! factory-harness --simulate --assume-yes
//! factory-harness --config bench.toml --simulate
//! ```
//!
//! Exit status is 0 when every check that ran passed, 1 when a check failed,
//! and 2 when the run could not complete. A run interrupted with Ctrl-C keeps
//! the status of the checks that finished before it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use factory_harness::{
    config::{HarnessConfig, DEFAULT_CONFIG_PATH},
    device::{
        mock::{MockDevice, PressTiming},
        DeviceSession,
    },
    error::{AppResult, HarnessError},
    logging,
    operator::{AutoConfirmOperator, ConsoleOperator, Operator},
    testing::{Suite, SuiteOutcome},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "factory-harness",
    version,
    about = "Runs a connected board through a series of hardware tests"
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run against a simulated board that presses its own buttons
    #[arg(long)]
    simulate: bool,

    /// Accept the default answer to every operator question
    #[arg(long)]
    assume_yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = HarnessConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let log_path = logging::init_from_config(&config).context("Failed to set up logging")?;
    info!(config = ?config, "Configuration loaded");

    let operator: Arc<dyn Operator> = if cli.assume_yes {
        Arc::new(AutoConfirmOperator)
    } else {
        Arc::new(ConsoleOperator)
    };

    let session = connect(&cli)?;
    let info = session
        .device_info()
        .await
        .map_err(HarnessError::Device)
        .context("Failed to read device info")?;
    info!(flash_id = %format!("{:#018x}", info.flash_id), "Connected to attached device");
    operator.say(&format!(
        "Connected to attached device (flash id {:#018x})",
        info.flash_id
    ));

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let mut suite = Suite::factory(session, Arc::clone(&operator), &config);
    let outcome = suite.run_until(shutdown).await;
    if let Err(err) = &outcome {
        error!(error = %err, "Suite aborted");
        operator.say(&format!("Suite aborted: {err}"));
    }
    let code = exit_code(&outcome);

    let log_path = log_path.canonicalize().unwrap_or(log_path);
    operator.say(&format!("Device logs written to {}", log_path.display()));
    Ok(ExitCode::from(code))
}

/// Process exit status for a suite run.
fn exit_code(outcome: &AppResult<SuiteOutcome>) -> u8 {
    match outcome {
        Ok(outcome) if outcome.report().all_passed() => 0,
        Ok(_) => 1,
        Err(_) => 2,
    }
}

/// Open the device session.
fn connect(cli: &Cli) -> Result<Arc<dyn DeviceSession>> {
    if !cli.simulate {
        bail!(
            "No device transport is built in; run with --simulate \
             or embed the harness with your own DeviceSession"
        );
    }
    info!("Using simulated device");
    Ok(Arc::new(MockDevice::simulated(PressTiming::default())))
}
