//! dqship binary entry point

use std::process::ExitCode;

use dqship_cli::cli::{command, Tuning};
use dqship_cli::config::{debug_enabled, Config};
use dqship_cli::signals::{cancel_on_interrupt, stop_interrupt_handler};
use dqship_cli::telemetry::init_telemetry;
use dqship_cli::{run_and_clean_up, WorkPaths};
use dqship_client::{CancellationToken, S3Store, Uploader};
use dqship_core::UploadReport;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = command().get_matches();
    let tuning = Tuning::from_matches(&matches);

    let debug = debug_enabled(std::env::var("DEBUG").ok().as_deref());
    if let Err(err) = init_telemetry(tuning.log_format, debug) {
        eprintln!("failed to initialise logging: {:#}", err);
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    let interrupts = cancel_on_interrupt(cancel.clone());

    let outcome = run(&tuning, &cancel).await;

    stop_interrupt_handler(&cancel, interrupts).await;

    match outcome {
        Ok(report) => {
            if tuning.summary_json {
                match serde_json::to_string(&report) {
                    Ok(json) => println!("{}", json),
                    Err(err) => error!(error = %err, "Failed to encode upload report"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(tuning: &Tuning, cancel: &CancellationToken) -> anyhow::Result<UploadReport> {
    let config = Config::from_env(tuning)?;
    info!(
        bucket = %config.destination.bucket,
        key = %config.destination.key,
        region = %config.region,
        "Backing up dqlite"
    );

    let store = S3Store::connect(&config.s3()).await;
    let uploader = Uploader::new(store, config.upload.clone());
    let paths = WorkPaths::new(&std::env::temp_dir(), &config.destination.key);

    run_and_clean_up(&config, &uploader, &paths, cancel).await
}
