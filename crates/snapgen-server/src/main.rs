//! `snapgen` binary: webhook server and one-shot replay.

use anyhow::Context;
use snapgen_server::cli::{command, Settings};
use snapgen_server::{replay, serve, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let matches = command().get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => {
            let settings = Settings::from_matches(args)?;
            telemetry::init(settings.log_format, settings.config.log_file.as_deref())?;

            serve(settings.config, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("replay", args)) => {
            let settings = Settings::from_matches(args)?;
            telemetry::init(settings.log_format, settings.config.log_file.as_deref())?;

            let payload = args
                .get_one::<PathBuf>("payload")
                .context("missing payload argument")?;
            let report = replay(&settings.config, payload).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        _ => Ok(ExitCode::FAILURE),
    }
}
