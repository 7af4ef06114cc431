mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::AppResult;
use crate::models::{AppState, CommandOutput};
use crate::services::{GenerationClient, GenerationService, ModelService};

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if json {
                if let Ok(body) = serde_json::to_string(&e) {
                    println!("{}", body);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> AppResult<()> {
    let config = cli.client_config();
    let json = cli.json;

    match cli.command {
        Commands::Models => {
            let model_service = ModelService::new(config)?;
            let output = commands::model::list_models(&model_service).await?;
            emit(&output, json, |models| {
                for name in models {
                    println!("{}", name);
                }
            })
        }
        Commands::Placeholders { input } => {
            let mut state = AppState::new(config);
            let output = commands::dataset::placeholders(&mut state, &input)?;
            emit(&output, json, |report| {
                println!("Columns: {}", report.headers.join(", "));
                println!("Rows: {}", report.rows);
                println!("Placeholders: {}", report.placeholders.join(" "));
                println!("Default template: {}", report.default_template);
            })
        }
        Commands::Process(args) => {
            let client = GenerationClient::new(config.clone(), args.wire_format())?;
            let model_service = ModelService::new(config.clone())?;
            let generation_service = GenerationService::new(client, model_service);
            let mut state = AppState::new(config);

            let run_id = GenerationService::new_run_id();
            let cancel_token = CancellationToken::new();
            let interrupt = cancel_on_interrupt(generation_service.clone(), run_id.clone(), cancel_token.clone());
            let result =
                commands::dataset::process_csv(&mut state, &generation_service, &args, &run_id, cancel_token).await;
            interrupt.abort();

            let output = result?;
            emit(&output, json, |summary| {
                println!(
                    "{}: {} rows processed, {} failed, {:.1}s",
                    summary.status, summary.rows_completed, summary.rows_failed, summary.elapsed_secs
                );
                if let Some(message) = &summary.message {
                    println!("{}", message);
                }
            })
        }
    }
}

/// First Ctrl-C stops the run after the current row; a second one exits immediately.
/// Before the run is registered (CSV still loading) the token is cancelled directly.
fn cancel_on_interrupt(
    generation_service: GenerationService,
    run_id: String,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, stopping after the current row (press Ctrl-C again to quit)");
        if let Err(e) = generation_service.cancel_run(&run_id) {
            debug!(%run_id, error = %e, "run not registered, cancelling token");
            cancel_token.cancel();
        }

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    })
}

fn emit<T: Serialize>(output: &CommandOutput<T>, json: bool, render: impl FnOnce(&T)) -> AppResult<()> {
    if json {
        println!("{}", output.to_json()?);
        return Ok(());
    }

    render(&output.data);
    if let Some(message) = &output.message {
        println!("{}", message);
    }
    Ok(())
}
