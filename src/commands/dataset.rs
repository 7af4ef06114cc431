use std::fs;
use std::path::Path;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::error::{AppError, AppResult};
use crate::models::{AppState, CommandOutput};
use crate::services::export::export_to_csv;
use crate::services::{GenerationService, ProcessRequest, ProcessingEvent, RowRange, RunState, RunSummary};
use crate::utils::{available_placeholders, PromptTemplate};

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderReport {
    pub headers: Vec<String>,
    pub rows: usize,
    pub placeholders: Vec<String>,
    pub default_template: String,
}

pub fn placeholders(state: &mut AppState, input: &Path) -> AppResult<CommandOutput<PlaceholderReport>> {
    let table = state.load_table(input)?;

    Ok(CommandOutput::new(PlaceholderReport {
        headers: table.headers().to_vec(),
        rows: table.len(),
        placeholders: available_placeholders(table.headers()),
        default_template: PromptTemplate::default_for(table.headers()).text().to_string(),
    }))
}

/// Loads `args.input`, fills the target column and writes the table to `args.output`.
/// `run_id` is the key `GenerationService::cancel_run` accepts while the run is active.
/// The output file is written for completed, cancelled and aborted runs alike. An aborted
/// run is still reported as an error.
pub async fn process_csv(
    state: &mut AppState,
    generation_service: &GenerationService,
    args: &ProcessArgs,
    run_id: &str,
    cancel_token: CancellationToken,
) -> AppResult<CommandOutput<RunSummary>> {
    let table = state.load_table(&args.input)?;
    let request = ProcessRequest {
        run_id: run_id.to_string(),
        model: args.model.clone(),
        template: resolve_template(args, table.headers())?,
        target_column: args.column.clone(),
        range: RowRange::new(
            args.start.unwrap_or(0),
            args.end.unwrap_or(table.len().saturating_sub(1)),
            table.len(),
        )?,
        options: args.sampling.to_options(),
    };

    let table = state.table_mut()?;
    let mut preview = String::new();
    let report = generation_service
        .process(table, &request, cancel_token, |event| match event {
            ProcessingEvent::Started { run_id, total_rows } => {
                info!(%run_id, total_rows, template = request.template.text(), "processing rows");
            }
            ProcessingEvent::Fragment { text, .. } => preview = text,
            ProcessingEvent::RowCompleted { row_index, failed, .. } => {
                if failed {
                    warn!(row_index, "row failed, output cell marked");
                } else {
                    info!(row_index, output = %truncate(&preview), "row done");
                }
                preview.clear();
            }
        })
        .await?;

    export_to_csv(table, &args.output)?;
    info!(path = %args.output.display(), "results written");

    let summary = report.summary();
    let final_state = report.state.clone();
    state.record_run(&args.column, report);

    match final_state {
        RunState::Aborted(reason) => Err(AppError::Aborted(reason.to_string())),
        _ => Ok(CommandOutput::new(summary).with_message(format!("Results written to {}", args.output.display()))),
    }
}

fn resolve_template(args: &ProcessArgs, headers: &[String]) -> AppResult<PromptTemplate> {
    let text = match (&args.template, &args.template_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)?.trim_end_matches(['\r', '\n']).to_string(),
        (None, None) => return Ok(PromptTemplate::default_for(headers)),
    };

    if text.trim().is_empty() {
        return Err(AppError::Validation("Prompt template cannot be empty".to_string()));
    }

    Ok(PromptTemplate::new(text, args.mode.into()))
}

fn truncate(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS || line.len() < text.len() {
        let head: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}
