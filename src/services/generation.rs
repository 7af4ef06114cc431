use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::GenerationOptions;
use crate::services::client::{GenerationClient, GenerationError};
use crate::services::dataset::{RowRange, Table};
use crate::services::model::{ModelError, ModelService};
use crate::utils::{ProgressTracker, ProgressUpdate, PromptTemplate, TemplateError};

pub const FAILED_OUTPUT: &str = "Failed to generate output";

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Problems that stop a run before it starts. The table is left untouched.
#[derive(Debug)]
pub enum ProcessError {
    Model(ModelError),
    InvalidInput(String),
    Internal(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Model(err) => write!(f, "{}", err),
            ProcessError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ProcessError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<ModelError> for ProcessError {
    fn from(err: ModelError) -> Self {
        ProcessError::Model(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    Template(TemplateError),
    Unexpected(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Template(err) => write!(f, "Error in prompt template: {}. Check your column references.", err),
            AbortReason::Unexpected(msg) => write!(f, "Unexpected error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Aborted(AbortReason),
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::Aborted(_) => "aborted",
        }
    }
}

/// Everything a run needs, validated against the table by `GenerationService::process`.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Key in the run registry, usually from `GenerationService::new_run_id`.
    pub run_id: String,
    pub model: String,
    pub template: PromptTemplate,
    pub target_column: String,
    pub range: RowRange,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingEvent {
    Started {
        run_id: String,
        total_rows: usize,
    },
    /// Accumulated text of the row being generated, sent after every fragment.
    Fragment {
        row_index: usize,
        text: String,
    },
    RowCompleted {
        row_index: usize,
        failed: bool,
        progress: ProgressUpdate,
    },
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub status: String,
    pub message: Option<String>,
    pub rows_completed: usize,
    pub rows_failed: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub state: RunState,
    pub rows_completed: usize,
    pub rows_failed: usize,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let message = match &self.state {
            RunState::Completed => Some("All rows processed".to_string()),
            RunState::Cancelled => Some("Processing stopped by user".to_string()),
            RunState::Aborted(reason) => Some(reason.to_string()),
            RunState::Idle | RunState::Running => None,
        };

        RunSummary {
            run_id: self.run_id.clone(),
            status: self.state.as_str().to_string(),
            message,
            rows_completed: self.rows_completed,
            rows_failed: self.rows_failed,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

enum RowOutcome {
    Generated,
    Failed,
}

#[derive(Clone)]
pub struct GenerationService {
    pub client: GenerationClient,
    pub model_service: ModelService,
    active_runs: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl GenerationService {
    pub fn new(client: GenerationClient, model_service: ModelService) -> Self {
        Self {
            client,
            model_service,
            active_runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn new_run_id() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!("run_{}_{}", millis, RUN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register_run(&self, run_id: &str, cancel_token: CancellationToken) {
        if let Ok(mut active_runs) = self.active_runs.lock() {
            active_runs.insert(run_id.to_string(), cancel_token);
        }
    }

    pub fn unregister_run(&self, run_id: &str) {
        if let Ok(mut active_runs) = self.active_runs.lock() {
            active_runs.remove(run_id);
        }
    }

    /// Requests a stop; the run notices at its next row boundary. A run is registered from
    /// the start of `process`, pre-flight included, until it returns.
    pub fn cancel_run(&self, run_id: &str) -> Result<(), ProcessError> {
        let active_runs = self
            .active_runs
            .lock()
            .map_err(|e| ProcessError::Internal(format!("Failed to lock run registry: {}", e)))?;

        match active_runs.get(run_id) {
            Some(cancel_token) => {
                cancel_token.cancel();
                Ok(())
            }
            None => Err(ProcessError::InvalidInput(format!(
                "Run {} not found or already completed",
                run_id
            ))),
        }
    }

    /// Runs the template over `request.range`, writing model output into
    /// `request.target_column`. Pre-flight failures return `Err` before any row is
    /// touched; everything after that is reported through the returned `RunState`.
    pub async fn process(
        &self,
        table: &mut Table,
        request: &ProcessRequest,
        cancel_token: CancellationToken,
        mut on_event: impl FnMut(ProcessingEvent),
    ) -> Result<RunReport, ProcessError> {
        if request.range.end() >= table.len() {
            return Err(ProcessError::InvalidInput(format!(
                "Row range ends at {} but the table has {} rows",
                request.range.end(),
                table.len()
            )));
        }
        if request.target_column.trim().is_empty() {
            return Err(ProcessError::InvalidInput("Column name cannot be empty".to_string()));
        }

        let run_id = request.run_id.as_str();
        self.register_run(run_id, cancel_token.clone());

        let report: Result<RunReport, ProcessError> = match self.model_service.ensure_ready(&request.model).await {
            Ok(_) => Ok(self.run_rows(run_id, table, request, &cancel_token, &mut on_event).await),
            Err(e) => Err(e.into()),
        };

        self.unregister_run(run_id);
        report
    }

    async fn run_rows(
        &self,
        run_id: &str,
        table: &mut Table,
        request: &ProcessRequest,
        cancel_token: &CancellationToken,
        on_event: &mut impl FnMut(ProcessingEvent),
    ) -> RunReport {
        let total_rows = request.range.len();
        let mut tracker = ProgressTracker::start(total_rows);
        let mut rows_failed = 0;

        let column = match table.reset_column(&request.target_column) {
            Ok(column) => column,
            Err(e) => {
                error!(run_id, error = %e, "could not prepare target column");
                return Self::report(run_id, RunState::Aborted(AbortReason::Unexpected(e.to_string())), &tracker, 0);
            }
        };

        let mut state = RunState::Running;
        info!(run_id, model = %request.model, total_rows, column = %request.target_column, "run started");
        on_event(ProcessingEvent::Started {
            run_id: run_id.to_string(),
            total_rows,
        });

        for row_index in request.range.iter() {
            if cancel_token.is_cancelled() {
                info!(run_id, row_index, "run cancelled by user");
                state = RunState::Cancelled;
                break;
            }

            let prompt = match table.row(row_index) {
                Some(values) => request.template.render(table.headers(), values),
                None => {
                    state = RunState::Aborted(AbortReason::Unexpected(format!("Row {} is missing", row_index)));
                    break;
                }
            };

            let prompt = match prompt {
                Ok(prompt) => prompt,
                Err(e) => {
                    error!(run_id, row_index, error = %e, "template rendering failed");
                    state = RunState::Aborted(AbortReason::Template(e));
                    break;
                }
            };

            let outcome = match self
                .generate_cell(table, row_index, column, &prompt, request, &mut *on_event)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(run_id, row_index, error = %e, "unexpected failure");
                    state = RunState::Aborted(AbortReason::Unexpected(e));
                    break;
                }
            };

            let failed = matches!(outcome, RowOutcome::Failed);
            if failed {
                rows_failed += 1;
            }

            let progress = tracker.row_completed();
            info!(
                run_id,
                row_index,
                "Progress: {:.1}% | Time remaining: {}",
                progress.fraction * 100.0,
                progress.remaining
            );
            on_event(ProcessingEvent::RowCompleted {
                row_index,
                failed,
                progress,
            });
        }

        if state == RunState::Running {
            state = RunState::Completed;
        }

        let report = Self::report(run_id, state, &tracker, rows_failed);
        info!(
            run_id,
            state = report.state.as_str(),
            rows_completed = report.rows_completed,
            rows_failed = report.rows_failed,
            "run finished"
        );
        report
    }

    /// Streams one generation into the target cell. Recoverable client errors become the
    /// sentinel value; anything else is returned as a fatal message.
    async fn generate_cell(
        &self,
        table: &mut Table,
        row_index: usize,
        column: usize,
        prompt: &str,
        request: &ProcessRequest,
        on_event: &mut impl FnMut(ProcessingEvent),
    ) -> Result<RowOutcome, String> {
        match self.stream_into_cell(table, row_index, column, prompt, request, &mut *on_event).await {
            Ok(text) => {
                table
                    .set_cell(row_index, column, text.trim())
                    .map_err(|e| e.to_string())?;
                Ok(RowOutcome::Generated)
            }
            Err(StreamFailure::Generation(e)) if e.is_recoverable() => {
                warn!(row_index, error = %e, "generation failed for row");
                table
                    .set_cell(row_index, column, FAILED_OUTPUT)
                    .map_err(|e| e.to_string())?;
                Ok(RowOutcome::Failed)
            }
            Err(StreamFailure::Generation(e)) => Err(e.to_string()),
            Err(StreamFailure::Table(msg)) => Err(msg),
        }
    }

    async fn stream_into_cell(
        &self,
        table: &mut Table,
        row_index: usize,
        column: usize,
        prompt: &str,
        request: &ProcessRequest,
        on_event: &mut impl FnMut(ProcessingEvent),
    ) -> Result<String, StreamFailure> {
        let mut stream = self
            .client
            .generate(&request.model, prompt, &request.options)
            .await
            .map_err(StreamFailure::Generation)?;

        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.map_err(StreamFailure::Generation)?;
            accumulated.push_str(&fragment);

            table
                .set_cell(row_index, column, accumulated.as_str())
                .map_err(|e| StreamFailure::Table(e.to_string()))?;
            debug!(row_index, chars = accumulated.len(), "fragment received");
            on_event(ProcessingEvent::Fragment {
                row_index,
                text: accumulated.clone(),
            });
        }

        Ok(accumulated)
    }

    fn report(run_id: &str, state: RunState, tracker: &ProgressTracker, rows_failed: usize) -> RunReport {
        RunReport {
            run_id: run_id.to_string(),
            state,
            rows_completed: tracker.rows_done(),
            rows_failed,
            elapsed_secs: tracker.elapsed().as_secs_f64(),
        }
    }
}

enum StreamFailure {
    Generation(GenerationError),
    Table(String),
}
