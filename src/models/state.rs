use std::path::{Path, PathBuf};

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::services::dataset::Table;
use crate::services::generation::RunReport;

/// Session state owned by the command front end and handed to each command.
#[derive(Debug, Default)]
pub struct AppState {
    pub client_config: ClientConfig,
    table: Option<Table>,
    source_path: Option<PathBuf>,
    processed_columns: Vec<String>,
    last_report: Option<RunReport>,
}

impl AppState {
    pub fn new(client_config: ClientConfig) -> Self {
        Self {
            client_config,
            ..Self::default()
        }
    }

    /// Replaces the loaded table. Columns processed against the previous table are forgotten.
    pub fn load_table(&mut self, path: &Path) -> AppResult<&Table> {
        let table = Table::from_path(path)?;
        self.source_path = Some(path.to_path_buf());
        self.processed_columns.clear();
        self.last_report = None;
        Ok(self.table.insert(table))
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> AppResult<&mut Table> {
        self.table
            .as_mut()
            .ok_or_else(|| AppError::Validation("No CSV file loaded".to_string()))
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn record_run(&mut self, column: &str, report: RunReport) {
        if !self.processed_columns.iter().any(|c| c == column) {
            self.processed_columns.push(column.to_string());
        }
        self.last_report = Some(report);
    }

    pub fn processed_columns(&self) -> &[String] {
        &self.processed_columns
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generation::RunState;
    use std::fs;
    use tempfile::tempdir;

    fn report(state: RunState) -> RunReport {
        RunReport {
            run_id: "run_1_0".to_string(),
            state,
            rows_completed: 1,
            rows_failed: 0,
            elapsed_secs: 0.5,
        }
    }

    #[test]
    fn test_table_mut_without_table_is_validation_error() {
        let mut state = AppState::new(ClientConfig::default());
        assert!(matches!(state.table_mut(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_load_table_resets_session() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let csv_path = temp_dir.path().join("input.csv");
        fs::write(&csv_path, "Name\nAlice\n").expect("Failed to write CSV");

        let mut state = AppState::new(ClientConfig::default());
        state.record_run("Ollama Output", report(RunState::Completed));

        let table = state.load_table(&csv_path).expect("Should load table");
        assert_eq!(table.len(), 1);
        assert!(state.processed_columns().is_empty());
        assert!(state.last_report().is_none());
        assert_eq!(state.source_path(), Some(csv_path.as_path()));
    }

    #[test]
    fn test_load_missing_file_leaves_state_empty() {
        let mut state = AppState::new(ClientConfig::default());
        let result = state.load_table(Path::new("/nonexistent/input.csv"));
        assert!(result.is_err());
        assert!(state.table().is_none());
    }

    #[test]
    fn test_record_run_keeps_columns_unique() {
        let mut state = AppState::new(ClientConfig::default());
        state.record_run("Summary", report(RunState::Completed));
        state.record_run("Sentiment", report(RunState::Cancelled));
        state.record_run("Summary", report(RunState::Completed));

        assert_eq!(state.processed_columns(), ["Summary", "Sentiment"]);
        assert_eq!(
            state.last_report().map(|r| r.state.clone()),
            Some(RunState::Completed)
        );
    }
}
