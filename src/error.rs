use serde::{Deserialize, Serialize};

use crate::services::client::GenerationError;
use crate::services::dataset::DatasetError;
use crate::services::export::ExportError;
use crate::services::generation::ProcessError;
use crate::services::model::ModelError;

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Run aborted: {0}")]
    Aborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Io(error.to_string())
    }
}

impl From<DatasetError> for AppError {
    fn from(error: DatasetError) -> Self {
        match error {
            DatasetError::FsError(msg) => AppError::Io(msg),
            DatasetError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(error: ExportError) -> Self {
        AppError::Io(error.to_string())
    }
}

impl From<ModelError> for AppError {
    fn from(error: ModelError) -> Self {
        AppError::Server(error.to_string())
    }
}

impl From<GenerationError> for AppError {
    fn from(error: GenerationError) -> Self {
        AppError::Internal(error.to_string())
    }
}

impl From<ProcessError> for AppError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::Model(err) => AppError::Server(err.to_string()),
            ProcessError::InvalidInput(msg) => AppError::Validation(msg),
            ProcessError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
