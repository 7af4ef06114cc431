pub mod client;
pub mod dataset;
pub mod export;
pub mod generation;
pub mod model;

pub use client::{GenerationClient, GenerationError};
pub use dataset::{CellValue, DatasetError, RowRange, Table};
pub use export::ExportError;
pub use generation::{
    GenerationService, ProcessError, ProcessRequest, ProcessingEvent, RunReport, RunState, RunSummary,
};
pub use model::{ModelError, ModelService};
