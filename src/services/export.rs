use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::services::dataset::Table;

#[derive(Debug)]
pub enum ExportError {
    FsError(String),
    CsvError(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::FsError(msg) => write!(f, "File system error: {}", msg),
            ExportError::CsvError(msg) => write!(f, "CSV error: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::FsError(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::CsvError(err.to_string())
    }
}

impl<W> From<csv::IntoInnerError<W>> for ExportError {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        ExportError::CsvError(err.error().to_string())
    }
}

pub fn export_to_csv(table: &Table, file_path: &Path) -> Result<(), ExportError> {
    let csv_content = create_csv_content(table)?;
    write_to_file(file_path, &csv_content)
}

/// Comma-delimited, `\n`-terminated, fields quoted only when they need it.
pub fn create_csv_content(table: &Table) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }

    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|e| ExportError::CsvError(e.to_string()))
}

pub fn write_to_file(file_path: &Path, content: &str) -> Result<(), ExportError> {
    let mut file = File::create(file_path)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(())
}
