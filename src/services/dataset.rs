use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum DatasetError {
    NotFound(String),
    InvalidInput(String),
    ParseError(String),
    FsError(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatasetError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DatasetError::ParseError(msg) => write!(f, "CSV parse error: {}", msg),
            DatasetError::FsError(msg) => write!(f, "File system error: {}", msg),
        }
    }
}

impl std::error::Error for DatasetError {}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        DatasetError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        DatasetError::FsError(err.to_string())
    }
}

/// A single cell. CSV input only ever produces `Text`; the other variants exist for
/// tables built in code.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

/// Canonical string form used for templating and export. Null renders empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Integer(value) => write!(f, "{}", value),
            CellValue::Float(value) if value.is_nan() => f.write_str("nan"),
            CellValue::Float(value) if value.is_finite() && value.fract() == 0.0 => write!(f, "{:.1}", value),
            CellValue::Float(value) => write!(f, "{}", value),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Inclusive, 0-indexed row selection validated against a table length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    start: usize,
    end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize, table_len: usize) -> Result<Self, DatasetError> {
        if table_len == 0 {
            return Err(DatasetError::InvalidInput(
                "Cannot select rows from an empty table".to_string(),
            ));
        }

        let last_index = table_len - 1;
        if start > end || end > last_index {
            return Err(DatasetError::InvalidInput(format!(
                "Row range [{}, {}] must satisfy 0 <= start <= end <= {}",
                start, end, last_index
            )));
        }

        Ok(Self { start, end })
    }

    pub fn full(table_len: usize) -> Result<Self, DatasetError> {
        Self::new(0, table_len.saturating_sub(1), table_len)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Builds a table, padding short rows with nulls.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, DatasetError> {
        let width = headers.len();
        let mut padded = Vec::with_capacity(rows.len());

        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(DatasetError::InvalidInput(format!(
                    "Row {} has {} fields but the header has {}",
                    index,
                    row.len(),
                    width
                )));
            }
            row.resize(width, CellValue::Null);
            padded.push(row);
        }

        Ok(Self { headers, rows: padded })
    }

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path)
            .map_err(|e| DatasetError::FsError(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            return Err(DatasetError::InvalidInput("CSV file has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(CellValue::from).collect());
        }

        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(|row| row.as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Appends `name` as a new column, or resets it if it already exists. Every row ends
    /// up holding the empty default.
    pub fn reset_column(&mut self, name: &str) -> Result<usize, DatasetError> {
        if name.trim().is_empty() {
            return Err(DatasetError::InvalidInput("Column name cannot be empty".to_string()));
        }

        let index = match self.column_index(name) {
            Some(index) => index,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };

        for row in &mut self.rows {
            if row.len() <= index {
                row.resize(index + 1, CellValue::Null);
            }
            row[index] = CellValue::default();
        }

        Ok(index)
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<CellValue>) -> Result<(), DatasetError> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or_else(|| DatasetError::NotFound(format!("Cell ({}, {}) is outside the table", row, column)))?;

        *cell = value.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::from_reader("name,age\nAlice,30\nBob,25\n".as_bytes()).expect("Failed to parse CSV")
    }

    mod cell_values {
        use super::*;

        #[test]
        fn test_canonical_strings() {
            assert_eq!(CellValue::from("text").to_string(), "text");
            assert_eq!(CellValue::from(42).to_string(), "42");
            assert_eq!(CellValue::from(3.0).to_string(), "3.0");
            assert_eq!(CellValue::from(2.5).to_string(), "2.5");
            assert_eq!(CellValue::from(f64::NAN).to_string(), "nan");
            assert_eq!(CellValue::from(true).to_string(), "true");
            assert_eq!(CellValue::Null.to_string(), "");
        }

        #[test]
        fn test_default_is_empty_text() {
            assert_eq!(CellValue::default(), CellValue::Text(String::new()));
        }
    }

    mod loading {
        use super::*;

        #[test]
        fn test_from_reader_reads_headers_and_rows() {
            let table = sample_table();
            assert_eq!(table.headers(), &["name".to_string(), "age".to_string()]);
            assert_eq!(table.len(), 2);
            assert_eq!(table.cell(1, 0), Some(&CellValue::from("Bob")));
            assert_eq!(table.cell(1, 1), Some(&CellValue::from("25")));
        }

        #[test]
        fn test_short_rows_are_padded_with_null() {
            let table = Table::from_reader("a,b,c\n1\n".as_bytes()).expect("Failed to parse CSV");
            assert_eq!(table.row(0).map(|r| r.len()), Some(3));
            assert_eq!(table.cell(0, 2), Some(&CellValue::Null));
        }

        #[test]
        fn test_long_rows_are_rejected() {
            let result = Table::from_reader("a,b\n1,2,3\n".as_bytes());
            assert!(matches!(result, Err(DatasetError::InvalidInput(_))));
        }

        #[test]
        fn test_quoted_fields_keep_commas_and_newlines() {
            let table = Table::from_reader("text\n\"a, b\nc\"\n".as_bytes()).expect("Failed to parse CSV");
            assert_eq!(table.cell(0, 0), Some(&CellValue::from("a, b\nc")));
        }

        #[test]
        fn test_from_path_missing_file() {
            let result = Table::from_path(Path::new("/nonexistent/input.csv"));
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().starts_with("File system error:"));
        }
    }

    mod columns {
        use super::*;

        #[test]
        fn test_reset_column_appends_empty_column() {
            let mut table = sample_table();
            let index = table.reset_column("summary").expect("Failed to add column");

            assert_eq!(index, 2);
            assert_eq!(table.headers().last().map(String::as_str), Some("summary"));
            assert!(table.rows().iter().all(|r| r[2] == CellValue::default()));
        }

        #[test]
        fn test_reset_column_clears_existing_column() {
            let mut table = sample_table();
            let index = table.reset_column("age").expect("Failed to reset column");

            assert_eq!(index, 1);
            assert_eq!(table.headers().len(), 2);
            assert_eq!(table.cell(0, 1), Some(&CellValue::default()));
        }

        #[test]
        fn test_reset_column_rejects_blank_name() {
            let mut table = sample_table();
            assert!(table.reset_column("  ").is_err());
        }

        #[test]
        fn test_set_cell_out_of_bounds() {
            let mut table = sample_table();
            assert!(table.set_cell(5, 0, "x").is_err());
            assert!(table.set_cell(0, 0, "x").is_ok());
            assert_eq!(table.cell(0, 0), Some(&CellValue::from("x")));
        }
    }

    mod ranges {
        use super::*;

        #[test]
        fn test_valid_range() {
            let range = RowRange::new(1, 2, 3).expect("Range should be valid");
            assert_eq!(range.len(), 2);
            assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2]);
        }

        #[test]
        fn test_single_row_range() {
            let range = RowRange::new(0, 0, 1).expect("Range should be valid");
            assert_eq!(range.len(), 1);
        }

        #[test]
        fn test_range_out_of_bounds() {
            assert!(RowRange::new(0, 3, 3).is_err());
            assert!(RowRange::new(2, 1, 3).is_err());
            assert!(RowRange::new(0, 0, 0).is_err());
        }

        #[test]
        fn test_full_range() {
            let range = RowRange::full(4).expect("Range should be valid");
            assert_eq!((range.start(), range.end()), (0, 3));
            assert!(RowRange::full(0).is_err());
        }
    }
}
