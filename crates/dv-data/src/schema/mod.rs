//! Column type detection and batch construction for text inputs

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::config::NullConfig;
use crate::DataError;

/// Schema detector for rows of string cells
pub struct SchemaDetector {
    sample_size: usize,
    nulls: NullConfig,
}

impl SchemaDetector {
    /// Create a new schema detector
    pub fn new() -> Self {
        Self {
            sample_size: 1000,
            nulls: NullConfig::default(),
        }
    }

    /// Set the sample size for detection
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_nulls(mut self, nulls: NullConfig) -> Self {
        self.nulls = nulls;
        self
    }

    /// Detect a schema from the leading rows
    pub fn detect(&self, headers: &[String], rows: &[Vec<String>]) -> Schema {
        let samples = &rows[..rows.len().min(self.sample_size)];
        let fields: Vec<Field> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| Field::new(header, self.column_type(samples, idx), true))
            .collect();
        Schema::new(fields)
    }

    /// Integer if every non-null sample parses as one, then float, else text
    fn column_type(&self, samples: &[Vec<String>], col_idx: usize) -> DataType {
        let mut is_int = true;
        let mut is_float = true;
        let mut seen = 0;

        for value in samples.iter().filter_map(|row| row.get(col_idx)) {
            if self.nulls.is_null(value) {
                continue;
            }
            seen += 1;
            let value = value.trim();
            if is_int && value.parse::<i64>().is_err() {
                is_int = false;
            }
            if is_float && value.parse::<f64>().is_err() {
                is_float = false;
            }
        }

        if seen == 0 {
            DataType::Utf8
        } else if is_int {
            DataType::Int64
        } else if is_float {
            DataType::Float64
        } else {
            DataType::Utf8
        }
    }

    /// Build a record batch from string rows using a detected schema
    ///
    /// Cells that do not parse as the column type become nulls.
    pub fn build_batch(&self, schema: Schema, rows: &[Vec<String>]) -> Result<RecordBatch, DataError> {
        let schema = Arc::new(schema);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for (col_idx, field) in schema.fields().iter().enumerate() {
            let cells = rows.iter().map(|row| {
                row.get(col_idx)
                    .map(|v| v.trim())
                    .filter(|v| !self.nulls.is_null(v))
            });

            let array: ArrayRef = match field.data_type() {
                DataType::Int64 => {
                    let mut builder = Int64Builder::with_capacity(rows.len());
                    for cell in cells {
                        builder.append_option(cell.and_then(|v| v.parse::<i64>().ok()));
                    }
                    Arc::new(builder.finish())
                }
                DataType::Float64 => {
                    let mut builder = Float64Builder::with_capacity(rows.len());
                    for cell in cells {
                        builder.append_option(cell.and_then(|v| v.parse::<f64>().ok()));
                    }
                    Arc::new(builder.finish())
                }
                _ => {
                    let mut builder = StringBuilder::new();
                    for cell in cells {
                        builder.append_option(cell);
                    }
                    Arc::new(builder.finish())
                }
            };
            columns.push(array);
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a declared container column type onto an arrow type, following the
/// SQLite affinity rules
///
/// `None` for columns without affinity (no declared type or `BLOB`); their
/// type comes from the stored values.
pub fn declared_type(declared: &str) -> Option<DataType> {
    let declared = declared.to_uppercase();
    if declared.contains("INT") {
        Some(DataType::Int64)
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
        Some(DataType::Utf8)
    } else if declared.is_empty() || declared.contains("BLOB") {
        None
    } else {
        // REAL, FLOAT, DOUBLE and the NUMERIC affinity (NUMERIC, DECIMAL, ...)
        Some(DataType::Float64)
    }
}
