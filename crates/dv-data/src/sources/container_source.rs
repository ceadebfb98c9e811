//! Container input files (SQLite): one table per dataset
//!
//! Dataset names may contain `/` separated folder segments; the table is
//! looked up under the full name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rusqlite::{types::Value, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::schema::declared_type;
use crate::{DataError, DataHandle};

/// Read-only handle on one container file
pub struct ContainerSource {
    path: PathBuf,
    conn: Connection,
}

/// Quote an identifier for use in SQL
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl ContainerSource {
    /// Open an existing container file
    pub fn open(path: &Path) -> Result<Self, DataError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| DataError::Container(format!("Failed to open {:?}: {}", path, e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Names of all datasets in the container
    pub fn dataset_names(&self) -> Result<Vec<String>, DataError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn has_dataset(&self, name: &str) -> Result<bool, DataError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Column names with their declared types
    fn declared_columns(&self, table: &str) -> Result<Vec<(String, Option<DataType>)>, DataError> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", quote(table)))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get(2)?;
                Ok((name, declared_type(&declared)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DataError::Container(format!("Table '{}' has no columns", table)));
        }
        Ok(columns)
    }

    /// Read one dataset; `None` when the container does not hold it
    pub fn read_dataset(&self, name: &str) -> Result<Option<DataHandle>, DataError> {
        if !self.has_dataset(name)? {
            return Ok(None);
        }

        let declared = self.declared_columns(name)?;
        let mut stmt = self.conn.prepare(&format!("SELECT * FROM {}", quote(name)))?;

        let mut cells: Vec<Vec<Value>> = vec![Vec::new(); declared.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (col_idx, column) in cells.iter_mut().enumerate() {
                column.push(row.get(col_idx)?);
            }
        }

        let mut fields = Vec::with_capacity(declared.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(declared.len());
        for ((column, declared), values) in declared.into_iter().zip(&cells) {
            let data_type = column_type(declared, values);
            arrays.push(build_column(&data_type, values));
            fields.push(Field::new(column, data_type, true));
        }
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;

        debug!("Read dataset '{}' ({} rows) from {:?}", name, batch.num_rows(), self.path);
        Ok(Some(DataHandle::new(name, self.path.clone(), batch)))
    }
}

/// Arrow type of a column from its declared type and stored values
///
/// Integer columns holding a real widen to Float64. Columns without a
/// declared type take the widest numeric kind stored, or text as soon as
/// any text or blob value is present.
fn column_type(declared: Option<DataType>, values: &[Value]) -> DataType {
    let has_real = values.iter().any(|v| matches!(v, Value::Real(_)));
    match declared {
        Some(DataType::Int64) if has_real => DataType::Float64,
        Some(data_type) => data_type,
        None => {
            if values.iter().any(|v| matches!(v, Value::Text(_) | Value::Blob(_))) {
                DataType::Utf8
            } else if has_real {
                DataType::Float64
            } else if values.iter().any(|v| matches!(v, Value::Integer(_))) {
                DataType::Int64
            } else {
                DataType::Utf8
            }
        }
    }
}

fn build_column(data_type: &DataType, values: &[Value]) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Integer(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Real(f) => builder.append_value(*f),
                    Value::Integer(i) => builder.append_value(*i as f64),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::Text(s) => builder.append_value(s),
                    Value::Integer(i) => builder.append_value(i.to_string()),
                    Value::Real(f) => builder.append_value(f.to_string()),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}
