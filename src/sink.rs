//! Append-only summary table.
//!
//! The table is a CSV or JSONL file that must already exist. Rows are
//! checked against the fixed schema, encoded in memory, then appended with a
//! single write. Nothing is ever truncated or overwritten.

use crate::error::PipelineError;
use crate::io::{FileFormat, append_bytes};
use crate::weather::Row;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Schema of the summary table, in the warehouse's `name:TYPE` notation.
pub const SUMMARY_SCHEMA: &str =
    "city:STRING, date:DATE, avg_temperature:FLOAT64, avg_windspeed:FLOAT64";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Date,
    Float64,
}

impl ColumnType {
    fn parse(s: &str) -> Option<ColumnType> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => Some(ColumnType::String),
            "DATE" => Some(ColumnType::Date),
            "FLOAT64" | "FLOAT" => Some(ColumnType::Float64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    /// Parse a comma-separated `name:TYPE` list.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let columns = text
            .split(',')
            .map(|part| {
                let (name, ty) = part
                    .split_once(':')
                    .ok_or_else(|| PipelineError::config(format!("schema column {part:?} has no type")))?;
                let ty = ColumnType::parse(ty).ok_or_else(|| {
                    PipelineError::config(format!("schema column {part:?} has an unknown type"))
                })?;
                Ok(Column {
                    name: name.trim().to_string(),
                    ty,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(Self { columns })
    }

    /// The summary table schema.
    pub fn summary() -> Self {
        Self {
            columns: vec![
                Column { name: "city".into(), ty: ColumnType::String },
                Column { name: "date".into(), ty: ColumnType::Date },
                Column { name: "avg_temperature".into(), ty: ColumnType::Float64 },
                Column { name: "avg_windspeed".into(), ty: ColumnType::Float64 },
            ],
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check a row's values against the column types.
    pub fn check_row(&self, row: &Row) -> Result<(), PipelineError> {
        if NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").is_err() {
            return Err(PipelineError::sink(format!(
                "row {}/{}: date column is not a DATE",
                row.city, row.date
            )));
        }
        for (name, v) in [
            ("avg_temperature", row.avg_temperature),
            ("avg_windspeed", row.avg_windspeed),
        ] {
            if v.is_some_and(|x| !x.is_finite()) {
                return Err(PipelineError::sink(format!(
                    "row {}/{}: {name} is not a finite FLOAT64",
                    row.city, row.date
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let ty = match c.ty {
                ColumnType::String => "STRING",
                ColumnType::Date => "DATE",
                ColumnType::Float64 => "FLOAT64",
            };
            write!(f, "{}:{ty}", c.name)?;
        }
        Ok(())
    }
}

/// Handle to an existing summary table file.
#[derive(Debug, Clone)]
pub struct TableSink {
    path: PathBuf,
    format: FileFormat,
    schema: TableSchema,
}

impl TableSink {
    /// Open an existing table. A missing file is a [`PipelineError::Sink`].
    pub fn open(path: impl Into<PathBuf>, format: Option<FileFormat>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::resolve(format, &path)?;
        let sink = Self {
            path,
            format,
            schema: TableSchema::summary(),
        };
        sink.ensure_exists()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn ensure_exists(&self) -> Result<(), PipelineError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(PipelineError::sink(format!(
                "destination table {} does not exist",
                self.path.display()
            )))
        }
    }

    /// Append `rows` in one write and return how many were written.
    pub fn append(&self, rows: &[Row]) -> Result<usize> {
        self.ensure_exists()?;
        for row in rows {
            self.schema.check_row(row)?;
        }
        if rows.is_empty() {
            debug!(table = %self.path.display(), "no rows to append");
            return Ok(0);
        }

        let body = match self.format {
            #[cfg(feature = "io-jsonl")]
            FileFormat::Jsonl => crate::io::jsonl::encode_jsonl(rows)?,
            #[cfg(feature = "io-csv")]
            FileFormat::Csv => {
                let needs_header = self.check_csv_header()?;
                crate::io::csv::encode_csv(rows, needs_header)?
            }
            #[allow(unreachable_patterns)]
            other => anyhow::bail!("{other} support is not compiled in"),
        };

        append_bytes(&self.path, body)
            .with_context(|| format!("append {} rows to {}", rows.len(), self.path.display()))?;
        debug!(table = %self.path.display(), rows = rows.len(), "appended rows");
        Ok(rows.len())
    }

    /// Verify an existing CSV header. Returns `true` when the table is empty
    /// and the header still has to be written.
    #[cfg(feature = "io-csv")]
    fn check_csv_header(&self) -> Result<bool> {
        match crate::io::csv::read_csv_header(&self.path)? {
            None => Ok(true),
            Some(header) => {
                let expected = self.schema.column_names();
                if header.iter().map(String::as_str).eq(expected.iter().copied()) {
                    Ok(false)
                } else {
                    Err(PipelineError::sink(format!(
                        "table {} has columns [{}], expected [{}]",
                        self.path.display(),
                        header.join(", "),
                        expected.join(", ")
                    ))
                    .into())
                }
            }
        }
    }
}
