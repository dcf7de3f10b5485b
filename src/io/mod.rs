//! File adapters shared by the observation source and the summary sink.

pub mod compression;
pub mod glob;

#[cfg_attr(docsrs, doc(cfg(feature = "io-jsonl")))]
#[cfg(feature = "io-jsonl")]
pub mod jsonl;

#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;

use crate::error::PipelineError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Record encoding of a source or sink file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Jsonl,
    Csv,
}

impl FileFormat {
    /// Infer the format from the extension, ignoring a trailing `.gz`.
    pub fn infer(path: impl AsRef<Path>) -> Option<FileFormat> {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        let name = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".gzip"))
            .unwrap_or(&name);
        if name.ends_with(".jsonl") || name.ends_with(".ndjson") || name.ends_with(".json") {
            Some(FileFormat::Jsonl)
        } else if name.ends_with(".csv") {
            Some(FileFormat::Csv)
        } else {
            None
        }
    }

    /// The explicit format if given, else the inferred one.
    pub fn resolve(explicit: Option<FileFormat>, path: impl AsRef<Path>) -> Result<FileFormat> {
        let path = path.as_ref();
        explicit
            .or_else(|| FileFormat::infer(path))
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "cannot infer record format of {}; set it explicitly",
                    path.display()
                ))
                .into()
            })
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Jsonl => "jsonl",
            FileFormat::Csv => "csv",
        })
    }
}

impl FromStr for FileFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "ndjson" | "json" => Ok(FileFormat::Jsonl),
            "csv" => Ok(FileFormat::Csv),
            other => Err(PipelineError::config(format!(
                "unknown record format {other:?} (expected jsonl or csv)"
            ))),
        }
    }
}

/// Read every record of one file in the given format.
pub fn read_records<T: DeserializeOwned>(path: &Path, format: FileFormat) -> Result<Vec<T>> {
    match format {
        #[cfg(feature = "io-jsonl")]
        FileFormat::Jsonl => jsonl::read_jsonl_vec(path),
        #[cfg(feature = "io-csv")]
        FileFormat::Csv => csv::read_csv_vec(path, true),
        #[allow(unreachable_patterns)]
        other => bail!("{other} support is not compiled in"),
    }
}

/// Append a prepared buffer to an existing file in a single write.
///
/// The file is never created. A gzip path gets the buffer as one new gzip
/// member.
pub fn append_bytes(path: &Path, bytes: Vec<u8>) -> Result<()> {
    let body = compression::Codec::from_path(path).encode(bytes)?;
    let mut f = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("open {} for append", path.display()))?;
    f.write_all(&body)
        .with_context(|| format!("append to {}", path.display()))?;
    f.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
