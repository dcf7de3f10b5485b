//! CSV reading and encoding, Serde-backed.
//!
//! Sources are read with a header row; columns are matched to fields by
//! name, so column order in the file does not matter. Empty cells become
//! `None` for optional fields.

use crate::io::compression::auto_detect_reader;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::File;
use std::path::Path;

/// Read a CSV file (optionally gzip-compressed) into a `Vec<T>`.
pub fn read_csv_vec<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    has_headers: bool,
) -> Result<Vec<T>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_headers)
        .trim(csv::Trim::Headers)
        .from_reader(rdr);
    let mut out = Vec::<T>::new();
    for (i, rec) in rdr.deserialize::<T>().enumerate() {
        let v = rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?;
        out.push(v);
    }
    Ok(out)
}

/// First record of a CSV file, or `None` if the file holds no records.
///
/// A zero-length file has no header even when its name says gzip.
pub fn read_csv_header(path: impl AsRef<Path>) -> Result<Option<Vec<String>>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    if f.metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len()
        == 0
    {
        return Ok(None);
    }
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(false).from_reader(rdr);
    let mut record = csv::StringRecord::new();
    if !rdr
        .read_record(&mut record)
        .with_context(|| format!("read header of {}", path.display()))?
    {
        return Ok(None);
    }
    Ok(Some(record.iter().map(|c| c.trim().to_string()).collect()))
}

/// Serialize `data` as CSV into memory, with or without a header row.
pub fn encode_csv<T: Serialize>(data: &[T], has_headers: bool) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .has_headers(has_headers)
        .from_writer(Vec::new());
    for (i, row) in data.iter().enumerate() {
        wtr.serialize(row)
            .with_context(|| format!("serialize CSV row #{}", i + 1))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV buffer: {}", e.error()))
}
