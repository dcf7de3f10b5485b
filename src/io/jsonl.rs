//! JSON Lines reading and encoding.
//!
//! Blank lines are skipped on read. Parse errors carry the file and line
//! number. Encoding produces one compact JSON value per line and never
//! touches the filesystem; [`crate::io::append_bytes`] commits the buffer.

use crate::io::compression::{Codec, auto_detect_reader};
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read a JSONL file (optionally gzip-compressed) into a `Vec<T>`.
pub fn read_jsonl_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let rdr = BufReader::new(rdr);
    let mut out = Vec::<T>::new();
    for (i, line) in rdr.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let v: T = serde_json::from_str(&line).with_context(|| {
            format!("parse JSONL line {} in {}: {}", i + 1, path.display(), line)
        })?;
        out.push(v);
    }
    Ok(out)
}

/// Serialize `data` as JSONL into memory.
pub fn encode_jsonl<T: Serialize>(data: &[T]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for (i, item) in data.iter().enumerate() {
        serde_json::to_writer(&mut buf, item).with_context(|| format!("serialize item #{i}"))?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Write `data` to a new JSONL file, replacing any existing one. Parent
/// directories are created and a `.gz` suffix compresses the output.
pub fn write_jsonl_vec<T: Serialize>(path: impl AsRef<Path>, data: &[T]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let body = Codec::from_path(path).encode(encode_jsonl(data)?)?;
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    f.write_all(&body)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(data.len())
}
