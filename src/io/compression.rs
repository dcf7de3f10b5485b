//! Transparent compression for file sources and sinks.
//!
//! Detection checks the file extension first and falls back to magic bytes,
//! so a gzip file without a `.gz` suffix is still read correctly. Writers
//! compress a whole buffer up front; appending to a `.gz` file adds one gzip
//! member per append, and readers decode every member in the file.
//!
//! ```no_run
//! use weather_summary::io::compression::{Codec, auto_detect_reader};
//! use std::fs::File;
//! # fn main() -> anyhow::Result<()> {
//! let reader = auto_detect_reader(File::open("obs.jsonl.gz")?, "obs.jsonl.gz")?;
//! assert_eq!(Codec::from_path("obs.jsonl.gz"), Codec::Gzip);
//! # let _ = reader;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Identity,
    Gzip,
}

impl Codec {
    /// Codec implied by the file extension (`.gz`, `.gzip`, case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Codec {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        if name.ends_with(".gz") || name.ends_with(".gzip") {
            Codec::Gzip
        } else {
            Codec::Identity
        }
    }

    /// Codec implied by the first bytes of a stream. The reader is not advanced.
    pub fn sniff<R: BufRead>(reader: &mut R) -> Result<Codec> {
        let head = reader.fill_buf().context("peek stream header")?;
        Ok(if head.starts_with(&GZIP_MAGIC) {
            Codec::Gzip
        } else {
            Codec::Identity
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::Identity => "identity",
            Codec::Gzip => "gzip",
        }
    }

    fn wrap_reader<R: Read + 'static>(self, reader: R) -> Result<Box<dyn Read>> {
        match self {
            Codec::Identity => Ok(Box::new(reader)),
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
            #[cfg(not(feature = "compression-gzip"))]
            Codec::Gzip => anyhow::bail!("gzip input requires the `compression-gzip` feature"),
        }
    }

    /// Compress a complete buffer.
    pub fn encode(self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Codec::Identity => Ok(bytes),
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => {
                use flate2::Compression;
                use flate2::write::GzEncoder;
                use std::io::Write;

                let mut enc = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
                enc.write_all(&bytes).context("gzip encode")?;
                enc.finish().context("gzip finish")
            }
            #[cfg(not(feature = "compression-gzip"))]
            Codec::Gzip => anyhow::bail!("gzip output requires the `compression-gzip` feature"),
        }
    }
}

/// Wrap `reader` with a decompressor if the path or the content says so.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    let by_ext = Codec::from_path(&path_hint);
    if by_ext != Codec::Identity {
        return by_ext
            .wrap_reader(reader)
            .with_context(|| format!("wrap reader with {} codec", by_ext.name()));
    }

    let mut buffered = BufReader::new(reader);
    let sniffed = Codec::sniff(&mut buffered)?;
    sniffed
        .wrap_reader(buffered)
        .with_context(|| format!("wrap reader with {} codec", sniffed.name()))
}
