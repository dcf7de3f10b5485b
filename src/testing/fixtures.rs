//! Observation fixtures and temporary file layouts.

use crate::io::FileFormat;
use crate::io::compression::Codec;
use crate::weather::{FieldValue, RawObservation, Row};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A fully populated observation.
#[must_use]
pub fn obs(city: &str, temperature: f64, windspeed: f64, fetched_at: &str) -> RawObservation {
    RawObservation::new(city, temperature, windspeed, fetched_at)
}

/// Three readings on 2024-03-01: two in NYC, one in LA.
#[must_use]
pub fn reference_observations() -> Vec<RawObservation> {
    vec![
        obs("NYC", 10.0, 5.0, "2024-03-01T08:00:00Z"),
        obs("NYC", 20.0, 15.0, "2024-03-01T20:00:00Z"),
        obs("LA", 30.0, 2.0, "2024-03-01T08:00:00Z"),
    ]
}

/// The rows [`reference_observations`] summarize to, sorted.
#[must_use]
pub fn reference_rows() -> Vec<Row> {
    vec![
        Row {
            city: "LA".into(),
            date: "2024-03-01".into(),
            avg_temperature: Some(30.0),
            avg_windspeed: Some(2.0),
        },
        Row {
            city: "NYC".into(),
            date: "2024-03-01".into(),
            avg_temperature: Some(15.0),
            avg_windspeed: Some(10.0),
        },
    ]
}

/// `per_city` readings a day for each of `cities` over `days` days in March
/// 2024, with values that vary by city, day and hour.
#[must_use]
pub fn synthetic_observations(cities: &[&str], days: u32, per_city: u32) -> Vec<RawObservation> {
    let mut out = Vec::new();
    for (ci, city) in cities.iter().enumerate() {
        for day in 1..=days {
            for i in 0..per_city {
                let hour = (i * 7) % 24;
                let t = -5.0 + ci as f64 * 3.5 + f64::from(day) * 0.25 + f64::from(i) * 0.125;
                let w = 1.0 + f64::from(i % 5) * 2.25 + ci as f64;
                out.push(obs(
                    city,
                    t,
                    w,
                    &format!("2024-03-{day:02}T{hour:02}:{:02}:00Z", i % 60),
                ));
            }
        }
    }
    out
}

/// Write observations as JSONL under `dir` and return the file path.
#[cfg(feature = "io-jsonl")]
pub fn write_observations_jsonl(
    dir: &Path,
    name: &str,
    observations: &[RawObservation],
) -> Result<PathBuf> {
    let path = dir.join(name);
    crate::io::jsonl::write_jsonl_vec(&path, observations)?;
    Ok(path)
}

/// Create an empty summary table. CSV tables get the header row, and a
/// `.gz` name gets it gzip-encoded.
pub fn empty_table(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let body = if FileFormat::infer(&path) == Some(FileFormat::Csv) {
        let header = format!("{}\n", Row::COLUMNS.join(","));
        Codec::from_path(&path).encode(header.into_bytes())?
    } else {
        Vec::new()
    };
    std::fs::write(&path, body).with_context(|| format!("create {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_data_has_the_requested_shape() {
        let data = synthetic_observations(&["A", "B"], 3, 4);
        assert_eq!(data.len(), 2 * 3 * 4);
        assert!(data.iter().all(|o| o.fetched_at.as_ref().and_then(FieldValue::as_text).is_some_and(|s| s.starts_with("2024-03-0"))));
    }

    #[test]
    fn empty_csv_table_carries_the_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = empty_table(dir.path(), "summary.csv")?;
        assert_eq!(
            std::fs::read_to_string(path)?,
            "city,date,avg_temperature,avg_windspeed\n"
        );
        let path = empty_table(dir.path(), "summary.jsonl")?;
        assert_eq!(std::fs::metadata(path)?.len(), 0);
        Ok(())
    }

    #[cfg(all(feature = "io-csv", feature = "compression-gzip"))]
    #[test]
    fn gzip_csv_table_header_is_compressed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = empty_table(dir.path(), "summary.csv.gz")?;
        assert_eq!(std::fs::read(&path)?[..2], [0x1f, 0x8b]);
        assert_eq!(
            crate::io::csv::read_csv_header(&path)?,
            Some(Row::COLUMNS.iter().map(|c| c.to_string()).collect())
        );
        Ok(())
    }
}
