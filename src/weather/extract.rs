use crate::error::{PipelineError, StageResult};
use crate::weather::model::{FieldValue, GroupKey, Measurement, RawObservation};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Turns a raw observation into a `(GroupKey, Measurement)` pair.
///
/// The key is the city (taken verbatim) plus the calendar day of
/// `fetched_at` as written, so an RFC 3339 timestamp keeps the day of its
/// own offset. Any missing or unusable field is a
/// [`PipelineError::MalformedRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyExtractor;

impl KeyExtractor {
    pub fn extract(&self, record: &RawObservation) -> StageResult<(GroupKey, Measurement)> {
        let city = text_field("city", record.city.as_ref(), record)?;
        let fetched_at = text_field("fetched_at", record.fetched_at.as_ref(), record)?;
        let date = observation_date(fetched_at).ok_or_else(|| {
            PipelineError::malformed(format!("fetched_at {fetched_at:?} is not a timestamp"), record)
        })?;

        let temperature = numeric_field("temperature", record.temperature.as_ref(), record)?;
        let windspeed = numeric_field("windspeed", record.windspeed.as_ref(), record)?;

        Ok((
            GroupKey::new(city, date.format("%Y-%m-%d").to_string()),
            Measurement::single(temperature, windspeed),
        ))
    }
}

fn text_field<'a>(
    name: &str,
    value: Option<&'a FieldValue>,
    record: &RawObservation,
) -> StageResult<&'a str> {
    let value = value.ok_or_else(|| PipelineError::malformed(format!("{name} is missing"), record))?;
    value
        .as_text()
        .ok_or_else(|| PipelineError::malformed(format!("{name} is not text: {value}"), record))
}

fn numeric_field(
    name: &str,
    value: Option<&FieldValue>,
    record: &RawObservation,
) -> StageResult<f64> {
    let value = value.ok_or_else(|| PipelineError::malformed(format!("{name} is missing"), record))?;
    value.as_finite_f64().ok_or_else(|| {
        PipelineError::malformed(format!("{name} is not a finite number: {value}"), record)
    })
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Calendar day of a `fetched_at` value.
///
/// Accepts RFC 3339 (day taken in the value's own offset), naive ISO 8601
/// date-times with `T` or a space and optional fractional seconds, an
/// optional trailing ` UTC`, and bare `YYYY-MM-DD` dates.
pub fn observation_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.date_naive());
    }

    let s = s.strip_suffix("UTC").map_or(s, str::trim_end);
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
