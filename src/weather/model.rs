//! Records flowing through the summary pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field as it arrives from a source: a number, text, or any other JSON
/// value. Nothing is rejected at read time; the key extractor decides which
/// shapes a field may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl FieldValue {
    /// The value as a finite `f64`, if it is one. Numeric text counts.
    pub fn as_finite_f64(&self) -> Option<f64> {
        let v = match self {
            FieldValue::Number(v) => *v,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Other(_) => return None,
        };
        v.is_finite().then_some(v)
    }

    /// The value if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Other(v) => write!(f, "{v}"),
        }
    }
}

/// One sensor reading as read from the source. Every field may be absent
/// or of the wrong type; the key extractor decides whether the record is
/// usable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(default)]
    pub city: Option<FieldValue>,
    #[serde(default)]
    pub temperature: Option<FieldValue>,
    #[serde(default)]
    pub windspeed: Option<FieldValue>,
    #[serde(default)]
    pub fetched_at: Option<FieldValue>,
}

/// CSV form of [`RawObservation`]. Every cell is text, so a numeric-looking
/// city stays a city.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsvObservation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub windspeed: Option<String>,
    #[serde(default)]
    pub fetched_at: Option<String>,
}

impl From<CsvObservation> for RawObservation {
    fn from(row: CsvObservation) -> Self {
        Self {
            city: row.city.map(FieldValue::Text),
            temperature: row.temperature.map(FieldValue::Text),
            windspeed: row.windspeed.map(FieldValue::Text),
            fetched_at: row.fetched_at.map(FieldValue::Text),
        }
    }
}

impl RawObservation {
    /// A fully populated observation.
    pub fn new(
        city: impl Into<String>,
        temperature: f64,
        windspeed: f64,
        fetched_at: impl Into<String>,
    ) -> Self {
        Self {
            city: Some(FieldValue::Text(city.into())),
            temperature: Some(FieldValue::Number(temperature)),
            windspeed: Some(FieldValue::Number(windspeed)),
            fetched_at: Some(FieldValue::Text(fetched_at.into())),
        }
    }
}

/// Grouping key: a city and the calendar day (`YYYY-MM-DD`) of the reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub city: String,
    pub date: String,
}

impl GroupKey {
    pub fn new(city: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            date: date.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.city, self.date)
    }
}

/// Temperature and windspeed carried with the number of readings they stand
/// for. Extracted readings have `count == 1`; partial sums have more.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub temperature: f64,
    pub windspeed: f64,
    pub count: u64,
}

impl Measurement {
    /// A single reading.
    pub fn single(temperature: f64, windspeed: f64) -> Self {
        Self {
            temperature,
            windspeed,
            count: 1,
        }
    }
}

/// Averages for one group. Both are `None` only for an empty group.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub avg_temperature: Option<f64>,
    pub avg_windspeed: Option<f64>,
}

impl Aggregate {
    pub const EMPTY: Aggregate = Aggregate {
        avg_temperature: None,
        avg_windspeed: None,
    };
}

/// Output row, one per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub city: String,
    pub date: String,
    pub avg_temperature: Option<f64>,
    pub avg_windspeed: Option<f64>,
}

impl Row {
    /// Column names in output order.
    pub const COLUMNS: [&'static str; 4] = ["city", "date", "avg_temperature", "avg_windspeed"];

    /// Ordering key used to make sink output deterministic.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.city, &self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_accepts_numbers_and_numeric_text() {
        assert_eq!(FieldValue::Number(1.5).as_finite_f64(), Some(1.5));
        assert_eq!(FieldValue::Text(" 2.25 ".into()).as_finite_f64(), Some(2.25));
        assert_eq!(FieldValue::Text("warm".into()).as_finite_f64(), None);
        assert_eq!(FieldValue::Number(f64::NAN).as_finite_f64(), None);
        assert_eq!(FieldValue::Text("inf".into()).as_finite_f64(), None);
    }

    #[test]
    fn raw_observation_tolerates_missing_fields() {
        let r: RawObservation =
            serde_json::from_str(r#"{"city":"NYC","windspeed":"4","fetched_at":"2024-03-01"}"#)
                .unwrap();
        assert_eq!(r.city.as_ref().and_then(FieldValue::as_text), Some("NYC"));
        assert!(r.temperature.is_none());
        assert_eq!(r.windspeed, Some(FieldValue::Text("4".into())));
    }

    #[test]
    fn raw_observation_keeps_wrongly_typed_fields() {
        let r: RawObservation = serde_json::from_str(
            r#"{"city":42,"temperature":true,"windspeed":[1],"fetched_at":1709280000}"#,
        )
        .unwrap();
        assert_eq!(r.city, Some(FieldValue::Number(42.0)));
        assert_eq!(r.temperature, Some(FieldValue::Other(serde_json::Value::Bool(true))));
        assert_eq!(r.windspeed.as_ref().and_then(FieldValue::as_finite_f64), None);
        assert_eq!(r.fetched_at.as_ref().and_then(FieldValue::as_text), None);
    }

    #[test]
    fn csv_cells_stay_text() {
        let row = CsvObservation {
            city: Some("101".into()),
            temperature: Some("true".into()),
            windspeed: None,
            fetched_at: Some("2024-03-01".into()),
        };
        let r = RawObservation::from(row);
        assert_eq!(r.city.as_ref().and_then(FieldValue::as_text), Some("101"));
        assert_eq!(r.temperature, Some(FieldValue::Text("true".into())));
        assert!(r.windspeed.is_none());
    }

    #[test]
    fn group_keys_compare_structurally() {
        let a = GroupKey::new("NYC", "2024-03-01");
        let b = GroupKey::new(String::from("NYC"), String::from("2024-03-01"));
        assert_eq!(a, b);
        assert!(GroupKey::new("LA", "2024-03-02") < a);
        assert_eq!(a.to_string(), "NYC/2024-03-01");
    }
}
