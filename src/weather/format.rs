use crate::error::{PipelineError, StageResult};
use crate::weather::model::{Aggregate, GroupKey, Row};
use serde_json::Value;

/// Flattens a `(GroupKey, Aggregate)` pair into an output [`Row`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RowFormatter;

impl RowFormatter {
    pub fn format(&self, key: &GroupKey, agg: &Aggregate) -> Row {
        Row {
            city: key.city.clone(),
            date: key.date.clone(),
            avg_temperature: agg.avg_temperature,
            avg_windspeed: agg.avg_windspeed,
        }
    }

    pub fn format_pair(&self, pair: &(GroupKey, Aggregate)) -> Row {
        self.format(&pair.0, &pair.1)
    }

    /// Format a pair that arrives untyped, e.g. from a JSON intermediate.
    ///
    /// The value must be a two-element array `[key, aggregate]`; anything
    /// else is a [`PipelineError::ShapeMismatch`].
    pub fn format_value(&self, value: &Value) -> StageResult<Row> {
        const EXPECTED: &str = "[GroupKey, Aggregate] pair";
        let items = match value {
            Value::Array(items) if items.len() == 2 => items,
            Value::Array(items) => {
                return Err(PipelineError::shape(
                    EXPECTED,
                    format!("array of {} elements", items.len()),
                ));
            }
            other => return Err(PipelineError::shape(EXPECTED, json_kind(other))),
        };
        let key: GroupKey = serde_json::from_value(items[0].clone())
            .map_err(|e| PipelineError::shape("GroupKey", format!("{}: {e}", json_kind(&items[0]))))?;
        let agg: Aggregate = serde_json::from_value(items[1].clone())
            .map_err(|e| PipelineError::shape("Aggregate", format!("{}: {e}", json_kind(&items[1]))))?;
        Ok(self.format(&key, &agg))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_key_and_aggregate() {
        let row = RowFormatter.format(
            &GroupKey::new("NYC", "2024-03-01"),
            &Aggregate {
                avg_temperature: Some(15.0),
                avg_windspeed: Some(10.0),
            },
        );
        assert_eq!(
            row,
            Row {
                city: "NYC".into(),
                date: "2024-03-01".into(),
                avg_temperature: Some(15.0),
                avg_windspeed: Some(10.0),
            }
        );
    }

    #[test]
    fn empty_aggregate_becomes_null_columns() {
        let row = RowFormatter.format(&GroupKey::new("LA", "2024-03-01"), &Aggregate::EMPTY);
        assert_eq!(row.avg_temperature, None);
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"city": "LA", "date": "2024-03-01", "avg_temperature": null, "avg_windspeed": null})
        );
    }

    #[test]
    fn untyped_pair_is_formatted() {
        let v = json!([
            {"city": "LA", "date": "2024-03-01"},
            {"avg_temperature": 25.0, "avg_windspeed": 3.0}
        ]);
        let row = RowFormatter.format_value(&v).unwrap();
        assert_eq!(row.city, "LA");
        assert_eq!(row.avg_windspeed, Some(3.0));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        for v in [
            json!(null),
            json!({"city": "LA"}),
            json!([{"city": "LA", "date": "2024-03-01"}]),
            json!(["LA", "2024-03-01", {}]),
            json!([42, {"avg_temperature": 1.0, "avg_windspeed": 1.0}]),
        ] {
            let err = RowFormatter.format_value(&v).unwrap_err();
            assert!(
                matches!(err, PipelineError::ShapeMismatch { .. }),
                "{v} gave {err:?}"
            );
        }
    }
}
