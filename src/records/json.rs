use serde_json::Value;

use super::{normalize, Dataset, FieldValue, Record};
use crate::error::{DashboardError, Result};

/// Load a JSON array of flat objects into a [`Dataset`].
///
/// The header is the union of keys across all objects in first-seen order;
/// objects lacking a key get [`FieldValue::Missing`] for it. String values go
/// through the same normalizer as CSV cells.
pub fn parse_json(text: &str) -> Result<Dataset> {
    let rows: Vec<Value> = match serde_json::from_str(text)? {
        Value::Array(items) => items,
        other => {
            return Err(DashboardError::InvalidExport(format!(
                "expected a JSON array, found {}",
                kind(&other)
            )))
        }
    };

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        match row {
            Value::Object(map) => {
                for key in map.keys() {
                    if !headers.iter().any(|h| h == key) {
                        headers.push(key.clone());
                    }
                }
                objects.push(map);
            }
            other => {
                return Err(DashboardError::InvalidExport(format!(
                    "element {} is {}, expected an object",
                    i,
                    kind(&other)
                )))
            }
        }
    }

    let records = objects
        .iter()
        .map(|map| {
            headers
                .iter()
                .map(|h| {
                    let value = map.get(h).map(json_value).unwrap_or(FieldValue::Missing);
                    (h.clone(), value)
                })
                .collect::<Record>()
        })
        .collect();

    Ok(Dataset {
        headers,
        records,
        warnings: Vec::new(),
    })
}

fn json_value(v: &Value) -> FieldValue {
    match v {
        Value::Null => FieldValue::Missing,
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => FieldValue::Number(f),
            _ => FieldValue::Text(n.to_string()),
        },
        Value::String(s) => normalize(s),
        Value::Bool(b) => FieldValue::Text(b.to_string()),
        nested => FieldValue::Text(nested.to_string()),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_become_records_with_union_of_keys() {
        let ds = parse_json(
            r#"[
                {"Project Name": "Alpha", "Total Project Budget": 1000},
                {"Project Name": "Beta", "Project Progress": "45", "Total Project Budget": null}
            ]"#,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.headers.len(), 3);
        assert_eq!(
            ds.records[0].get("Project Progress"),
            Some(&FieldValue::Missing)
        );
        assert_eq!(
            ds.records[0].get("Total Project Budget"),
            Some(&FieldValue::Number(1000.0))
        );
        assert_eq!(
            ds.records[1].get("Project Progress"),
            Some(&FieldValue::Number(45.0))
        );
        assert_eq!(
            ds.records[1].get("Total Project Budget"),
            Some(&FieldValue::Missing)
        );
    }

    #[test]
    fn headers_follow_key_order_in_source() {
        let ds = parse_json(
            r#"[
                {"Project Name": "A", "Budget": 1, "Actual": 2},
                {"Zone": "north", "Project Name": "B"}
            ]"#,
        )
        .unwrap();
        assert_eq!(ds.headers, vec!["Project Name", "Budget", "Actual", "Zone"]);
    }

    #[test]
    fn strings_are_normalized() {
        let ds = parse_json(r#"[{"a": " ", "b": "NaN", "c": true}]"#).unwrap();
        let rec = &ds.records[0];
        assert_eq!(rec.get("a"), Some(&FieldValue::Missing));
        assert_eq!(rec.get("b"), Some(&FieldValue::Text("NaN".into())));
        assert_eq!(rec.get("c"), Some(&FieldValue::Text("true".into())));
    }

    #[test]
    fn non_array_is_rejected() {
        let err = parse_json(r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidExport(_)), "{err}");
    }

    #[test]
    fn non_object_element_is_rejected() {
        let err = parse_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DashboardError::InvalidExport(_)), "{err}");
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            parse_json("[{").unwrap_err(),
            DashboardError::Json(_)
        ));
    }
}
