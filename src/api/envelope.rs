use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{ReportError, Result};
use crate::report::GroupTotals;

/// Keys the list endpoints use for the row array.
const DATA_KEYS: [&str; 6] = ["data", "items", "rows", "records", "orders", "report"];

/// One page of a list response, whatever the endpoint called its fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub data: Vec<Value>,
    pub total_pages: Option<u32>,
    pub total_records: Option<u64>,
    pub totals: Option<GroupTotals>,
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    let pagination = obj.get("pagination").and_then(Value::as_object);
    keys.iter().find_map(|key| {
        obj.get(*key)
            .or_else(|| pagination.and_then(|p| p.get(*key)))
            .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
    })
}

/// Normalise a response body into an [`Envelope`]. A bare array is one page
/// holding everything.
pub fn parse_envelope(value: Value) -> std::result::Result<Envelope, String> {
    let mut obj = match value {
        Value::Array(data) => {
            return Ok(Envelope {
                data,
                ..Envelope::default()
            })
        }
        Value::Object(obj) => obj,
        other => return Err(format!("expected an object or array, got {other}")),
    };

    let total_pages = number_field(&obj, &["totalPages", "pages"]).map(|n| n as u32);
    let total_records = number_field(&obj, &["totalRecords", "total", "totalCount"]);
    let totals = ["totals", "grandTotals"]
        .iter()
        .find_map(|key| obj.get(*key).cloned())
        .map(serde_json::from_value::<GroupTotals>)
        .transpose()
        .map_err(|e| format!("invalid totals: {e}"))?;

    let key = DATA_KEYS
        .iter()
        .find(|k| obj.contains_key(**k))
        .ok_or_else(|| format!("none of {DATA_KEYS:?} present"))?;
    let data = match obj.remove(*key) {
        Some(Value::Array(data)) => data,
        // `{ data: { data: [...], totalPages } }` wraps the real envelope
        Some(inner @ Value::Object(_)) => {
            let inner = parse_envelope(inner)?;
            return Ok(Envelope {
                total_pages: inner.total_pages.or(total_pages),
                total_records: inner.total_records.or(total_records),
                totals: inner.totals.or(totals),
                data: inner.data,
            });
        }
        Some(Value::Null) | None => Vec::new(),
        Some(other) => return Err(format!("'{key}' is not an array: {other}")),
    };

    Ok(Envelope {
        data,
        total_pages,
        total_records,
        totals,
    })
}

/// Read a saved response body from disk.
pub fn load_envelope_file(path: &Path) -> Result<Envelope> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    parse_envelope(value).map_err(|reason| ReportError::BadEnvelope {
        url: path.display().to_string(),
        reason,
    })
}
