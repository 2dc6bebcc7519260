//! Wire codec for a collection blob.
//!
//! Version 1 layout of the `dataValue` string:
//! `[<items>, [{"isOccupied": <bool>}]]`

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::ModelError;
use crate::item::CollectionItem;

pub const ENVELOPE_VERSION: u32 = 1;

/// Decoded collection plus its advisory occupancy flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub occupied: bool,
}

impl<T> Snapshot<T> {
    pub fn new(items: Vec<T>, occupied: bool) -> Self {
        Self { items, occupied }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new(), occupied: false }
    }
}

#[derive(Serialize)]
struct OccupancyMarker {
    #[serde(rename = "isOccupied")]
    is_occupied: bool,
}

/// Encode items and flag into the `dataValue` string.
pub fn encode<T: CollectionItem>(items: &[T], occupied: bool) -> Result<String, ModelError> {
    let marker = [OccupancyMarker { is_occupied: occupied }];
    serde_json::to_string(&(items, marker)).map_err(|e| ModelError::Encode(e.to_string()))
}

/// Decode a `dataValue` string. Absent or blank data is an empty, free collection.
pub fn decode<T: CollectionItem>(raw: Option<&str>) -> Result<Snapshot<T>, ModelError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(Snapshot::empty()),
        Some(raw) => raw,
    };
    let value: Value = serde_json::from_str(raw).map_err(|e| ModelError::Decode(e.to_string()))?;

    let mut parts = match value {
        Value::Array(parts) if parts.len() == 2 => parts.into_iter(),
        Value::Array(parts) => {
            return Err(ModelError::Shape(format!("expected 2 elements, got {}", parts.len())))
        }
        other => return Err(ModelError::Shape(format!("expected an array, got {}", json_kind(&other)))),
    };
    let (items, meta) = match (parts.next(), parts.next()) {
        (Some(items), Some(meta)) => (items, meta),
        _ => return Err(ModelError::Shape("envelope truncated".into())),
    };

    let entries = match items {
        Value::Array(entries) => entries,
        other => {
            return Err(ModelError::Shape(format!("items must be an array, got {}", json_kind(&other))))
        }
    };
    let occupied = meta
        .get(0)
        .and_then(|m| m.get("isOccupied"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Snapshot { items: project_entries(entries), occupied })
}

/// Drop `null` and malformed entries, projecting the rest onto `T`.
pub fn project_entries<T: CollectionItem>(entries: Vec<Value>) -> Vec<T> {
    let total = entries.len();
    let mut out = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        if entry.is_null() {
            continue;
        }
        match serde_json::from_value::<T>(entry) {
            Ok(item) => out.push(item),
            Err(e) => warn!(collection = T::KIND, index, error = %e, "dropping malformed entry"),
        }
    }
    if out.len() != total {
        warn!(collection = T::KIND, kept = out.len(), total, "filtered collection entries");
    }
    out
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
