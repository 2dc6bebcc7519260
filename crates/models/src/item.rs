use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::ModelError;

/// Shallow patch applied over an item: top-level keys replace the item's keys.
pub type Patch = serde_json::Map<String, Value>;

/// Item identifier as stored by the UI: a number or a string.
/// Comparison is strict, `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
    /// Any other JSON number (fractional, or beyond `i64`), kept verbatim.
    Decimal(serde_json::Number),
}

impl ItemId {
    pub fn to_value(&self) -> Value {
        match self {
            ItemId::Number(n) => Value::from(*n),
            ItemId::Text(s) => Value::from(s.as_str()),
            ItemId::Decimal(n) => Value::Number(n.clone()),
        }
    }

    /// Parse a command-line style id: integers become `Number`, anything else `Text`.
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>().map(ItemId::Number).unwrap_or_else(|_| ItemId::Text(raw.to_string()))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{n}"),
            ItemId::Text(s) => write!(f, "{s:?}"),
            ItemId::Decimal(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Number(n)
    }
}

impl From<i32> for ItemId {
    fn from(n: i32) -> Self {
        ItemId::Number(i64::from(n))
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::Text(s)
    }
}

/// Field deserializer that reads an explicit `null` as the type's default,
/// so entries written with empty fields still project.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An entry of a remote collection. Deserializing into the implementor is the
/// canonical projection: unknown fields are dropped.
pub trait CollectionItem:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Collection name used in logs and errors.
    const KIND: &'static str;

    fn id(&self) -> &ItemId;

    fn to_patch(&self) -> Result<Patch, ModelError> {
        match serde_json::to_value(self).map_err(|e| ModelError::Encode(e.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(ModelError::Encode(format!("{} did not encode to an object: {other}", Self::KIND))),
        }
    }
}

/// Overlay `patch` on `existing` and re-project the result.
pub fn merge_patch<T: CollectionItem>(existing: &T, patch: &Patch) -> Result<T, ModelError> {
    let mut merged = existing.to_patch()?;
    for (k, v) in patch {
        merged.insert(k.clone(), v.clone());
    }
    serde_json::from_value(Value::Object(merged)).map_err(|e| ModelError::InvalidPatch(e.to_string()))
}

/// Build a new item from a patch, defaulting its `id` to `id`.
pub fn item_from_patch<T: CollectionItem>(id: &ItemId, patch: &Patch) -> Result<T, ModelError> {
    let mut obj = patch.clone();
    obj.entry("id").or_insert_with(|| id.to_value());
    serde_json::from_value(Value::Object(obj)).map_err(|e| ModelError::InvalidPatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_is_strict_between_number_and_text() {
        let n: ItemId = serde_json::from_str("1").unwrap();
        let s: ItemId = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(n, ItemId::Number(1));
        assert_eq!(s, ItemId::Text("1".into()));
        assert_ne!(n, s);
    }

    #[test]
    fn parse_lenient_prefers_numbers() {
        assert_eq!(ItemId::parse_lenient(" 1700000000000 "), ItemId::Number(1_700_000_000_000));
        assert_eq!(ItemId::parse_lenient("abc-1"), ItemId::Text("abc-1".into()));
    }

    #[test]
    fn fractional_and_large_ids_are_kept_verbatim() {
        let frac: ItemId = serde_json::from_str("1700000000000.5").unwrap();
        let big: ItemId = serde_json::from_str("18446744073709551615").unwrap();
        assert!(matches!(frac, ItemId::Decimal(_)));
        assert!(matches!(big, ItemId::Decimal(_)));
        assert_eq!(frac.to_value(), serde_json::json!(1700000000000.5));
        assert_eq!(serde_json::to_string(&big).unwrap(), "18446744073709551615");
        assert_ne!(frac, ItemId::Number(1_700_000_000_000));
    }
}
