use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::{null_as_default, CollectionItem, ItemId};

/// A group as persisted in the groups blob. `content` is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utente: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_editing: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Group {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: Value::Null,
            timestamp: None,
            utente: None,
            is_editing: false,
            kind: None,
        }
    }
}

impl CollectionItem for Group {
    const KIND: &'static str = "groups";

    fn id(&self) -> &ItemId {
        &self.id
    }
}
