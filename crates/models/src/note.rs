use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::{null_as_default, CollectionItem, ItemId};

/// A note as persisted in the notes blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Author as written by the UI; usually a name, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utente: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_editing: bool,
    #[serde(flatten)]
    pub body: NoteBody,
}

/// Type-specific part of a note, tagged by the `type` field.
/// A note whose `type` is neither `classic` nor `list` has no projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoteBody {
    Classic {
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },
    List {
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<Value>,
    },
}

impl Note {
    pub fn classic(id: impl Into<ItemId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timestamp: None,
            utente: None,
            is_editing: false,
            body: NoteBody::Classic { content: content.into() },
        }
    }

    pub fn list(id: impl Into<ItemId>, title: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timestamp: None,
            utente: None,
            is_editing: false,
            body: NoteBody::List { items },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            NoteBody::Classic { .. } => "classic",
            NoteBody::List { .. } => "list",
        }
    }
}

impl CollectionItem for Note {
    const KIND: &'static str = "notes";

    fn id(&self) -> &ItemId {
        &self.id
    }
}
