use crate::errors::ModelError;
use crate::item::{item_from_patch, merge_patch, CollectionItem, ItemId, Patch};

/// Outcome of an upsert on an in-memory collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Merged { index: usize },
    Appended { index: usize },
}

/// Upsert by id: merge over the first match, or append a new item.
/// `items` is left untouched when the patch does not decode.
pub fn apply_patch<T: CollectionItem>(
    items: &mut Vec<T>,
    id: &ItemId,
    patch: &Patch,
) -> Result<Applied, ModelError> {
    match items.iter().position(|item| item.id() == id) {
        Some(index) => {
            let merged = merge_patch(&items[index], patch)?;
            items[index] = merged;
            Ok(Applied::Merged { index })
        }
        None => {
            let item = item_from_patch(id, patch)?;
            items.push(item);
            Ok(Applied::Appended { index: items.len() - 1 })
        }
    }
}
