//! Domain types for the ONO app-data collections.
//! - `Note` and `Group` are the canonical item projections.
//! - `envelope` is the wire codec for a whole collection blob.
//! - `collection` holds the pure upsert logic used by the store.

pub mod errors;
pub mod key;
pub mod item;
pub mod note;
pub mod group;
pub mod envelope;
pub mod collection;

pub use collection::{apply_patch, Applied};
pub use envelope::Snapshot;
pub use group::Group;
pub use item::{CollectionItem, ItemId, Patch};
pub use key::{CollectionKey, Operator};
pub use note::{Note, NoteBody};

#[cfg(test)]
mod tests;
