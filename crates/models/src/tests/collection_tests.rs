use serde_json::json;

use crate::collection::{apply_patch, Applied};
use crate::errors::ModelError;
use crate::{Group, ItemId, Note, NoteBody, Patch};

fn patch(value: serde_json::Value) -> Patch {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("patch must be an object: {other}"),
    }
}

#[test]
fn merge_replaces_title_of_existing_item() -> anyhow::Result<()> {
    let mut items = vec![Group::new(1, "A")];
    let applied = apply_patch(&mut items, &ItemId::Number(1), &patch(json!({"id": 1, "title": "B"})))?;
    assert_eq!(applied, Applied::Merged { index: 0 });
    assert_eq!(items, vec![Group::new(1, "B")]);
    Ok(())
}

#[test]
fn missing_id_appends_patch_as_new_item() -> anyhow::Result<()> {
    let mut items: Vec<Group> = Vec::new();
    let applied = apply_patch(&mut items, &ItemId::Number(2), &patch(json!({"id": 2, "title": "X"})))?;
    assert_eq!(applied, Applied::Appended { index: 0 });
    assert_eq!(items, vec![Group::new(2, "X")]);
    Ok(())
}

#[test]
fn merge_keeps_other_items_and_length() -> anyhow::Result<()> {
    let mut items = vec![
        Note::classic(1, "one", "a"),
        Note::classic(2, "two", "b"),
        Note::list(3, "three", vec![]),
    ];
    let before = items.clone();
    apply_patch(&mut items, &ItemId::Number(2), &patch(json!({"content": "updated", "isEditing": true})))?;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0], before[0]);
    assert_eq!(items[2], before[2]);
    assert_eq!(items[1].title, "two");
    assert!(items[1].is_editing);
    assert_eq!(items[1].body, NoteBody::Classic { content: "updated".into() });
    Ok(())
}

#[test]
fn append_defaults_id_from_lookup() -> anyhow::Result<()> {
    let mut items = vec![Group::new("a", "first")];
    apply_patch(&mut items, &ItemId::from("b"), &patch(json!({"title": "second"})))?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].id, ItemId::from("b"));
    Ok(())
}

#[test]
fn numeric_and_text_ids_do_not_match() -> anyhow::Result<()> {
    let mut items = vec![Group::new(1, "number")];
    apply_patch(&mut items, &ItemId::from("1"), &patch(json!({"title": "text"})))?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "number");
    Ok(())
}

#[test]
fn switching_note_type_reprojects_body() -> anyhow::Result<()> {
    let mut items = vec![Note::classic(1, "todo", "buy milk")];
    apply_patch(&mut items, &ItemId::Number(1), &patch(json!({"type": "list", "items": ["milk"]})))?;
    assert_eq!(items[0].body, NoteBody::List { items: vec![json!("milk")] });
    Ok(())
}

#[test]
fn invalid_patch_leaves_collection_untouched() {
    let mut items = vec![Note::classic(1, "n", "c")];
    let before = items.clone();
    let merged = apply_patch(&mut items, &ItemId::Number(1), &patch(json!({"type": "sketch"})));
    assert!(matches!(merged, Err(ModelError::InvalidPatch(_))));
    let appended = apply_patch(&mut items, &ItemId::Number(9), &patch(json!({"title": "no type"})));
    assert!(matches!(appended, Err(ModelError::InvalidPatch(_))));
    assert_eq!(items, before);
}
