use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one blob on the remote app-data store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionKey {
    #[serde(rename = "appCode")]
    pub app_code: String,
    #[serde(rename = "dataName")]
    pub data_name: String,
}

impl CollectionKey {
    pub fn new(app_code: impl Into<String>, data_name: impl Into<String>) -> Self {
        Self { app_code: app_code.into(), data_name: data_name.into() }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_code, self.data_name)
    }
}

/// Person operating the client. Passed to the store explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub surname: String,
}

impl Operator {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self { name: name.into(), surname: surname.into() }
    }

    pub fn display_name(&self) -> String {
        match (self.name.is_empty(), self.surname.is_empty()) {
            (false, false) => format!("{} {}", self.name, self.surname),
            (false, true) => self.name.clone(),
            (true, false) => self.surname.clone(),
            (true, true) => "anonymous".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_serializes_with_wire_names() {
        let key = CollectionKey::new("note_test", "test");
        let v = serde_json::to_value(&key).unwrap();
        assert_eq!(v, serde_json::json!({"appCode": "note_test", "dataName": "test"}));
        assert_eq!(key.to_string(), "note_test/test");
    }

    #[test]
    fn operator_display_name() {
        assert_eq!(Operator::new("Mamma", "Mia").display_name(), "Mamma Mia");
        assert_eq!(Operator::new("Mamma", "").display_name(), "Mamma");
        assert_eq!(Operator::default().display_name(), "anonymous");
    }
}
