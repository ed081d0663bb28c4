//! Field values stored on tracked items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An option of an enumerated field (status, resolution, user lists, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumOption {
    /// Option identifier as stored on the item.
    pub id: String,

    /// Display name, if the option is defined in the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EnumOption {
    /// Creates an option that has no schema entry.
    pub fn phantom(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Returns true if the option is not defined in the schema.
    pub fn is_phantom(&self) -> bool {
        self.name.is_none()
    }
}

/// The value of a custom field on a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Native integer value.
    Integer(i64),
    /// Plain text value.
    Text(String),
    /// Enumeration option.
    Option(EnumOption),
}

impl FieldValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the value rendered as a string, as the tracker would show it
    /// in a plain text context.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Text(value) => value.clone(),
            FieldValue::Option(option) => option.id.clone(),
        }
    }

    /// Returns the enumeration option, if this is one.
    pub fn as_option(&self) -> Option<&EnumOption> {
        match self {
            FieldValue::Option(option) => Some(option),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text() {
        assert_eq!(FieldValue::Integer(42).as_text(), "42");
        assert_eq!(FieldValue::text("1,2").as_text(), "1,2");
        assert_eq!(
            FieldValue::Option(EnumOption::phantom("alice")).as_text(),
            "alice"
        );
    }

    #[test]
    fn test_tagged_serialization() {
        let json = serde_json::to_string(&FieldValue::Integer(7)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":7}"#);

        let parsed: FieldValue =
            serde_json::from_str(r#"{"type":"text","value":"10"}"#).unwrap();
        assert_eq!(parsed, FieldValue::text("10"));
    }

    #[test]
    fn test_phantom_option() {
        let option = EnumOption::phantom("bob");
        assert!(option.is_phantom());
        assert!(FieldValue::Option(option).as_option().is_some());
        assert!(FieldValue::Integer(1).as_option().is_none());
    }
}
