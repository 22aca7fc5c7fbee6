//! Item records: the posts that get positioned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ItemFlags, Position3};

/// An arbitrary item record.
///
/// Only `id` and the coordinate fields are interpreted by the layout engine;
/// every other field (owner keys, text, timestamps...) is carried through
/// untouched so the record can be handed back to a renderer or exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Unique item identifier
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Diagnostic flags from the last layout run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<ItemFlags>,
    /// Remaining fields of the record
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ItemRecord {
    /// Creates an item with no position and no extra fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: None,
            y: None,
            z: None,
            flags: None,
            fields: Map::new(),
        }
    }

    /// Builder-style helper to attach a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field as a matching key.
    ///
    /// Strings are returned verbatim and numbers in their JSON text form;
    /// other value kinds (null, bools, arrays, objects) never match.
    pub fn key(&self, field: &str) -> Option<String> {
        if field == "id" {
            return Some(self.id.clone());
        }
        match self.fields.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns the pre-existing position if all three coordinates are set.
    pub fn position(&self) -> Option<Position3> {
        match (self.x, self.y, self.z) {
            (Some(x), Some(y), Some(z)) => Some(Position3::new(x, y, z)),
            _ => None,
        }
    }

    /// Overwrites the coordinates.
    pub fn set_position(&mut self, position: Position3) {
        self.x = Some(position.x);
        self.y = Some(position.y);
        self.z = Some(position.z);
    }

    /// Removes the coordinates (item was not placed).
    pub fn clear_position(&mut self) {
        self.x = None;
        self.y = None;
        self.z = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key_string_and_number() {
        let item = ItemRecord::new("p1")
            .with_field("character", "mira")
            .with_field("author", 42);

        assert_eq!(item.key("character"), Some("mira".to_string()));
        assert_eq!(item.key("author"), Some("42".to_string()));
        assert_eq!(item.key("missing"), None);
        assert_eq!(item.key("id"), Some("p1".to_string()));
    }

    #[test]
    fn test_item_key_ignores_empty_and_null() {
        let item = ItemRecord::new("p2")
            .with_field("character", "")
            .with_field("author", Value::Null);

        assert_eq!(item.key("character"), None);
        assert_eq!(item.key("author"), None);
    }

    #[test]
    fn test_item_position_round_trip_fields() {
        let mut item = ItemRecord::new("p3");
        assert!(item.position().is_none());

        item.set_position(Position3::new(1.0, 2.0, 3.0));
        assert_eq!(item.position(), Some(Position3::new(1.0, 2.0, 3.0)));

        item.clear_position();
        assert!(item.position().is_none());
    }

    #[test]
    fn test_item_preserves_unknown_fields() {
        let json = r#"{"id":"p4","character":"voss","text":"hello","likes":3,"x":1.5}"#;
        let item: ItemRecord = serde_json::from_str(json).unwrap();

        assert_eq!(item.x, Some(1.5));
        assert!(item.y.is_none());
        assert_eq!(item.fields.get("text"), Some(&Value::from("hello")));

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["likes"], Value::from(3));
        assert_eq!(out["character"], Value::from("voss"));
    }
}
