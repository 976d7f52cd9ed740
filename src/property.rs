//! Canonical property maps and row projection.
//!
//! A handler exposes a fixed, ordered set of public column names, each
//! backed by one upstream hit field. Projection turns a raw hit into a row
//! in the caller's column order.

use serde_json::{Map, Value};

use crate::params::PropertySelection;

/// One upstream search result (a story or a comment).
pub type RawHit = Map<String, Value>;

/// A projected output row.
pub type Row = Vec<Value>;

/// A public column name, its upstream field, and what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,
    pub field: &'static str,
    pub description: &'static str,
}

impl Property {
    pub const fn new(name: &'static str, field: &'static str, description: &'static str) -> Self {
        Self {
            name,
            field,
            description,
        }
    }
}

/// What a missing or unknown value becomes in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyValue {
    /// Missing and falsy values become `""`.
    EmptyString,
    /// Values pass through untouched; missing ones become `null`.
    Null,
}

/// Ordered public-name → upstream-field mapping of one handler.
#[derive(Debug, Clone, Copy)]
pub struct PropertyMap {
    properties: &'static [Property],
}

impl PropertyMap {
    pub const fn new(properties: &'static [Property]) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &'static [Property] {
        self.properties
    }

    /// Public names in canonical order.
    pub fn names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.to_string()).collect()
    }

    /// Upstream field behind a public name.
    pub fn field(&self, name: &str) -> Option<&'static str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.field)
    }

    /// Expand a wildcard selection to every property; keep anything else as
    /// given, unknown names included.
    pub fn resolve(&self, selection: &PropertySelection) -> Vec<String> {
        if selection.is_wildcard() {
            self.names()
        } else {
            selection.names().to_vec()
        }
    }

    /// Precompute the upstream field of each resolved column.
    pub fn projector(&self, columns: &[String], empty: EmptyValue) -> Projector {
        Projector {
            fields: columns.iter().map(|c| self.field(c)).collect(),
            empty,
        }
    }
}

/// Projects raw hits onto a fixed column list.
#[derive(Debug, Clone)]
pub struct Projector {
    fields: Vec<Option<&'static str>>,
    empty: EmptyValue,
}

impl Projector {
    pub fn project(&self, hit: &RawHit) -> Row {
        self.fields
            .iter()
            .map(|field| {
                let value = field.and_then(|f| hit.get(f));
                match self.empty {
                    EmptyValue::Null => value.cloned().unwrap_or(Value::Null),
                    EmptyValue::EmptyString => match value {
                        Some(v) if !is_falsy(v) => v.clone(),
                        _ => Value::String(String::new()),
                    },
                }
            })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[Property] = &[
        Property::new("title", "story_title", ""),
        Property::new("comment", "comment_text", ""),
        Property::new("points", "points", ""),
    ];
    const COMMENTS: PropertyMap = PropertyMap::new(FIELDS);

    fn hit(value: Value) -> RawHit {
        match value {
            Value::Object(map) => map,
            _ => panic!("test hit must be an object"),
        }
    }

    #[test]
    fn wildcard_resolves_in_canonical_order() {
        let columns = COMMENTS.resolve(&PropertySelection::all());
        assert_eq!(columns, ["title", "comment", "points"]);
    }

    #[test]
    fn explicit_selection_keeps_caller_order_and_unknowns() {
        let selection = PropertySelection::from_names(["comment", "bogus", "title"]);
        assert_eq!(COMMENTS.resolve(&selection), ["comment", "bogus", "title"]);
    }

    #[test]
    fn renamed_fields_are_projected() {
        let columns = COMMENTS.resolve(&PropertySelection::all());
        let projector = COMMENTS.projector(&columns, EmptyValue::EmptyString);
        let row = projector.project(&hit(json!({
            "story_title": "Show HN",
            "comment_text": "nice",
            "points": 12,
            "title": "ignored"
        })));
        assert_eq!(row, vec![json!("Show HN"), json!("nice"), json!(12)]);
    }

    #[test]
    fn empty_string_policy_blanks_missing_and_falsy() {
        let columns: Vec<String> = vec![
            "title".into(),
            "points".into(),
            "bogus".into(),
            "comment".into(),
        ];
        let projector = COMMENTS.projector(&columns, EmptyValue::EmptyString);
        let row = projector.project(&hit(json!({"story_title": null, "points": 0})));
        assert_eq!(row, vec![json!(""), json!(""), json!(""), json!("")]);
        assert_eq!(projector.width(), 4);
    }

    #[test]
    fn null_policy_passes_values_through() {
        let columns: Vec<String> = vec!["points".into(), "comment".into(), "bogus".into()];
        let projector = COMMENTS.projector(&columns, EmptyValue::Null);
        let row = projector.project(&hit(json!({"points": 0})));
        assert_eq!(row, vec![json!(0), Value::Null, Value::Null]);
    }
}
