//! Record flattening
//!
//! Nested objects become `parent_child` columns. Every value is classified
//! into a [`FieldValue`] first and the walk matches on that, so the special
//! cases are explicit:
//!
//! | value                  | column text                               |
//! |------------------------|-------------------------------------------|
//! | scalar                 | the scalar as text                        |
//! | `packages` list        | packages joined with `" | "`              |
//! | `shades` list          | skipped; shades expand into rows instead  |
//! | any other list         | compact JSON                              |
//! | object                 | flattened with the key as prefix          |

use super::CELL_DELIMITER;
use crate::model::{scalar_text, Package, Record, PACKAGES_FIELD, SHADES_FIELD};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Separator between a parent key and a nested key
pub const KEY_SEPARATOR: &str = "_";

/// Shape of one JSON value as the flattener sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(&'a Value),
    /// A list holding no objects (empty lists included)
    ScalarList(&'a [Value]),
    /// A list holding at least one object
    RecordList(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> FieldValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) if items.iter().any(Value::is_object) => FieldValue::RecordList(items),
            Value::Array(items) => FieldValue::ScalarList(items),
            Value::Object(fields) => FieldValue::Map(fields),
            scalar => FieldValue::Scalar(scalar),
        }
    }
}

/// Flattened record: column name to cell text, in first-seen column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    columns: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl FlatRecord {
    /// Set a column; a repeated name overwrites the value but keeps its position
    fn set(&mut self, column: String, text: String) {
        match self.index.get(&column) {
            Some(&i) => self.columns[i].1 = text,
            None => {
                self.index.insert(column.clone(), self.columns.len());
                self.columns.push((column, text));
            },
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.index.get(column).map(|&i| self.columns[i].1.as_str())
    }

    /// Cell text for `column`, empty when absent
    pub fn cell(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Flatten every field of `record` except its shades
pub fn flatten_record(record: &Record) -> FlatRecord {
    let mut flat = FlatRecord::default();
    walk(record.fields(), None, &mut flat);
    flat
}

fn walk(fields: &Map<String, Value>, prefix: Option<&str>, flat: &mut FlatRecord) {
    for (key, value) in fields {
        let column = match prefix {
            Some(parent) => format!("{parent}{KEY_SEPARATOR}{key}"),
            None => key.clone(),
        };

        match (key.as_str(), FieldValue::classify(value)) {
            (PACKAGES_FIELD, FieldValue::RecordList(items) | FieldValue::ScalarList(items)) => {
                flat.set(column, format_packages(items));
            },
            (SHADES_FIELD, FieldValue::RecordList(_) | FieldValue::ScalarList(_)) => {},
            (_, FieldValue::Map(nested)) => walk(nested, Some(&column), flat),
            (_, FieldValue::RecordList(_) | FieldValue::ScalarList(_)) => {
                flat.set(column, value.to_string());
            },
            (_, FieldValue::Scalar(scalar)) => flat.set(column, scalar_text(scalar)),
        }
    }
}

/// `"name quantity unit"` per package, joined with `" | "`
///
/// Entries that are not objects, or carry none of the three parts, are skipped.
pub fn format_packages(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(Package::from_fields)
        .filter(|pkg| !pkg.is_blank())
        .map(|pkg| pkg.to_string())
        .collect::<Vec<_>>()
        .join(CELL_DELIMITER)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(value: Value) -> FlatRecord {
        flatten_record(&Record::from_value(value).unwrap())
    }

    #[test]
    fn test_classify() {
        assert!(matches!(FieldValue::classify(&json!("x")), FieldValue::Scalar(_)));
        assert!(matches!(FieldValue::classify(&json!(null)), FieldValue::Scalar(_)));
        assert!(matches!(FieldValue::classify(&json!([])), FieldValue::ScalarList(_)));
        assert!(matches!(FieldValue::classify(&json!([1, "a"])), FieldValue::ScalarList(_)));
        assert!(matches!(FieldValue::classify(&json!([1, {"a": 1}])), FieldValue::RecordList(_)));
        assert!(matches!(FieldValue::classify(&json!({"a": 1})), FieldValue::Map(_)));
    }

    #[test]
    fn test_single_package() {
        let packages = json!([{"packageName": "Box", "quantity": "2", "measurementDesc": "ml"}]);
        assert_eq!(format_packages(packages.as_array().unwrap()), "Box 2 ml");
    }

    #[test]
    fn test_multiple_packages_join_with_delimiter() {
        let packages = json!([
            {"packageName": "Box", "quantity": 2, "measurementDesc": "ml"},
            {"packageName": "", "quantity": "", "measurementDesc": ""},
            {"packageName": "Jar", "quantity": 50, "measurementDesc": "g"},
            7
        ]);
        assert_eq!(format_packages(packages.as_array().unwrap()), "Box 2 ml | Jar 50 g");
    }

    #[test]
    fn test_nested_maps_join_keys() {
        let f = flat(json!({
            "notificationCode": "N1",
            "owner": {"name": "Acme", "address": {"city": "Haifa"}},
            "active": true
        }));

        let names: Vec<_> = f.column_names().collect();
        assert_eq!(names, vec!["notificationCode", "owner_name", "owner_address_city", "active"]);
        assert_eq!(f.get("owner_address_city"), Some("Haifa"));
        assert_eq!(f.get("active"), Some("true"));
    }

    #[test]
    fn test_lists_and_shades() {
        let f = flat(json!({
            "notificationCode": "N1",
            "tags": ["a", "b"],
            "ingredients": [{"name": "Water"}],
            "packages": [{"packageName": "Tube", "quantity": 30, "measurementDesc": "ml"}],
            "shades": [{"shadeName": "Red"}]
        }));

        assert_eq!(f.get("tags"), Some(r#"["a","b"]"#));
        assert_eq!(f.get("ingredients"), Some(r#"[{"name":"Water"}]"#));
        assert_eq!(f.get("packages"), Some("Tube 30 ml"));
        assert_eq!(f.get("shades"), None);
        assert_eq!(f.cell("missing"), "");
    }

    #[test]
    fn test_nested_packages_are_formatted() {
        let f = flat(json!({
            "variant": {"packages": [{"packageName": "Box", "quantity": 1, "measurementDesc": "pc"}]}
        }));
        assert_eq!(f.get("variant_packages"), Some("Box 1 pc"));
    }

    #[test]
    fn test_non_list_shades_is_a_plain_field() {
        let f = flat(json!({"shades": "none"}));
        assert_eq!(f.get("shades"), Some("none"));
    }
}
