//! Registry domain model
//!
//! A [`Record`] is the raw JSON object returned by the registry, kept as-is
//! (field order preserved) so projections can see every column. Typed views
//! exist only for the parts the sync logic reasons about: the key, the
//! packages and the shades.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Field holding the unique registry key
pub const KEY_FIELD: &str = "notificationCode";
pub const PACKAGES_FIELD: &str = "packages";
pub const SHADES_FIELD: &str = "shades";

/// `businessNotificationItemId` applied by [`FilterMode::Filtered`]
pub const FILTER_NOTIFICATION_ITEM_ID: u32 = 34;

/// `businessTypeNotificationId` applied by [`FilterMode::Filtered`]
pub const FILTER_TYPE_NOTIFICATION_ID: u32 = 5;

/// Which registry query a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Plain query over the whole registry
    Unfiltered,
    /// Query restricted by the two business notification constraints
    Filtered,
}

impl FilterMode {
    /// Server-side constraints as (`businessNotificationItemId`, `businessTypeNotificationId`)
    pub fn constraints(self) -> Option<(u32, u32)> {
        match self {
            FilterMode::Unfiltered => None,
            FilterMode::Filtered => Some((FILTER_NOTIFICATION_ITEM_ID, FILTER_TYPE_NOTIFICATION_ID)),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Unfiltered => write!(f, "unfiltered"),
            FilterMode::Filtered => write!(f, "filtered"),
        }
    }
}

/// One registry record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a record from a JSON value, rejecting anything but an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The unique key, if present and non-empty
    pub fn notification_code(&self) -> Option<String> {
        self.0
            .get(KEY_FIELD)
            .map(scalar_text)
            .filter(|code| !code.is_empty())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field rendered as cell text; absent fields become the empty string
    pub fn text(&self, field: &str) -> String {
        self.0.get(field).map(scalar_text).unwrap_or_default()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Package sub-records; non-object entries are skipped
    pub fn packages(&self) -> Vec<Package> {
        self.objects_in(PACKAGES_FIELD).map(Package::from_fields).collect()
    }

    /// Named shades in registry order; shades without a name are dropped
    pub fn shades(&self) -> Vec<Shade> {
        self.objects_in(SHADES_FIELD)
            .filter_map(|shade| shade.get("shadeName").map(scalar_text))
            .filter(|name| !name.is_empty())
            .map(|name| Shade { name })
            .collect()
    }

    fn objects_in<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A package size offered for a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

impl Package {
    /// Read `packageName`, `quantity` and `measurementDesc`; absent parts are empty
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let part = |key: &str| fields.get(key).map(scalar_text).unwrap_or_default();
        Self {
            name: part("packageName"),
            quantity: part("quantity"),
            unit: part("measurementDesc"),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.quantity.is_empty() && self.unit.is_empty()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = format!("{} {} {}", self.name, self.quantity, self.unit);
        f.write_str(text.trim())
    }
}

/// A colour variant of a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shade {
    pub name: String,
}

/// One page as returned by the registry
///
/// `reported_total` and `reported_page_size` are whatever the server claimed
/// for this request; they drift between calls and are treated as hints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub reported_total: u64,
    pub reported_page_size: u64,
}

impl Page {
    /// The degraded result of a request that never succeeded
    pub fn empty(requested_page_size: u32) -> Self {
        Self {
            records: Vec::new(),
            reported_total: 0,
            reported_page_size: u64::from(requested_page_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of adding a record to a [`Dataset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    /// Key already present; the first-seen record was kept
    Duplicate(String),
    /// Record has no key; kept, but it can never be matched or deduplicated
    MissingKey,
}

/// Records for one view, unique by notification code, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present (first-seen wins)
    pub fn insert(&mut self, record: Record) -> InsertOutcome {
        match record.notification_code() {
            Some(code) if self.index.contains_key(&code) => InsertOutcome::Duplicate(code),
            Some(code) => {
                self.index.insert(code, self.records.len());
                self.records.push(record);
                InsertOutcome::Added
            },
            None => {
                self.records.push(record);
                InsertOutcome::MissingKey
            },
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&Record> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that carry a notification code
    pub fn keyed_len(&self) -> usize {
        self.index.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Render a JSON scalar the way a spreadsheet cell shows it
///
/// Strings are taken verbatim, `null` is empty, numbers and booleans use their
/// JSON text. Compound values fall back to compact JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_notification_code_accepts_numbers_and_rejects_blank() {
        assert_eq!(
            record(json!({"notificationCode": "A-1"})).notification_code().as_deref(),
            Some("A-1")
        );
        assert_eq!(
            record(json!({"notificationCode": 42})).notification_code().as_deref(),
            Some("42")
        );
        assert_eq!(record(json!({"notificationCode": ""})).notification_code(), None);
        assert_eq!(record(json!({"notificationCode": null})).notification_code(), None);
        assert_eq!(record(json!({})).notification_code(), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("x")).is_none());
    }

    #[test]
    fn test_packages_and_display() {
        let r = record(json!({
            "packages": [
                {"packageName": "Box", "quantity": 2, "measurementDesc": "ml"},
                {"packageName": "Tube", "quantity": "", "measurementDesc": ""},
                "garbage"
            ]
        }));
        let packages = r.packages();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].to_string(), "Box 2 ml");
        assert_eq!(packages[1].to_string(), "Tube");
    }

    #[test]
    fn test_shades_skip_unnamed() {
        let r = record(json!({
            "shades": [{"shadeName": "Red"}, {"shadeName": ""}, {"other": 1}, {"shadeName": "Blue"}]
        }));
        let names: Vec<_> = r.shades().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Red", "Blue"]);
    }

    #[test]
    fn test_dataset_first_seen_wins() {
        let mut ds = Dataset::new();
        assert_eq!(
            ds.insert(record(json!({"notificationCode": "A", "v": 1}))),
            InsertOutcome::Added
        );
        assert_eq!(
            ds.insert(record(json!({"notificationCode": "A", "v": 2}))),
            InsertOutcome::Duplicate("A".to_string())
        );
        assert_eq!(ds.insert(record(json!({"v": 3}))), InsertOutcome::MissingKey);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.keyed_len(), 1);
        assert_eq!(ds.get("A").unwrap().text("v"), "1");
    }

    #[test]
    fn test_filter_mode_constraints() {
        assert_eq!(FilterMode::Unfiltered.constraints(), None);
        assert_eq!(FilterMode::Filtered.constraints(), Some((34, 5)));
    }
}
