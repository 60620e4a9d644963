//! TaskProperty - タスク種別ごとのプロパティ記述子
//!
//! 各タスク種別は `static` な `TaskProperty` のカタログを持ちます。
//! カタログは宣言順に並び、実行時に変更されることはありません。
//!
//! # 学習ポイント
//! - `const fn` によるコンパイル時の記述子構築
//! - `&'static TaskProperty` をキーにした汎用マップ（PropertyValueMap）
//! - 閉じた値の列挙（PropertyValue）による網羅的な match

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::value;

/// The kind of value a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    String,
    Boolean,
    Integer,
    Long,
    Date,
    /// A duration string such as `5 minutes`.
    Duration,
    /// One of a fixed set of names; see [`TaskProperty::allowed_values`].
    Enumeration,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Integer => "integer",
            PropertyKind::Long => "long",
            PropertyKind::Date => "date",
            PropertyKind::Duration => "duration",
            PropertyKind::Enumeration => "enumeration",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable descriptor of one task property.
///
/// Identity is the wire attribute name: two descriptors with the same
/// attribute name compare equal, whichever catalogue they came from.
#[derive(Debug)]
pub struct TaskProperty {
    attribute_name: &'static str,
    display_name: &'static str,
    description: &'static str,
    kind: PropertyKind,
    required: bool,
    multi_valued: bool,
    advanced: bool,
    allowed_values: &'static [&'static str],
}

impl TaskProperty {
    pub const fn new(
        attribute_name: &'static str,
        display_name: &'static str,
        description: &'static str,
        kind: PropertyKind,
    ) -> Self {
        Self {
            attribute_name,
            display_name,
            description,
            kind,
            required: false,
            multi_valued: false,
            advanced: false,
            allowed_values: &[],
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub const fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    pub const fn with_allowed_values(mut self, values: &'static [&'static str]) -> Self {
        self.allowed_values = values;
        self
    }

    pub fn attribute_name(&self) -> &'static str {
        self.attribute_name
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    /// Canonical names for enumeration properties; empty otherwise.
    pub fn allowed_values(&self) -> &'static [&'static str] {
        self.allowed_values
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.attribute_name.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for TaskProperty {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_name == other.attribute_name
    }
}

impl Eq for TaskProperty {}

impl Hash for TaskProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute_name.hash(state);
    }
}

impl fmt::Display for TaskProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name)
    }
}

/// Finds a descriptor by attribute name (ASCII case-insensitive).
pub fn find_property(
    catalogue: &[&'static TaskProperty],
    attribute_name: &str,
) -> Option<&'static TaskProperty> {
    catalogue
        .iter()
        .copied()
        .find(|p| p.matches_name(attribute_name))
}

/// A raw property value before typed-accessor coercion.
///
/// JSON form is untagged: strings, booleans and numbers map directly and
/// dates are written as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Date(DateTime<Utc>),
}

impl PropertyValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Long(_) => "long",
            PropertyValue::Date(_) => "date",
        }
    }

    /// The attribute value this becomes in an entry.
    pub fn to_wire_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Boolean(b) => value::format_boolean(*b).to_string(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Long(l) => l.to_string(),
            PropertyValue::Date(d) => value::format_generalized_time(d),
        }
    }

    fn wrong_kind(&self, expected: &'static str) -> ValueError {
        ValueError::WrongKind {
            expected,
            actual: self.kind_name(),
        }
    }

    pub fn as_string(&self) -> Result<&str, ValueError> {
        match self {
            PropertyValue::String(s) => Ok(s),
            other => Err(other.wrong_kind("string")),
        }
    }

    /// Booleans may also arrive as their wire strings.
    pub fn to_bool(&self) -> Result<bool, ValueError> {
        match self {
            PropertyValue::Boolean(b) => Ok(*b),
            PropertyValue::String(s) => value::parse_boolean(s),
            other => Err(other.wrong_kind("boolean")),
        }
    }

    pub fn to_long(&self) -> Result<i64, ValueError> {
        match self {
            PropertyValue::Integer(i) => Ok(i64::from(*i)),
            PropertyValue::Long(l) => Ok(*l),
            PropertyValue::String(s) => value::parse_long(s),
            other => Err(other.wrong_kind("long")),
        }
    }

    pub fn to_integer(&self) -> Result<i32, ValueError> {
        match self {
            PropertyValue::Integer(i) => Ok(*i),
            PropertyValue::Long(l) => value::long_to_integer(*l),
            PropertyValue::String(s) => value::parse_integer(s),
            other => Err(other.wrong_kind("integer")),
        }
    }

    /// Dates may arrive as generalized time or RFC 3339 strings.
    pub fn to_date(&self) -> Result<DateTime<Utc>, ValueError> {
        match self {
            PropertyValue::Date(d) => value::time::checked_generalized_time(*d),
            PropertyValue::String(s) => value::parse_generalized_time(s).or_else(|err| {
                match DateTime::parse_from_rfc3339(s.trim()) {
                    Ok(d) => value::time::checked_generalized_time(d.with_timezone(&Utc)),
                    Err(_) => Err(err),
                }
            }),
            other => Err(other.wrong_kind("date")),
        }
    }

    pub fn to_duration_millis(&self) -> Result<u64, ValueError> {
        value::parse_duration_millis(self.as_string()?)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

/// Property → ordered, non-empty list of raw values.
///
/// A key is either present with at least one value or absent. Insertion
/// order is kept so maps built from a catalogue iterate in catalogue order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValueMap {
    entries: Vec<(&'static TaskProperty, Vec<PropertyValue>)>,
}

impl PropertyValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the values for `property`. An empty list removes the key.
    pub fn insert(&mut self, property: &'static TaskProperty, values: Vec<PropertyValue>) {
        if values.is_empty() {
            self.remove(property);
            return;
        }
        match self.entries.iter_mut().find(|(p, _)| *p == property) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((property, values)),
        }
    }

    pub fn insert_value(&mut self, property: &'static TaskProperty, value: impl Into<PropertyValue>) {
        self.insert(property, vec![value.into()]);
    }

    /// Inserts a single value when `value` is `Some`.
    pub fn insert_optional<V: Into<PropertyValue>>(
        &mut self,
        property: &'static TaskProperty,
        value: Option<V>,
    ) {
        if let Some(value) = value {
            self.insert_value(property, value);
        }
    }

    /// Inserts a list of strings when it is non-empty.
    pub fn insert_strings(&mut self, property: &'static TaskProperty, values: &[String]) {
        self.insert(
            property,
            values.iter().cloned().map(PropertyValue::String).collect(),
        );
    }

    pub fn with(mut self, property: &'static TaskProperty, values: Vec<PropertyValue>) -> Self {
        self.insert(property, values);
        self
    }

    pub fn remove(&mut self, property: &TaskProperty) -> Option<Vec<PropertyValue>> {
        let index = self.entries.iter().position(|(p, _)| *p == property)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, property: &TaskProperty) -> Option<&[PropertyValue]> {
        self.entries
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, values)| values.as_slice())
    }

    pub fn get_by_name(&self, attribute_name: &str) -> Option<&[PropertyValue]> {
        self.entries
            .iter()
            .find(|(p, _)| p.matches_name(attribute_name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains(&self, property: &TaskProperty) -> bool {
        self.get(property).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn properties(&self) -> impl Iterator<Item = &'static TaskProperty> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static TaskProperty, &[PropertyValue])> {
        self.entries.iter().map(|(p, v)| (*p, v.as_slice()))
    }

    /// Moves every entry of `other` into `self`, replacing duplicates.
    pub fn extend(&mut self, other: PropertyValueMap) {
        for (property, values) in other.entries {
            self.insert(property, values);
        }
    }

    /// JSON object keyed by attribute name.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .entries
            .iter()
            .map(|(p, values)| {
                let values = values
                    .iter()
                    .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
                    .collect();
                (p.attribute_name().to_string(), serde_json::Value::Array(values))
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// Builds a map from a JSON object keyed by attribute name.
    ///
    /// Names not found in `catalogue` are skipped. A scalar is accepted in
    /// place of a one-element array.
    pub fn from_json(
        document: &serde_json::Value,
        catalogue: &[&'static TaskProperty],
    ) -> Result<Self, ValueError> {
        let object = document
            .as_object()
            .ok_or_else(|| ValueError::InvalidDocument("expected a JSON object".to_string()))?;

        let mut map = PropertyValueMap::new();
        for (name, raw) in object {
            let Some(property) = find_property(catalogue, name) else {
                tracing::trace!(attribute = %name, "ignoring unknown property");
                continue;
            };
            let items = match raw {
                serde_json::Value::Array(items) => items.clone(),
                serde_json::Value::Null => Vec::new(),
                scalar => vec![scalar.clone()],
            };
            let values = items
                .into_iter()
                .map(serde_json::from_value::<PropertyValue>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ValueError::InvalidDocument(format!("{name}: {e}")))?;
            map.insert(property, values);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    static COLOR: TaskProperty =
        TaskProperty::new("ds-test-color", "Color", "A color.", PropertyKind::Enumeration)
            .with_allowed_values(&["red", "green"])
            .required();
    static TAGS: TaskProperty =
        TaskProperty::new("ds-test-tag", "Tags", "Some tags.", PropertyKind::String).multi_valued();
    static CATALOGUE: [&TaskProperty; 2] = [&COLOR, &TAGS];

    #[test]
    fn descriptor_flags_come_from_const_builders() {
        assert!(COLOR.is_required());
        assert!(!COLOR.is_multi_valued());
        assert_eq!(COLOR.allowed_values(), &["red", "green"]);
        assert!(TAGS.is_multi_valued());
        assert!(!TAGS.is_advanced());
        assert_eq!(TAGS.kind(), PropertyKind::String);
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        assert_eq!(find_property(&CATALOGUE, "DS-TEST-TAG"), Some(&TAGS));
        assert!(find_property(&CATALOGUE, "ds-test-size").is_none());
    }

    #[test]
    fn empty_lists_are_never_stored() {
        let mut map = PropertyValueMap::new();
        map.insert(&TAGS, vec!["a".into()]);
        assert!(map.contains(&TAGS));

        map.insert(&TAGS, Vec::new());
        assert!(!map.contains(&TAGS));
        assert!(map.is_empty());
    }

    #[test]
    fn insert_replaces_and_keeps_order() {
        let mut map = PropertyValueMap::new();
        map.insert_value(&COLOR, "red");
        map.insert_strings(&TAGS, &["x".to_string(), "y".to_string()]);
        map.insert_value(&COLOR, "green");

        let order: Vec<_> = map.properties().map(|p| p.attribute_name()).collect();
        assert_eq!(order, vec!["ds-test-color", "ds-test-tag"]);
        assert_eq!(map.get(&COLOR), Some(&[PropertyValue::from("green")][..]));
        assert_eq!(map.get_by_name("ds-test-tag").map(<[_]>::len), Some(2));
    }

    #[test]
    fn coercion_accepts_wire_strings() {
        assert!(PropertyValue::from("TRUE").to_bool().unwrap());
        assert_eq!(PropertyValue::from("12").to_integer().unwrap(), 12);
        assert_eq!(PropertyValue::Long(12).to_integer().unwrap(), 12);
        assert!(PropertyValue::Long(i64::MAX).to_integer().is_err());
        assert_eq!(
            PropertyValue::from("5 minutes").to_duration_millis().unwrap(),
            300_000
        );
        assert!(matches!(
            PropertyValue::Boolean(true).as_string(),
            Err(ValueError::WrongKind { expected: "string", actual: "boolean" })
        ));
    }

    #[test]
    fn dates_accept_generalized_and_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(
            PropertyValue::from("20240506070809Z").to_date().unwrap(),
            expected
        );
        assert_eq!(
            PropertyValue::from("2024-05-06T07:08:09Z").to_date().unwrap(),
            expected
        );
        assert_eq!(
            PropertyValue::Date(expected).to_wire_string(),
            "20240506070809.000Z"
        );
    }

    #[test]
    fn json_document_round_trip() {
        let doc = json!({
            "ds-test-color": "red",
            "ds-test-tag": ["a", "b"],
            "ds-test-unknown": [1, 2]
        });
        let map = PropertyValueMap::from_json(&doc, &CATALOGUE).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get(&TAGS).unwrap(),
            &[PropertyValue::from("a"), PropertyValue::from("b")]
        );

        let back = PropertyValueMap::from_json(&map.to_json(), &CATALOGUE).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn json_document_must_be_an_object() {
        assert!(matches!(
            PropertyValueMap::from_json(&json!(["x"]), &CATALOGUE),
            Err(ValueError::InvalidDocument(_))
        ));
    }
}
