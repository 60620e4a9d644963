//! Typed reads over a [`PropertyValueMap`] with decode-error context.
//!
//! Entry decoding first lifts the catalogue's attributes into a property map
//! of raw strings, so both decode paths go through the same reader and fail
//! the same way.

use chrono::{DateTime, Utc};

use crate::entry::Entry;
use crate::error::{DecodeError, DecodeErrorKind, ValueError};
use crate::property::{PropertyValue, PropertyValueMap, TaskProperty, find_property};
use crate::value;

/// Reads typed values for one task class.
pub struct PropertyReader<'a> {
    values: &'a PropertyValueMap,
    task: &'a str,
}

impl<'a> PropertyReader<'a> {
    pub fn new(values: &'a PropertyValueMap, task: &'a str) -> Self {
        Self { values, task }
    }

    /// The task class errors are attributed to.
    pub fn task(&self) -> &str {
        self.task
    }

    pub fn contains(&self, property: &TaskProperty) -> bool {
        self.values.contains(property)
    }

    fn single(&self, property: &TaskProperty) -> Result<Option<&'a PropertyValue>, DecodeError> {
        match self.values.get(property) {
            None => Ok(None),
            Some([value]) => Ok(Some(value)),
            Some(values) => Err(DecodeError::new(
                self.task,
                DecodeErrorKind::MultipleValues {
                    attribute: property.attribute_name().to_string(),
                    count: values.len(),
                },
            )),
        }
    }

    fn coerce<T>(
        &self,
        property: &TaskProperty,
        value: &PropertyValue,
        f: impl FnOnce(&PropertyValue) -> Result<T, ValueError>,
    ) -> Result<T, DecodeError> {
        f(value).map_err(|e| DecodeError::invalid_value(self.task, property.attribute_name(), e))
    }

    fn single_with<T>(
        &self,
        property: &TaskProperty,
        f: impl FnOnce(&PropertyValue) -> Result<T, ValueError>,
    ) -> Result<Option<T>, DecodeError> {
        self.single(property)?
            .map(|value| self.coerce(property, value, f))
            .transpose()
    }

    pub fn string(&self, property: &TaskProperty) -> Result<Option<String>, DecodeError> {
        self.single_with(property, |v| v.as_string().map(str::to_string))
    }

    pub fn strings(&self, property: &TaskProperty) -> Result<Vec<String>, DecodeError> {
        let Some(values) = self.values.get(property) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| self.coerce(property, v, |v| v.as_string().map(str::to_string)))
            .collect()
    }

    pub fn boolean(&self, property: &TaskProperty) -> Result<Option<bool>, DecodeError> {
        self.single_with(property, PropertyValue::to_bool)
    }

    pub fn integer(&self, property: &TaskProperty) -> Result<Option<i32>, DecodeError> {
        self.single_with(property, PropertyValue::to_integer)
    }

    /// Counts and limits; negative values are rejected.
    pub fn non_negative_integer(&self, property: &TaskProperty) -> Result<Option<i32>, DecodeError> {
        self.single_with(property, |v| v.to_integer().and_then(value::require_non_negative))
    }

    pub fn long(&self, property: &TaskProperty) -> Result<Option<i64>, DecodeError> {
        self.single_with(property, PropertyValue::to_long)
    }

    pub fn date(&self, property: &TaskProperty) -> Result<Option<DateTime<Utc>>, DecodeError> {
        self.single_with(property, PropertyValue::to_date)
    }

    pub fn duration_millis(&self, property: &TaskProperty) -> Result<Option<u64>, DecodeError> {
        self.single_with(property, PropertyValue::to_duration_millis)
    }

    /// A string value run through `parse` (enumerations, URLs, ...).
    pub fn parsed<T>(
        &self,
        property: &TaskProperty,
        parse: impl FnOnce(&str) -> Result<T, ValueError>,
    ) -> Result<Option<T>, DecodeError> {
        self.single_with(property, |v| v.as_string().and_then(parse))
    }

    /// Turns an absent required value into a missing-attribute error.
    pub fn require<T>(&self, property: &TaskProperty, value: Option<T>) -> Result<T, DecodeError> {
        value.ok_or_else(|| DecodeError::missing_attribute(self.task, property.attribute_name()))
    }

    /// A cross-field invariant does not hold.
    pub fn invalid(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::invalid(self.task, message)
    }
}

/// Lifts the attributes named in `catalogue` out of `entry` as raw strings.
///
/// Attributes the catalogue does not know are skipped.
pub fn values_from_entry(entry: &Entry, catalogue: &[&'static TaskProperty]) -> PropertyValueMap {
    let mut values = PropertyValueMap::new();
    for attribute in entry.attributes() {
        match find_property(catalogue, attribute.name()) {
            Some(property) => values.insert(
                property,
                attribute
                    .values()
                    .iter()
                    .cloned()
                    .map(PropertyValue::String)
                    .collect(),
            ),
            None => tracing::trace!(attribute = attribute.name(), "attribute not in catalogue"),
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKind;

    static NAME: TaskProperty = TaskProperty::new("ds-x-name", "Name", "", PropertyKind::String);
    static FLAG: TaskProperty = TaskProperty::new("ds-x-flag", "Flag", "", PropertyKind::Boolean);
    static WAIT: TaskProperty = TaskProperty::new("ds-x-wait", "Wait", "", PropertyKind::Duration);
    static CATALOGUE: [&TaskProperty; 3] = [&NAME, &FLAG, &WAIT];

    #[test]
    fn absent_values_read_as_none_or_empty() {
        let values = PropertyValueMap::new();
        let reader = PropertyReader::new(&values, "x");
        assert_eq!(reader.string(&NAME).unwrap(), None);
        assert!(reader.strings(&NAME).unwrap().is_empty());
        assert_eq!(reader.boolean(&FLAG).unwrap(), None);
    }

    #[test]
    fn bad_values_name_the_attribute() {
        let values = PropertyValueMap::new().with(&FLAG, vec!["perhaps".into()]);
        let reader = PropertyReader::new(&values, "com.example.XTask");
        let err = reader.boolean(&FLAG).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-x-flag"));
        assert_eq!(err.task(), "com.example.XTask");
    }

    #[test]
    fn single_valued_reads_reject_lists() {
        let values = PropertyValueMap::new().with(&NAME, vec!["a".into(), "b".into()]);
        let reader = PropertyReader::new(&values, "x");
        assert!(matches!(
            reader.string(&NAME).unwrap_err().kind(),
            DecodeErrorKind::MultipleValues { count: 2, .. }
        ));
    }

    #[test]
    fn negative_counts_are_rejected() {
        static COUNT: TaskProperty = TaskProperty::new("ds-x-count", "Count", "", PropertyKind::Integer);
        let values = PropertyValueMap::new().with(&COUNT, vec!["-1".into()]);
        let reader = PropertyReader::new(&values, "x");
        assert!(reader.non_negative_integer(&COUNT).is_err());

        let values = PropertyValueMap::new().with(&COUNT, vec![PropertyValue::Integer(0)]);
        let reader = PropertyReader::new(&values, "x");
        assert_eq!(reader.non_negative_integer(&COUNT).unwrap(), Some(0));
    }

    #[test]
    fn required_values_report_missing_attribute() {
        let values = PropertyValueMap::new();
        let reader = PropertyReader::new(&values, "x");
        let err = reader.require(&NAME, reader.string(&NAME).unwrap()).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::MissingAttribute("ds-x-name".to_string())
        );
    }

    #[test]
    fn entry_attributes_become_raw_strings() {
        let entry = Entry::new("cn=x")
            .with_attribute("DS-X-FLAG", ["true"])
            .with_attribute("ds-x-wait", ["1 hour"])
            .with_attribute("ds-x-future-attribute", ["ignored"]);
        let values = values_from_entry(&entry, &CATALOGUE);
        assert_eq!(values.len(), 2);

        let reader = PropertyReader::new(&values, "x");
        assert_eq!(reader.boolean(&FLAG).unwrap(), Some(true));
        assert_eq!(reader.duration_millis(&WAIT).unwrap(), Some(3_600_000));
    }
}
