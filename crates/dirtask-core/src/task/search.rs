//! Search task: runs one search inside the server and writes the matching
//! entries to a file.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, UsageError, ValueError};
use crate::filter::Filter;
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};
use crate::value;

pub static PROPERTY_BASE_DN: TaskProperty = TaskProperty::new(
    "ds-task-search-base-dn",
    "Base DN",
    "The base DN for the search.",
    PropertyKind::String,
)
.required();

pub static PROPERTY_SCOPE: TaskProperty = TaskProperty::new(
    "ds-task-search-scope",
    "Scope",
    "The scope for the search.",
    PropertyKind::Enumeration,
)
.required()
.with_allowed_values(&["base", "one", "sub", "subordinates"]);

pub static PROPERTY_FILTER: TaskProperty = TaskProperty::new(
    "ds-task-search-filter",
    "Filter",
    "The filter for the search.",
    PropertyKind::String,
)
.required();

pub static PROPERTY_ATTRIBUTE: TaskProperty = TaskProperty::new(
    "ds-task-search-attribute",
    "Requested Attribute",
    "The attributes to include in matching entries. If absent, all user attributes are returned.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_OUTPUT_FILE: TaskProperty = TaskProperty::new(
    "ds-task-search-output-file",
    "Output File",
    "The path of the LDIF file to which matching entries are written.",
    PropertyKind::String,
)
.required();

pub static PROPERTY_AUTHZ_DN: TaskProperty = TaskProperty::new(
    "ds-task-search-authz-dn",
    "Authorization DN",
    "The DN of the user as whom the search is processed.",
    PropertyKind::String,
)
.advanced();

static PROPERTIES: [&TaskProperty; 6] = [
    &PROPERTY_BASE_DN,
    &PROPERTY_SCOPE,
    &PROPERTY_FILTER,
    &PROPERTY_ATTRIBUTE,
    &PROPERTY_OUTPUT_FILE,
    &PROPERTY_AUTHZ_DN,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    Base,
    One,
    Sub,
    Subordinates,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Base => "base",
            SearchScope::One => "one",
            SearchScope::Sub => "sub",
            SearchScope::Subordinates => "subordinates",
        }
    }

    /// The numeric scope value used on the wire by the search request.
    pub fn int_value(&self) -> i32 {
        match self {
            SearchScope::Base => 0,
            SearchScope::One => 1,
            SearchScope::Sub => 2,
            SearchScope::Subordinates => 3,
        }
    }
}

impl FromStr for SearchScope {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        value::lookup_name(
            s,
            "search scope",
            &[
                ("base", SearchScope::Base),
                ("baseobject", SearchScope::Base),
                ("base-object", SearchScope::Base),
                ("0", SearchScope::Base),
                ("one", SearchScope::One),
                ("onelevel", SearchScope::One),
                ("one-level", SearchScope::One),
                ("singlelevel", SearchScope::One),
                ("single-level", SearchScope::One),
                ("1", SearchScope::One),
                ("sub", SearchScope::Sub),
                ("subtree", SearchScope::Sub),
                ("wholesubtree", SearchScope::Sub),
                ("whole-subtree", SearchScope::Sub),
                ("2", SearchScope::Sub),
                ("subord", SearchScope::Subordinates),
                ("subordinate", SearchScope::Subordinates),
                ("subordinates", SearchScope::Subordinates),
                ("subordinatesubtree", SearchScope::Subordinates),
                ("subordinate-subtree", SearchScope::Subordinates),
                ("3", SearchScope::Subordinates),
            ],
        )
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_filter(filter: &str) -> Result<Filter, ValueError> {
    Filter::parse(filter).map_err(|e| ValueError::InvalidFilter {
        value: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Base DN, scope, filter and output file are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTask {
    base_dn: String,
    scope: SearchScope,
    filter_string: String,
    filter: Filter,
    attributes: Vec<String>,
    output_file: String,
    authz_dn: Option<String>,
}

impl SearchTask {
    pub fn new(
        base_dn: impl Into<String>,
        scope: SearchScope,
        filter: &str,
        attributes: Vec<String>,
        output_file: impl Into<String>,
        authz_dn: Option<String>,
    ) -> Result<Self, UsageError> {
        let parsed = parse_filter(filter).map_err(|e| {
            UsageError::invalid_value(Self::TASK_NAME, PROPERTY_FILTER.attribute_name(), e)
        })?;
        let output_file = output_file.into();
        if output_file.is_empty() {
            return Err(UsageError::new(Self::TASK_NAME, "the output file must not be empty"));
        }
        Ok(Self {
            base_dn: base_dn.into(),
            scope,
            filter_string: filter.to_string(),
            filter: parsed,
            attributes,
            output_file,
            authz_dn,
        })
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub fn scope(&self) -> SearchScope {
        self.scope
    }

    /// The filter as given.
    pub fn filter_string(&self) -> &str {
        &self.filter_string
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    pub fn authz_dn(&self) -> Option<&str> {
        self.authz_dn.as_deref()
    }
}

impl TaskVariant for SearchTask {
    const TASK_NAME: &'static str = "search task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.SearchTask";
    const OBJECT_CLASS: &'static str = "ds-task-search";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        let base_dn = reader.require(&PROPERTY_BASE_DN, reader.string(&PROPERTY_BASE_DN)?)?;
        let scope = reader.require(&PROPERTY_SCOPE, reader.parsed(&PROPERTY_SCOPE, |s| s.parse())?)?;
        let filter_string = reader.require(&PROPERTY_FILTER, reader.string(&PROPERTY_FILTER)?)?;
        let filter = parse_filter(&filter_string).map_err(|e| {
            DecodeError::invalid_value(reader.task(), PROPERTY_FILTER.attribute_name(), e)
        })?;
        let output_file =
            reader.require(&PROPERTY_OUTPUT_FILE, reader.string(&PROPERTY_OUTPUT_FILE)?)?;
        if output_file.is_empty() {
            return Err(reader.invalid("the output file must not be empty"));
        }

        Ok(Self {
            base_dn,
            scope,
            filter_string,
            filter,
            attributes: reader.strings(&PROPERTY_ATTRIBUTE)?,
            output_file,
            authz_dn: reader.string(&PROPERTY_AUTHZ_DN)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_value(&PROPERTY_BASE_DN, self.base_dn.as_str());
        values.insert_value(&PROPERTY_SCOPE, self.scope.as_str());
        values.insert_value(&PROPERTY_FILTER, self.filter_string.as_str());
        values.insert_strings(&PROPERTY_ATTRIBUTE, &self.attributes);
        values.insert_value(&PROPERTY_OUTPUT_FILE, self.output_file.as_str());
        values.insert_optional(&PROPERTY_AUTHZ_DN, self.authz_dn.as_deref());
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::Search(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::error::DecodeErrorKind;
    use crate::task::Task;
    use crate::task::test_support::{assert_round_trips, common_attributes};
    use rstest::rstest;

    fn search() -> SearchTask {
        SearchTask::new(
            "dc=example,dc=com",
            SearchScope::Sub,
            "(&(objectClass=person)(uid=j*))",
            vec!["uid".to_string(), "mail".to_string()],
            "/tmp/results.ldif",
            Some("uid=admin,dc=example,dc=com".to_string()),
        )
        .unwrap()
    }

    fn search_entry() -> Entry {
        Entry::new("ds-task-id=s1,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-search"])
            .with_attribute("ds-task-id", ["s1"])
            .with_attribute("ds-task-class-name", [SearchTask::CLASS_NAME])
            .with_attribute("ds-task-search-base-dn", ["dc=example,dc=com"])
            .with_attribute("ds-task-search-filter", ["(uid=jdoe)"])
            .with_attribute("ds-task-search-output-file", ["out.ldif"])
    }

    #[rstest]
    #[case("base", SearchScope::Base)]
    #[case("baseObject", SearchScope::Base)]
    #[case("base-object", SearchScope::Base)]
    #[case("0", SearchScope::Base)]
    #[case("one", SearchScope::One)]
    #[case("singleLevel", SearchScope::One)]
    #[case("1", SearchScope::One)]
    #[case("wholeSubtree", SearchScope::Sub)]
    #[case("2", SearchScope::Sub)]
    #[case("subord", SearchScope::Subordinates)]
    #[case("subordinate", SearchScope::Subordinates)]
    #[case("subordinateSubtree", SearchScope::Subordinates)]
    #[case("3", SearchScope::Subordinates)]
    fn scope_aliases_normalize(#[case] input: &str, #[case] expected: SearchScope) {
        assert_eq!(input.parse::<SearchScope>().unwrap(), expected);

        let entry = search_entry().with_attribute("ds-task-search-scope", [input]);
        let task = Task::decode_entry(&entry).unwrap();
        assert_eq!(task.variant::<SearchTask>().unwrap().scope(), expected);
    }

    #[test]
    fn unknown_scope_fails_decode() {
        let entry = search_entry().with_attribute("ds-task-search-scope", ["everything"]);
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-task-search-scope"));
    }

    #[rstest]
    #[case("ds-task-search-base-dn")]
    #[case("ds-task-search-scope")]
    #[case("ds-task-search-filter")]
    #[case("ds-task-search-output-file")]
    fn each_required_attribute_is_needed(#[case] missing: &str) {
        let full = search_entry().with_attribute("ds-task-search-scope", ["sub"]);
        let mut entry = Entry::new(full.dn());
        for attribute in full.attributes() {
            if !attribute.has_name(missing) {
                entry.add_attribute(attribute.name(), attribute.values().iter().cloned());
            }
        }
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingAttribute(missing.to_string()));
    }

    #[test]
    fn invalid_filter_is_a_usage_error() {
        let err = SearchTask::new("", SearchScope::Base, "(uid=", vec![], "out.ldif", None)
            .unwrap_err();
        assert_eq!(err.task(), "search task");
    }

    #[test]
    fn invalid_filter_fails_decode() {
        let entry = Entry::new("ds-task-id=s2,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-search"])
            .with_attribute("ds-task-id", ["s2"])
            .with_attribute("ds-task-class-name", [SearchTask::CLASS_NAME])
            .with_attribute("ds-task-search-base-dn", [""])
            .with_attribute("ds-task-search-scope", ["base"])
            .with_attribute("ds-task-search-filter", ["(&(uid=a)"])
            .with_attribute("ds-task-search-output-file", ["out.ldif"]);
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-task-search-filter"));
    }

    #[test]
    fn scope_is_written_in_canonical_form() {
        let entry = search_entry().with_attribute("ds-task-search-scope", ["wholeSubtree"]);
        let task = Task::decode_entry(&entry).unwrap();
        assert_eq!(
            task.to_entry().attribute_value("ds-task-search-scope"),
            Some("sub")
        );
    }

    #[test]
    fn accessors() {
        let s = search();
        assert_eq!(s.base_dn(), "dc=example,dc=com");
        assert_eq!(s.scope().int_value(), 2);
        assert!(matches!(s.filter(), Filter::And(parts) if parts.len() == 2));
        assert_eq!(s.attributes(), &["uid", "mail"]);
        assert_eq!(s.authz_dn(), Some("uid=admin,dc=example,dc=com"));
    }

    #[test]
    fn round_trips() {
        assert_round_trips(&Task::new(common_attributes("search-1"), search()));
    }

    #[test]
    fn deeply_nested_filter_fails_decode() {
        let nested = format!("{}(uid=a){}", "(!".repeat(20_000), ")".repeat(20_000));
        let entry = Entry::new("ds-task-id=s3,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-search"])
            .with_attribute("ds-task-id", ["s3"])
            .with_attribute("ds-task-class-name", [SearchTask::CLASS_NAME])
            .with_attribute("ds-task-search-base-dn", ["dc=example,dc=com"])
            .with_attribute("ds-task-search-scope", ["sub"])
            .with_attribute("ds-task-search-filter", [nested.as_str()])
            .with_attribute("ds-task-search-output-file", ["out.ldif"]);
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-task-search-filter"));
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidValue { .. }));
    }
}
