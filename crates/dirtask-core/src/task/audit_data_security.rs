//! Audit data security task: runs the server's data security auditors and
//! writes their reports.
//!
//! Report filters are kept as the strings the caller gave. Each one is also
//! parsed up front; a string that does not parse stays in the string list
//! and is left out of [`AuditDataSecurityTask::report_filters`].

use std::time::Duration;

use crate::error::{DecodeError, UsageError};
use crate::filter::Filter;
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};
use crate::value;

pub static PROPERTY_INCLUDE_AUDITOR: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-include-auditor",
    "Include Auditor",
    "The names of the auditors to run. If absent, all enabled auditors run.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_EXCLUDE_AUDITOR: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-exclude-auditor",
    "Exclude Auditor",
    "The names of enabled auditors that should not be run.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_BACKEND_ID: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-backend-id",
    "Backend ID",
    "The IDs of the backends to audit. If absent, all supported backends are audited.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_REPORT_FILTER: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-report-filter",
    "Report Filter",
    "Filters identifying the entries to include in the reports.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_OUTPUT_DIRECTORY: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-output-directory",
    "Output Directory",
    "The directory below which report files are written.",
    PropertyKind::String,
);

pub static PROPERTY_RETAIN_PREVIOUS_REPORT_COUNT: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-retain-previous-report-count",
    "Retain Previous Report Count",
    "The number of previous report directories to keep.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_RETAIN_PREVIOUS_REPORT_AGE: TaskProperty = TaskProperty::new(
    "ds-task-audit-data-security-retain-previous-report-age",
    "Retain Previous Report Age",
    "The minimum age of previous report directories that may be removed.",
    PropertyKind::Duration,
)
.advanced();

static PROPERTIES: [&TaskProperty; 7] = [
    &PROPERTY_INCLUDE_AUDITOR,
    &PROPERTY_EXCLUDE_AUDITOR,
    &PROPERTY_BACKEND_ID,
    &PROPERTY_REPORT_FILTER,
    &PROPERTY_OUTPUT_DIRECTORY,
    &PROPERTY_RETAIN_PREVIOUS_REPORT_COUNT,
    &PROPERTY_RETAIN_PREVIOUS_REPORT_AGE,
];

/// Include and exclude auditor lists are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditDataSecurityTask {
    include_auditors: Vec<String>,
    exclude_auditors: Vec<String>,
    backend_ids: Vec<String>,
    report_filter_strings: Vec<String>,
    report_filters: Vec<Filter>,
    output_directory: Option<String>,
    retain_previous_report_count: Option<i32>,
    retain_previous_report_age_millis: Option<u64>,
}

fn parse_report_filters(strings: &[String]) -> Vec<Filter> {
    strings
        .iter()
        .filter_map(|s| match Filter::parse(s) {
            Ok(filter) => Some(filter),
            Err(error) => {
                tracing::debug!(filter = %s, %error, "report filter does not parse; keeping string only");
                None
            }
        })
        .collect()
}

impl AuditDataSecurityTask {
    pub fn new(
        include_auditors: Vec<String>,
        exclude_auditors: Vec<String>,
        backend_ids: Vec<String>,
        report_filters: Vec<String>,
        output_directory: Option<String>,
    ) -> Result<Self, UsageError> {
        let task = Self {
            report_filters: parse_report_filters(&report_filters),
            include_auditors,
            exclude_auditors,
            backend_ids,
            report_filter_strings: report_filters,
            output_directory,
            retain_previous_report_count: None,
            retain_previous_report_age_millis: None,
        };
        task.validate().map_err(|m| UsageError::new(Self::TASK_NAME, m))?;
        Ok(task)
    }

    /// Sets how many old report directories to keep and how old they must be
    /// before they may be removed.
    pub fn with_report_retention(
        mut self,
        count: Option<i32>,
        age: Option<Duration>,
    ) -> Result<Self, UsageError> {
        self.retain_previous_report_count = count
            .map(value::require_non_negative)
            .transpose()
            .map_err(|e| {
                UsageError::invalid_value(
                    Self::TASK_NAME,
                    PROPERTY_RETAIN_PREVIOUS_REPORT_COUNT.attribute_name(),
                    e,
                )
            })?;
        self.retain_previous_report_age_millis = age
            .map(value::duration_to_millis)
            .transpose()
            .map_err(|e| {
                UsageError::invalid_value(
                    Self::TASK_NAME,
                    PROPERTY_RETAIN_PREVIOUS_REPORT_AGE.attribute_name(),
                    e,
                )
            })?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.include_auditors.is_empty() && !self.exclude_auditors.is_empty() {
            return Err("include auditors and exclude auditors cannot both be provided".into());
        }
        Ok(())
    }

    pub fn include_auditors(&self) -> &[String] {
        &self.include_auditors
    }

    pub fn exclude_auditors(&self) -> &[String] {
        &self.exclude_auditors
    }

    pub fn backend_ids(&self) -> &[String] {
        &self.backend_ids
    }

    pub fn report_filter_strings(&self) -> &[String] {
        &self.report_filter_strings
    }

    /// Parsed forms of the report filter strings that are valid filters.
    pub fn report_filters(&self) -> &[Filter] {
        &self.report_filters
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.output_directory.as_deref()
    }

    pub fn retain_previous_report_count(&self) -> Option<i32> {
        self.retain_previous_report_count
    }

    pub fn retain_previous_report_age(&self) -> Option<Duration> {
        self.retain_previous_report_age_millis.map(Duration::from_millis)
    }

    pub fn retain_previous_report_age_millis(&self) -> Option<u64> {
        self.retain_previous_report_age_millis
    }
}

impl TaskVariant for AuditDataSecurityTask {
    const TASK_NAME: &'static str = "audit data security task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.AuditDataSecurityTask";
    const OBJECT_CLASS: &'static str = "ds-task-audit-data-security";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        let report_filter_strings = reader.strings(&PROPERTY_REPORT_FILTER)?;
        let task = Self {
            include_auditors: reader.strings(&PROPERTY_INCLUDE_AUDITOR)?,
            exclude_auditors: reader.strings(&PROPERTY_EXCLUDE_AUDITOR)?,
            backend_ids: reader.strings(&PROPERTY_BACKEND_ID)?,
            report_filters: parse_report_filters(&report_filter_strings),
            report_filter_strings,
            output_directory: reader.string(&PROPERTY_OUTPUT_DIRECTORY)?,
            retain_previous_report_count: reader
                .non_negative_integer(&PROPERTY_RETAIN_PREVIOUS_REPORT_COUNT)?,
            retain_previous_report_age_millis: reader
                .duration_millis(&PROPERTY_RETAIN_PREVIOUS_REPORT_AGE)?,
        };
        task.validate().map_err(|m| reader.invalid(m))?;
        Ok(task)
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_strings(&PROPERTY_INCLUDE_AUDITOR, &self.include_auditors);
        values.insert_strings(&PROPERTY_EXCLUDE_AUDITOR, &self.exclude_auditors);
        values.insert_strings(&PROPERTY_BACKEND_ID, &self.backend_ids);
        values.insert_strings(&PROPERTY_REPORT_FILTER, &self.report_filter_strings);
        values.insert_optional(&PROPERTY_OUTPUT_DIRECTORY, self.output_directory.as_deref());
        values.insert_optional(
            &PROPERTY_RETAIN_PREVIOUS_REPORT_COUNT,
            self.retain_previous_report_count,
        );
        values.insert_optional(
            &PROPERTY_RETAIN_PREVIOUS_REPORT_AGE,
            self.retain_previous_report_age_millis
                .map(value::format_duration_millis),
        );
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::AuditDataSecurity(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::property::PropertyValue;
    use crate::task::Task;
    use crate::task::test_support::{assert_round_trips, common_attributes};

    fn list(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_are_empty() {
        let audit = AuditDataSecurityTask::new(vec![], vec![], vec![], vec![], None).unwrap();
        assert!(audit.include_auditors().is_empty());
        assert!(audit.report_filters().is_empty());
        assert_eq!(audit.output_directory(), None);
        assert_eq!(audit.retain_previous_report_age(), None);

        let task = Task::new(common_attributes("audit-0"), audit);
        assert!(task.additional_attributes().is_empty());
        assert_eq!(task.additional_object_classes(), ["ds-task-audit-data-security"]);
    }

    #[test]
    fn include_and_exclude_are_mutually_exclusive() {
        let err = AuditDataSecurityTask::new(
            list(&["foo", "bar"]),
            list(&["baz", "bat"]),
            vec![],
            vec![],
            None,
        )
        .unwrap_err();
        assert_eq!(err.task(), "audit data security task");
    }

    #[test]
    fn conflicting_property_map_is_a_decode_error() {
        let values = PropertyValueMap::new()
            .with(&PROPERTY_INCLUDE_AUDITOR, vec!["foo".into(), "bar".into()])
            .with(&PROPERTY_EXCLUDE_AUDITOR, vec!["baz".into(), "bat".into()]);
        let err = Task::decode_property_map(AuditDataSecurityTask::CLASS_NAME, &values).unwrap_err();
        assert_eq!(err.task(), AuditDataSecurityTask::CLASS_NAME);
    }

    #[test]
    fn unparsable_report_filters_are_kept_as_strings() {
        let audit = AuditDataSecurityTask::new(
            vec![],
            list(&["expired-password"]),
            list(&["userRoot"]),
            list(&["(objectClass=person)", "not a filter(", "(uid=jdoe)"]),
            Some("reports/audit".to_string()),
        )
        .unwrap();
        assert_eq!(audit.report_filter_strings().len(), 3);
        assert_eq!(audit.report_filters().len(), 2);
        assert_eq!(audit.report_filters()[1].attribute(), Some("uid"));
    }

    #[test]
    fn negative_retention_count_is_rejected() {
        let audit = AuditDataSecurityTask::new(vec![], vec![], vec![], vec![], None).unwrap();
        assert!(audit.clone().with_report_retention(Some(-1), None).is_err());

        let audit = audit
            .with_report_retention(Some(5), Some(Duration::from_secs(7 * 86_400)))
            .unwrap();
        assert_eq!(audit.retain_previous_report_count(), Some(5));
        assert_eq!(audit.retain_previous_report_age_millis(), Some(604_800_000));
    }

    #[test]
    fn retention_age_is_written_in_canonical_form() {
        let audit = AuditDataSecurityTask::new(vec![], vec![], vec![], vec![], None)
            .unwrap()
            .with_report_retention(None, Some(Duration::from_secs(3600)))
            .unwrap();
        let task = Task::new(common_attributes("audit-1"), audit);
        let entry = task.to_entry();
        assert_eq!(
            entry.attribute_value("ds-task-audit-data-security-retain-previous-report-age"),
            Some("1 hour")
        );
    }

    #[test]
    fn bad_retention_age_fails_decode() {
        let values = PropertyValueMap::new().with(
            &PROPERTY_RETAIN_PREVIOUS_REPORT_AGE,
            vec![PropertyValue::from("eventually")],
        );
        let err = Task::decode_property_map(AuditDataSecurityTask::CLASS_NAME, &values).unwrap_err();
        assert_eq!(
            err.attribute(),
            Some("ds-task-audit-data-security-retain-previous-report-age")
        );
    }

    #[test]
    fn round_trips() {
        let audit = AuditDataSecurityTask::new(
            list(&["weakly-encoded-password", "privilege"]),
            vec![],
            list(&["userRoot", "changelog"]),
            list(&["(objectClass=*)", "bogus(("]),
            Some("/var/audit".to_string()),
        )
        .unwrap()
        .with_report_retention(Some(10), Some(Duration::from_secs(2 * 86_400)))
        .unwrap();
        assert_round_trips(&Task::new(common_attributes("audit-2"), audit));
    }

    #[test]
    fn deeply_nested_report_filter_is_kept_as_string() {
        let nested = format!("{}(uid=a){}", "(!".repeat(20_000), ")".repeat(20_000));
        let entry = Entry::new("ds-task-id=audit-3,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-audit-data-security"])
            .with_attribute("ds-task-id", ["audit-3"])
            .with_attribute("ds-task-class-name", [AuditDataSecurityTask::CLASS_NAME])
            .with_attribute(
                "ds-task-audit-data-security-report-filter",
                [nested.as_str(), "(uid=jdoe)"],
            );
        let task = Task::decode_entry(&entry).unwrap();
        let audit = task.variant::<AuditDataSecurityTask>().unwrap();
        assert_eq!(audit.report_filter_strings(), [nested.as_str(), "(uid=jdoe)"]);
        assert_eq!(audit.report_filters().len(), 1);
    }
}
