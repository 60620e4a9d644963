//! Collect support data task - サポート用アーカイブの作成
//!
//! 全てのプロパティは省略可能で、互いに制約しません（省略 = サーバーの既定値）。
//! タスクは [`CollectSupportDataTaskProperties`] で値を組み立ててから作ります。
//!
//! # 値の表現
//! - 期間: ミリ秒で保持し、エントリには "5 minutes" のような正規形で書く
//! - 件数・サイズ: 0 以上の整数

mod properties;

pub use self::properties::CollectSupportDataTaskProperties;

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, ValueError};
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};
use crate::value;

pub static PROPERTY_OUTPUT_PATH: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-output-path",
    "Output Path",
    "The path on the server where the support data archive is written.",
    PropertyKind::String,
);

pub static PROPERTY_ENCRYPTION_PASSPHRASE_FILE: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-encryption-passphrase-file",
    "Encryption Passphrase File",
    "The path to a file holding the passphrase used to encrypt the archive.",
    PropertyKind::String,
);

pub static PROPERTY_INCLUDE_EXPENSIVE_DATA: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-include-expensive-data",
    "Include Expensive Data",
    "Whether to include data that may be expensive to collect.",
    PropertyKind::Boolean,
);

pub static PROPERTY_INCLUDE_REPLICATION_STATE_DUMP: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-include-replication-state-dump",
    "Include Replication State Dump",
    "Whether to include a replication state dump, which may be large.",
    PropertyKind::Boolean,
);

pub static PROPERTY_INCLUDE_BINARY_FILES: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-include-binary-files",
    "Include Binary Files",
    "Whether to include binary files in the archive.",
    PropertyKind::Boolean,
);

pub static PROPERTY_INCLUDE_EXTENSION_SOURCE: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-include-extension-source",
    "Include Extension Source",
    "Whether to include the source code of third-party extensions.",
    PropertyKind::Boolean,
);

pub static PROPERTY_USE_SEQUENTIAL_MODE: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-use-sequential-mode",
    "Use Sequential Mode",
    "Whether to collect data one item at a time instead of in parallel.",
    PropertyKind::Boolean,
)
.advanced();

pub static PROPERTY_SECURITY_LEVEL: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-security-level",
    "Security Level",
    "How much potentially sensitive information to leave out of the archive.",
    PropertyKind::Enumeration,
)
.with_allowed_values(&["none", "obscure-secrets", "maximum"]);

pub static PROPERTY_REPORT_COUNT: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-report-count",
    "Report Count",
    "The number of intervals of data to collect from interval-based tools.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_REPORT_INTERVAL_SECONDS: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-report-interval-seconds",
    "Report Interval Seconds",
    "The number of seconds between intervals of interval-based tools.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_JSTACK_COUNT: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-jstack-count",
    "JStack Count",
    "The number of thread stack dumps to collect.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_LOG_DURATION: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-log-duration",
    "Log Duration",
    "How far back in time log messages are collected.",
    PropertyKind::Duration,
);

pub static PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-log-file-head-collection-size-kb",
    "Log File Head Collection Size (KB)",
    "The amount of data to collect from the beginning of each log file.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-log-file-tail-collection-size-kb",
    "Log File Tail Collection Size (KB)",
    "The amount of data to collect from the end of each log file.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_COMMENT: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-comment",
    "Comment",
    "A comment to include in the archive.",
    PropertyKind::String,
);

pub static PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-retain-previous-support-data-archive-count",
    "Retain Previous Support Data Archive Count",
    "The number of previous support data archives to keep.",
    PropertyKind::Integer,
)
.advanced();

pub static PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE: TaskProperty = TaskProperty::new(
    "ds-task-collect-support-data-retain-previous-support-data-archive-age",
    "Retain Previous Support Data Archive Age",
    "The minimum age of previous support data archives that may be removed.",
    PropertyKind::Duration,
)
.advanced();

static PROPERTIES: [&TaskProperty; 17] = [
    &PROPERTY_OUTPUT_PATH,
    &PROPERTY_ENCRYPTION_PASSPHRASE_FILE,
    &PROPERTY_INCLUDE_EXPENSIVE_DATA,
    &PROPERTY_INCLUDE_REPLICATION_STATE_DUMP,
    &PROPERTY_INCLUDE_BINARY_FILES,
    &PROPERTY_INCLUDE_EXTENSION_SOURCE,
    &PROPERTY_USE_SEQUENTIAL_MODE,
    &PROPERTY_SECURITY_LEVEL,
    &PROPERTY_REPORT_COUNT,
    &PROPERTY_REPORT_INTERVAL_SECONDS,
    &PROPERTY_JSTACK_COUNT,
    &PROPERTY_LOG_DURATION,
    &PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB,
    &PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB,
    &PROPERTY_COMMENT,
    &PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT,
    &PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE,
];

/// How much sensitive data is kept out of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectSupportDataSecurityLevel {
    /// Nothing is obscured or left out.
    None,
    ObscureSecrets,
    Maximum,
}

impl CollectSupportDataSecurityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectSupportDataSecurityLevel::None => "none",
            CollectSupportDataSecurityLevel::ObscureSecrets => "obscure-secrets",
            CollectSupportDataSecurityLevel::Maximum => "maximum",
        }
    }
}

impl FromStr for CollectSupportDataSecurityLevel {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        value::lookup_name(
            s,
            "security level",
            &[
                ("none", CollectSupportDataSecurityLevel::None),
                ("obscure-secrets", CollectSupportDataSecurityLevel::ObscureSecrets),
                ("obscure_secrets", CollectSupportDataSecurityLevel::ObscureSecrets),
                ("obscuresecrets", CollectSupportDataSecurityLevel::ObscureSecrets),
                ("maximum", CollectSupportDataSecurityLevel::Maximum),
            ],
        )
    }
}

impl fmt::Display for CollectSupportDataSecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every field is optional. Integer fields are never negative.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectSupportDataTask {
    output_path: Option<String>,
    encryption_passphrase_file: Option<String>,
    include_expensive_data: Option<bool>,
    include_replication_state_dump: Option<bool>,
    include_binary_files: Option<bool>,
    include_extension_source: Option<bool>,
    use_sequential_mode: Option<bool>,
    security_level: Option<CollectSupportDataSecurityLevel>,
    report_count: Option<i32>,
    report_interval_seconds: Option<i32>,
    jstack_count: Option<i32>,
    log_duration_millis: Option<u64>,
    log_file_head_collection_size_kb: Option<i32>,
    log_file_tail_collection_size_kb: Option<i32>,
    comment: Option<String>,
    retain_previous_archive_count: Option<i32>,
    retain_previous_archive_age_millis: Option<u64>,
}

impl CollectSupportDataTask {
    /// Copies the task-specific settings out of `properties`.
    pub fn new(properties: &CollectSupportDataTaskProperties) -> Self {
        properties.payload().clone()
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    pub fn encryption_passphrase_file(&self) -> Option<&str> {
        self.encryption_passphrase_file.as_deref()
    }

    pub fn include_expensive_data(&self) -> Option<bool> {
        self.include_expensive_data
    }

    pub fn include_replication_state_dump(&self) -> Option<bool> {
        self.include_replication_state_dump
    }

    pub fn include_binary_files(&self) -> Option<bool> {
        self.include_binary_files
    }

    pub fn include_extension_source(&self) -> Option<bool> {
        self.include_extension_source
    }

    pub fn use_sequential_mode(&self) -> Option<bool> {
        self.use_sequential_mode
    }

    pub fn security_level(&self) -> Option<CollectSupportDataSecurityLevel> {
        self.security_level
    }

    pub fn report_count(&self) -> Option<i32> {
        self.report_count
    }

    pub fn report_interval_seconds(&self) -> Option<i32> {
        self.report_interval_seconds
    }

    pub fn jstack_count(&self) -> Option<i32> {
        self.jstack_count
    }

    /// Canonical form, e.g. `5 minutes`.
    pub fn log_duration(&self) -> Option<String> {
        self.log_duration_millis.map(value::format_duration_millis)
    }

    pub fn log_duration_millis(&self) -> Option<u64> {
        self.log_duration_millis
    }

    pub fn log_file_head_collection_size_kb(&self) -> Option<i32> {
        self.log_file_head_collection_size_kb
    }

    pub fn log_file_tail_collection_size_kb(&self) -> Option<i32> {
        self.log_file_tail_collection_size_kb
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn retain_previous_support_data_archive_count(&self) -> Option<i32> {
        self.retain_previous_archive_count
    }

    pub fn retain_previous_support_data_archive_age(&self) -> Option<String> {
        self.retain_previous_archive_age_millis
            .map(value::format_duration_millis)
    }

    pub fn retain_previous_support_data_archive_age_millis(&self) -> Option<u64> {
        self.retain_previous_archive_age_millis
    }
}

impl TaskVariant for CollectSupportDataTask {
    const TASK_NAME: &'static str = "collect support data task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.CollectSupportDataTask";
    const OBJECT_CLASS: &'static str = "ds-task-collect-support-data";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            output_path: reader.string(&PROPERTY_OUTPUT_PATH)?,
            encryption_passphrase_file: reader.string(&PROPERTY_ENCRYPTION_PASSPHRASE_FILE)?,
            include_expensive_data: reader.boolean(&PROPERTY_INCLUDE_EXPENSIVE_DATA)?,
            include_replication_state_dump: reader
                .boolean(&PROPERTY_INCLUDE_REPLICATION_STATE_DUMP)?,
            include_binary_files: reader.boolean(&PROPERTY_INCLUDE_BINARY_FILES)?,
            include_extension_source: reader.boolean(&PROPERTY_INCLUDE_EXTENSION_SOURCE)?,
            use_sequential_mode: reader.boolean(&PROPERTY_USE_SEQUENTIAL_MODE)?,
            security_level: reader.parsed(&PROPERTY_SECURITY_LEVEL, |s| s.parse())?,
            report_count: reader.non_negative_integer(&PROPERTY_REPORT_COUNT)?,
            report_interval_seconds: reader
                .non_negative_integer(&PROPERTY_REPORT_INTERVAL_SECONDS)?,
            jstack_count: reader.non_negative_integer(&PROPERTY_JSTACK_COUNT)?,
            log_duration_millis: reader.duration_millis(&PROPERTY_LOG_DURATION)?,
            log_file_head_collection_size_kb: reader
                .non_negative_integer(&PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB)?,
            log_file_tail_collection_size_kb: reader
                .non_negative_integer(&PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB)?,
            comment: reader.string(&PROPERTY_COMMENT)?,
            retain_previous_archive_count: reader
                .non_negative_integer(&PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT)?,
            retain_previous_archive_age_millis: reader
                .duration_millis(&PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_optional(&PROPERTY_OUTPUT_PATH, self.output_path.as_deref());
        values.insert_optional(
            &PROPERTY_ENCRYPTION_PASSPHRASE_FILE,
            self.encryption_passphrase_file.as_deref(),
        );
        values.insert_optional(&PROPERTY_INCLUDE_EXPENSIVE_DATA, self.include_expensive_data);
        values.insert_optional(
            &PROPERTY_INCLUDE_REPLICATION_STATE_DUMP,
            self.include_replication_state_dump,
        );
        values.insert_optional(&PROPERTY_INCLUDE_BINARY_FILES, self.include_binary_files);
        values.insert_optional(&PROPERTY_INCLUDE_EXTENSION_SOURCE, self.include_extension_source);
        values.insert_optional(&PROPERTY_USE_SEQUENTIAL_MODE, self.use_sequential_mode);
        values.insert_optional(&PROPERTY_SECURITY_LEVEL, self.security_level.map(|l| l.as_str()));
        values.insert_optional(&PROPERTY_REPORT_COUNT, self.report_count);
        values.insert_optional(&PROPERTY_REPORT_INTERVAL_SECONDS, self.report_interval_seconds);
        values.insert_optional(&PROPERTY_JSTACK_COUNT, self.jstack_count);
        values.insert_optional(&PROPERTY_LOG_DURATION, self.log_duration());
        values.insert_optional(
            &PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB,
            self.log_file_head_collection_size_kb,
        );
        values.insert_optional(
            &PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB,
            self.log_file_tail_collection_size_kb,
        );
        values.insert_optional(&PROPERTY_COMMENT, self.comment.as_deref());
        values.insert_optional(
            &PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT,
            self.retain_previous_archive_count,
        );
        values.insert_optional(
            &PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE,
            self.retain_previous_support_data_archive_age(),
        );
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::CollectSupportData(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::task::Task;
    use crate::task::test_support::{assert_round_trips, common_attributes};
    use rstest::rstest;

    #[test]
    fn defaults_leave_everything_to_the_server() {
        let task = Task::new(common_attributes("csd-0"), CollectSupportDataTask::default());
        assert!(task.additional_attributes().is_empty());
        assert_eq!(task.additional_object_classes(), ["ds-task-collect-support-data"]);
        assert_eq!(task.task_specific_properties().len(), 17);
        assert_round_trips(&task);
    }

    #[rstest]
    #[case("none", CollectSupportDataSecurityLevel::None)]
    #[case("Obscure-Secrets", CollectSupportDataSecurityLevel::ObscureSecrets)]
    #[case("obscure_secrets", CollectSupportDataSecurityLevel::ObscureSecrets)]
    #[case("MAXIMUM", CollectSupportDataSecurityLevel::Maximum)]
    fn security_levels_parse(#[case] input: &str, #[case] expected: CollectSupportDataSecurityLevel) {
        assert_eq!(input.parse::<CollectSupportDataSecurityLevel>().unwrap(), expected);
    }

    #[test]
    fn decode_reads_entry_values() {
        let entry = Entry::new("ds-task-id=csd-1,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-collect-support-data"])
            .with_attribute("ds-task-id", ["csd-1"])
            .with_attribute("ds-task-class-name", [CollectSupportDataTask::CLASS_NAME])
            .with_attribute("ds-task-collect-support-data-log-duration", ["2h"])
            .with_attribute("ds-task-collect-support-data-security-level", ["maximum"])
            .with_attribute("ds-task-collect-support-data-jstack-count", ["3"])
            .with_attribute("ds-task-collect-support-data-include-binary-files", ["false"]);
        let task = Task::decode_entry(&entry).unwrap();
        let csd = task.variant::<CollectSupportDataTask>().unwrap();
        assert_eq!(csd.log_duration_millis(), Some(7_200_000));
        assert_eq!(csd.log_duration().as_deref(), Some("2 hours"));
        assert_eq!(csd.security_level(), Some(CollectSupportDataSecurityLevel::Maximum));
        assert_eq!(csd.jstack_count(), Some(3));
        assert_eq!(csd.include_binary_files(), Some(false));
        assert_eq!(csd.comment(), None);
    }

    #[rstest]
    #[case("ds-task-collect-support-data-report-count", "-1")]
    #[case("ds-task-collect-support-data-jstack-count", "many")]
    #[case("ds-task-collect-support-data-log-duration", "malformed")]
    #[case("ds-task-collect-support-data-security-level", "paranoid")]
    #[case("ds-task-collect-support-data-use-sequential-mode", "yes please")]
    fn bad_values_fail_decode(#[case] attribute: &str, #[case] value: &str) {
        let entry = Entry::new("ds-task-id=csd-2,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-collect-support-data"])
            .with_attribute("ds-task-id", ["csd-2"])
            .with_attribute("ds-task-class-name", [CollectSupportDataTask::CLASS_NAME])
            .with_attribute(attribute, [value]);
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.attribute(), Some(attribute));
    }
}
