//! Mutable settings for a collect support data task.
//!
//! Setters that coerce a value parse into a temporary first, so a failed
//! call leaves the previous value in place.

use chrono::{DateTime, Utc};

use super::{
    CollectSupportDataSecurityLevel, CollectSupportDataTask, PROPERTY_LOG_DURATION,
    PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB, PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB,
    PROPERTY_REPORT_COUNT, PROPERTY_REPORT_INTERVAL_SECONDS, PROPERTY_JSTACK_COUNT,
    PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE, PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT,
};
use crate::error::{UsageError, ValueError};
use crate::property::TaskProperty;
use crate::task::common::{
    CommonTaskAttributes, FailedDependencyAction, PROPERTY_SCHEDULED_START_TIME,
};
use crate::task::{Task, TaskVariant};
use crate::value;

const TASK: &str = CollectSupportDataTask::TASK_NAME;

fn usage(property: &TaskProperty, error: ValueError) -> UsageError {
    UsageError::invalid_value(TASK, property.attribute_name(), error)
}

fn non_negative(property: &TaskProperty, count: Option<i32>) -> Result<Option<i32>, UsageError> {
    count
        .map(value::require_non_negative)
        .transpose()
        .map_err(|e| usage(property, e))
}

fn duration(property: &TaskProperty, text: Option<&str>) -> Result<Option<u64>, UsageError> {
    text.map(value::parse_duration_millis)
        .transpose()
        .map_err(|e| usage(property, e))
}

/// Data size string to whole kilobytes, rounding partial kilobytes up.
fn size_kb(property: &TaskProperty, text: Option<&str>) -> Result<Option<i32>, UsageError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let bytes = value::parse_size_bytes(text).map_err(|e| usage(property, e))?;
    let kb = i32::try_from(bytes.div_ceil(1024)).map_err(|_| {
        usage(
            property,
            ValueError::OutOfRange {
                value: text.to_string(),
                reason: "size does not fit in a 32-bit kilobyte count",
            },
        )
    })?;
    Ok(Some(kb))
}

fn kb_to_size(kb: Option<i32>) -> Option<String> {
    kb.map(|kb| value::format_size_bytes(u64::from(kb.unsigned_abs()) * 1024))
}

/// Everything a collect support data task can carry, all initially unset.
///
/// Unset means "use the server's default". Convert with [`Self::to_task`]
/// or take just the task-specific part with [`CollectSupportDataTask::new`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectSupportDataTaskProperties {
    task_id: Option<String>,
    scheduled_start_time: Option<DateTime<Utc>>,
    dependency_ids: Vec<String>,
    failed_dependency_action: Option<FailedDependencyAction>,
    notify_on_start: Vec<String>,
    notify_on_completion: Vec<String>,
    notify_on_success: Vec<String>,
    notify_on_error: Vec<String>,
    alert_on_start: Option<bool>,
    alert_on_success: Option<bool>,
    alert_on_error: Option<bool>,
    payload: CollectSupportDataTask,
}

impl From<&CollectSupportDataTask> for CollectSupportDataTaskProperties {
    fn from(task: &CollectSupportDataTask) -> Self {
        Self {
            payload: task.clone(),
            ..Self::default()
        }
    }
}

impl CollectSupportDataTaskProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies both the common and the task-specific settings of `task`.
    /// Returns `None` for other task classes.
    pub fn from_task(task: &Task) -> Option<Self> {
        let payload = task.variant::<CollectSupportDataTask>()?;
        let common = task.common();
        Some(Self {
            task_id: Some(common.task_id().to_string()),
            scheduled_start_time: common.scheduled_start_time(),
            dependency_ids: common.dependency_ids().to_vec(),
            failed_dependency_action: common.failed_dependency_action(),
            notify_on_start: common.notify_on_start().to_vec(),
            notify_on_completion: common.notify_on_completion().to_vec(),
            notify_on_success: common.notify_on_success().to_vec(),
            notify_on_error: common.notify_on_error().to_vec(),
            alert_on_start: common.alert_on_start(),
            alert_on_success: common.alert_on_success(),
            alert_on_error: common.alert_on_error(),
            payload: payload.clone(),
        })
    }

    /// Builds the task. Without a task ID a new one is generated on every call.
    pub fn to_task(&self) -> Result<Task, UsageError> {
        let common = match &self.task_id {
            Some(id) => CommonTaskAttributes::with_task_id(id.clone())?,
            None => CommonTaskAttributes::new(),
        }
        .with_scheduled_start_time(self.scheduled_start_time)?
        .with_dependency_ids(self.dependency_ids.clone())
        .with_failed_dependency_action(self.failed_dependency_action)
        .with_notify_on_start(self.notify_on_start.clone())
        .with_notify_on_completion(self.notify_on_completion.clone())
        .with_notify_on_success(self.notify_on_success.clone())
        .with_notify_on_error(self.notify_on_error.clone())
        .with_alert_on_start(self.alert_on_start)
        .with_alert_on_success(self.alert_on_success)
        .with_alert_on_error(self.alert_on_error);
        Ok(Task::new(common, CollectSupportDataTask::new(self)))
    }

    pub(super) fn payload(&self) -> &CollectSupportDataTask {
        &self.payload
    }

    // common task settings

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn set_task_id(&mut self, task_id: Option<String>) -> Result<(), UsageError> {
        if task_id.as_deref() == Some("") {
            return Err(UsageError::new(TASK, "the task ID must not be empty"));
        }
        self.task_id = task_id;
        Ok(())
    }

    pub fn scheduled_start_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_start_time
    }

    /// Years outside 0000 to 9999 are rejected.
    pub fn set_scheduled_start_time(
        &mut self,
        time: Option<DateTime<Utc>>,
    ) -> Result<(), UsageError> {
        self.scheduled_start_time = time
            .map(value::time::checked_generalized_time)
            .transpose()
            .map_err(|e| usage(&PROPERTY_SCHEDULED_START_TIME, e))?;
        Ok(())
    }

    pub fn dependency_ids(&self) -> &[String] {
        &self.dependency_ids
    }

    pub fn set_dependency_ids(&mut self, ids: Vec<String>) {
        self.dependency_ids = ids;
    }

    pub fn failed_dependency_action(&self) -> Option<FailedDependencyAction> {
        self.failed_dependency_action
    }

    pub fn set_failed_dependency_action(&mut self, action: Option<FailedDependencyAction>) {
        self.failed_dependency_action = action;
    }

    pub fn notify_on_start(&self) -> &[String] {
        &self.notify_on_start
    }

    pub fn set_notify_on_start(&mut self, addresses: Vec<String>) {
        self.notify_on_start = addresses;
    }

    pub fn notify_on_completion(&self) -> &[String] {
        &self.notify_on_completion
    }

    pub fn set_notify_on_completion(&mut self, addresses: Vec<String>) {
        self.notify_on_completion = addresses;
    }

    pub fn notify_on_success(&self) -> &[String] {
        &self.notify_on_success
    }

    pub fn set_notify_on_success(&mut self, addresses: Vec<String>) {
        self.notify_on_success = addresses;
    }

    pub fn notify_on_error(&self) -> &[String] {
        &self.notify_on_error
    }

    pub fn set_notify_on_error(&mut self, addresses: Vec<String>) {
        self.notify_on_error = addresses;
    }

    pub fn alert_on_start(&self) -> Option<bool> {
        self.alert_on_start
    }

    pub fn set_alert_on_start(&mut self, alert: Option<bool>) {
        self.alert_on_start = alert;
    }

    pub fn alert_on_success(&self) -> Option<bool> {
        self.alert_on_success
    }

    pub fn set_alert_on_success(&mut self, alert: Option<bool>) {
        self.alert_on_success = alert;
    }

    pub fn alert_on_error(&self) -> Option<bool> {
        self.alert_on_error
    }

    pub fn set_alert_on_error(&mut self, alert: Option<bool>) {
        self.alert_on_error = alert;
    }

    // collect support data settings

    pub fn output_path(&self) -> Option<&str> {
        self.payload.output_path()
    }

    pub fn set_output_path(&mut self, path: Option<String>) {
        self.payload.output_path = path;
    }

    pub fn encryption_passphrase_file(&self) -> Option<&str> {
        self.payload.encryption_passphrase_file()
    }

    pub fn set_encryption_passphrase_file(&mut self, path: Option<String>) {
        self.payload.encryption_passphrase_file = path;
    }

    pub fn include_expensive_data(&self) -> Option<bool> {
        self.payload.include_expensive_data
    }

    pub fn set_include_expensive_data(&mut self, include: Option<bool>) {
        self.payload.include_expensive_data = include;
    }

    pub fn include_replication_state_dump(&self) -> Option<bool> {
        self.payload.include_replication_state_dump
    }

    pub fn set_include_replication_state_dump(&mut self, include: Option<bool>) {
        self.payload.include_replication_state_dump = include;
    }

    pub fn include_binary_files(&self) -> Option<bool> {
        self.payload.include_binary_files
    }

    pub fn set_include_binary_files(&mut self, include: Option<bool>) {
        self.payload.include_binary_files = include;
    }

    pub fn include_extension_source(&self) -> Option<bool> {
        self.payload.include_extension_source
    }

    pub fn set_include_extension_source(&mut self, include: Option<bool>) {
        self.payload.include_extension_source = include;
    }

    pub fn use_sequential_mode(&self) -> Option<bool> {
        self.payload.use_sequential_mode
    }

    pub fn set_use_sequential_mode(&mut self, sequential: Option<bool>) {
        self.payload.use_sequential_mode = sequential;
    }

    pub fn security_level(&self) -> Option<CollectSupportDataSecurityLevel> {
        self.payload.security_level
    }

    pub fn set_security_level(&mut self, level: Option<CollectSupportDataSecurityLevel>) {
        self.payload.security_level = level;
    }

    pub fn report_count(&self) -> Option<i32> {
        self.payload.report_count
    }

    pub fn set_report_count(&mut self, count: Option<i32>) -> Result<(), UsageError> {
        self.payload.report_count = non_negative(&PROPERTY_REPORT_COUNT, count)?;
        Ok(())
    }

    pub fn report_interval_seconds(&self) -> Option<i32> {
        self.payload.report_interval_seconds
    }

    pub fn set_report_interval_seconds(&mut self, seconds: Option<i32>) -> Result<(), UsageError> {
        self.payload.report_interval_seconds =
            non_negative(&PROPERTY_REPORT_INTERVAL_SECONDS, seconds)?;
        Ok(())
    }

    pub fn jstack_count(&self) -> Option<i32> {
        self.payload.jstack_count
    }

    pub fn set_jstack_count(&mut self, count: Option<i32>) -> Result<(), UsageError> {
        self.payload.jstack_count = non_negative(&PROPERTY_JSTACK_COUNT, count)?;
        Ok(())
    }

    /// Canonical form of the stored duration, e.g. `1 hour`.
    pub fn log_duration(&self) -> Option<String> {
        self.payload.log_duration()
    }

    pub fn log_duration_millis(&self) -> Option<u64> {
        self.payload.log_duration_millis
    }

    pub fn set_log_duration(&mut self, duration_text: Option<&str>) -> Result<(), UsageError> {
        self.payload.log_duration_millis = duration(&PROPERTY_LOG_DURATION, duration_text)?;
        Ok(())
    }

    pub fn set_log_duration_millis(&mut self, millis: Option<u64>) {
        self.payload.log_duration_millis = millis;
    }

    pub fn log_file_head_collection_size_kb(&self) -> Option<i32> {
        self.payload.log_file_head_collection_size_kb
    }

    /// Rendered as a data size, e.g. `10 MB`.
    pub fn log_file_head_collection_size(&self) -> Option<String> {
        kb_to_size(self.payload.log_file_head_collection_size_kb)
    }

    pub fn set_log_file_head_collection_size_kb(
        &mut self,
        kb: Option<i32>,
    ) -> Result<(), UsageError> {
        self.payload.log_file_head_collection_size_kb =
            non_negative(&PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB, kb)?;
        Ok(())
    }

    /// Accepts a data size such as `10 MB`.
    pub fn set_log_file_head_collection_size(
        &mut self,
        size: Option<&str>,
    ) -> Result<(), UsageError> {
        self.payload.log_file_head_collection_size_kb =
            size_kb(&PROPERTY_LOG_FILE_HEAD_COLLECTION_SIZE_KB, size)?;
        Ok(())
    }

    pub fn log_file_tail_collection_size_kb(&self) -> Option<i32> {
        self.payload.log_file_tail_collection_size_kb
    }

    pub fn log_file_tail_collection_size(&self) -> Option<String> {
        kb_to_size(self.payload.log_file_tail_collection_size_kb)
    }

    pub fn set_log_file_tail_collection_size_kb(
        &mut self,
        kb: Option<i32>,
    ) -> Result<(), UsageError> {
        self.payload.log_file_tail_collection_size_kb =
            non_negative(&PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB, kb)?;
        Ok(())
    }

    pub fn set_log_file_tail_collection_size(
        &mut self,
        size: Option<&str>,
    ) -> Result<(), UsageError> {
        self.payload.log_file_tail_collection_size_kb =
            size_kb(&PROPERTY_LOG_FILE_TAIL_COLLECTION_SIZE_KB, size)?;
        Ok(())
    }

    pub fn comment(&self) -> Option<&str> {
        self.payload.comment()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.payload.comment = comment;
    }

    pub fn retain_previous_support_data_archive_count(&self) -> Option<i32> {
        self.payload.retain_previous_archive_count
    }

    pub fn set_retain_previous_support_data_archive_count(
        &mut self,
        count: Option<i32>,
    ) -> Result<(), UsageError> {
        self.payload.retain_previous_archive_count =
            non_negative(&PROPERTY_RETAIN_PREVIOUS_ARCHIVE_COUNT, count)?;
        Ok(())
    }

    pub fn retain_previous_support_data_archive_age(&self) -> Option<String> {
        self.payload.retain_previous_support_data_archive_age()
    }

    pub fn retain_previous_support_data_archive_age_millis(&self) -> Option<u64> {
        self.payload.retain_previous_archive_age_millis
    }

    pub fn set_retain_previous_support_data_archive_age(
        &mut self,
        age: Option<&str>,
    ) -> Result<(), UsageError> {
        self.payload.retain_previous_archive_age_millis =
            duration(&PROPERTY_RETAIN_PREVIOUS_ARCHIVE_AGE, age)?;
        Ok(())
    }

    pub fn set_retain_previous_support_data_archive_age_millis(&mut self, millis: Option<u64>) {
        self.payload.retain_previous_archive_age_millis = millis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::assert_round_trips;
    use chrono::TimeZone;

    fn populated() -> CollectSupportDataTaskProperties {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_task_id(Some("csd-props".to_string())).unwrap();
        p.set_scheduled_start_time(Some(Utc.with_ymd_and_hms(2031, 3, 4, 5, 6, 7).unwrap()))
            .unwrap();
        p.set_dependency_ids(vec!["backup-1".to_string()]);
        p.set_notify_on_completion(vec!["support@example.com".to_string()]);
        p.set_alert_on_error(Some(true));
        p.set_output_path(Some("/tmp/support.zip".to_string()));
        p.set_encryption_passphrase_file(Some("config/passphrase.txt".to_string()));
        p.set_include_expensive_data(Some(true));
        p.set_include_replication_state_dump(Some(false));
        p.set_include_binary_files(Some(true));
        p.set_include_extension_source(Some(false));
        p.set_use_sequential_mode(Some(true));
        p.set_security_level(Some(CollectSupportDataSecurityLevel::ObscureSecrets));
        p.set_report_count(Some(10)).unwrap();
        p.set_report_interval_seconds(Some(5)).unwrap();
        p.set_jstack_count(Some(3)).unwrap();
        p.set_log_duration(Some("5 minutes")).unwrap();
        p.set_log_file_head_collection_size(Some("10 MB")).unwrap();
        p.set_log_file_tail_collection_size_kb(Some(512)).unwrap();
        p.set_comment(Some("slow binds since Tuesday".to_string()));
        p.set_retain_previous_support_data_archive_count(Some(2)).unwrap();
        p.set_retain_previous_support_data_archive_age_millis(Some(604_800_000));
        p
    }

    #[test]
    fn everything_starts_unset() {
        let p = CollectSupportDataTaskProperties::default();
        assert_eq!(p.task_id(), None);
        assert!(p.dependency_ids().is_empty());
        assert!(p.notify_on_error().is_empty());
        assert_eq!(p.output_path(), None);
        assert_eq!(p.security_level(), None);
        assert_eq!(p.log_duration(), None);
        assert_eq!(p.log_duration_millis(), None);
        assert_eq!(p.log_file_head_collection_size_kb(), None);
        assert_eq!(p.retain_previous_support_data_archive_age(), None);
        assert_eq!(CollectSupportDataTask::new(&p), CollectSupportDataTask::default());
    }

    #[test]
    fn log_duration_string_and_millis_agree() {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_log_duration(Some("5 minutes")).unwrap();
        assert_eq!(p.log_duration_millis(), Some(300_000));
        assert_eq!(p.log_duration().as_deref(), Some("5 minutes"));

        p.set_log_duration_millis(Some(3_600_000));
        assert_eq!(p.log_duration().as_deref(), Some("1 hour"));

        p.set_log_duration(None).unwrap();
        assert_eq!(p.log_duration_millis(), None);
    }

    #[test]
    fn archive_age_renders_weeks() {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_retain_previous_support_data_archive_age_millis(Some(604_800_000));
        assert_eq!(p.retain_previous_support_data_archive_age().as_deref(), Some("1 week"));

        p.set_retain_previous_support_data_archive_age(Some("2 days")).unwrap();
        assert_eq!(p.retain_previous_support_data_archive_age_millis(), Some(172_800_000));
    }

    #[test]
    fn failed_duration_leaves_previous_value() {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_log_duration(Some("5 minutes")).unwrap();

        let err = p.set_log_duration(Some("malformed")).unwrap_err();
        assert_eq!(err.task(), "collect support data task");
        assert_eq!(p.log_duration().as_deref(), Some("5 minutes"));
        assert_eq!(p.log_duration_millis(), Some(300_000));
    }

    #[test]
    fn failed_counts_and_sizes_leave_previous_value() {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_jstack_count(Some(4)).unwrap();
        assert!(p.set_jstack_count(Some(-1)).is_err());
        assert_eq!(p.jstack_count(), Some(4));

        p.set_log_file_tail_collection_size(Some("1 MB")).unwrap();
        assert!(p.set_log_file_tail_collection_size(Some("lots")).is_err());
        assert!(p.set_log_file_tail_collection_size(Some("4 TB")).is_err());
        assert_eq!(p.log_file_tail_collection_size_kb(), Some(1024));
        assert_eq!(p.log_file_tail_collection_size().as_deref(), Some("1 MB"));

        assert!(p.set_task_id(Some(String::new())).is_err());
        assert_eq!(p.task_id(), None);
    }

    #[test]
    fn partial_kilobytes_round_up() {
        let mut p = CollectSupportDataTaskProperties::new();
        p.set_log_file_head_collection_size(Some("1500")).unwrap();
        assert_eq!(p.log_file_head_collection_size_kb(), Some(2));
        p.set_log_file_head_collection_size(Some("0")).unwrap();
        assert_eq!(p.log_file_head_collection_size_kb(), Some(0));
    }

    #[test]
    fn clones_are_independent() {
        let original = populated();
        let mut copy = original.clone();
        copy.set_comment(None);
        copy.set_report_count(Some(1)).unwrap();
        assert_eq!(original.comment(), Some("slow binds since Tuesday"));
        assert_eq!(original.report_count(), Some(10));
    }

    #[test]
    fn to_task_carries_every_setting() {
        let p = populated();
        let task = p.to_task().unwrap();
        assert_eq!(task.task_id(), "csd-props");
        assert_eq!(task.common().notify_on_completion(), &["support@example.com"]);

        let csd = task.variant::<CollectSupportDataTask>().unwrap();
        assert_eq!(csd.log_duration_millis(), Some(300_000));
        assert_eq!(csd.log_file_head_collection_size_kb(), Some(10 * 1024));
        assert_eq!(
            csd.retain_previous_support_data_archive_age().as_deref(),
            Some("1 week")
        );

        assert_eq!(CollectSupportDataTaskProperties::from_task(&task), Some(p));
        assert_round_trips(&task);
    }

    #[test]
    fn from_payload_keeps_only_task_settings() {
        let p = populated();
        let payload = CollectSupportDataTask::new(&p);
        let copy = CollectSupportDataTaskProperties::from(&payload);
        assert_eq!(copy.task_id(), None);
        assert_eq!(copy.comment(), p.comment());
        assert_eq!(CollectSupportDataTask::new(&copy), payload);
    }

    #[test]
    fn generated_ids_when_unset() {
        let p = CollectSupportDataTaskProperties::new();
        assert!(!p.to_task().unwrap().task_id().is_empty());
    }

    #[test]
    fn out_of_range_start_time_keeps_previous_value() {
        let mut p = populated();
        let before = p.scheduled_start_time();
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(p.set_scheduled_start_time(Some(far)).is_err());
        assert_eq!(p.scheduled_start_time(), before);
        assert!(p.to_task().is_ok());
    }
}
