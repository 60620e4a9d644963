use chrono::{TimeZone, Utc};

use super::{CommonTaskAttributes, FailedDependencyAction, Task};

/// A common record with every attribute set.
pub(crate) fn common_attributes(task_id: &str) -> CommonTaskAttributes {
    CommonTaskAttributes::with_task_id(task_id)
        .unwrap()
        .with_scheduled_start_time(Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()))
        .unwrap()
        .with_dependency_ids(vec!["dep-a".to_string(), "dep-b".to_string()])
        .with_failed_dependency_action(Some(FailedDependencyAction::Cancel))
        .with_notify_on_error(vec!["ops@example.com".to_string()])
        .with_alert_on_error(Some(true))
}

/// Checks both codecs give the task back unchanged.
pub(crate) fn assert_round_trips(task: &Task) {
    let entry = task.to_entry();
    let decoded = Task::decode_entry(&entry).unwrap_or_else(|e| panic!("{e}\n{entry}"));
    assert_eq!(&decoded, task, "entry round trip");

    let values = task.task_property_values();
    let decoded = Task::decode_property_map(task.class_name(), &values)
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(&decoded, task, "property map round trip");
}
