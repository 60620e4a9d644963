//! Attributes shared by every task class.
//!
//! Scheduling (start time, dependencies), notifications and administrative
//! alerts live here, along with their property catalogue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, UsageError, ValueError};
use crate::ids::{self, IdGenerator};
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::value;

pub const TASK_OBJECT_CLASS: &str = "ds-task";
pub const ATTR_TASK_CLASS_NAME: &str = "ds-task-class-name";

pub static PROPERTY_TASK_ID: TaskProperty = TaskProperty::new(
    "ds-task-id",
    "Task ID",
    "The unique identifier for the task.",
    PropertyKind::String,
);

pub static PROPERTY_SCHEDULED_START_TIME: TaskProperty = TaskProperty::new(
    "ds-task-scheduled-start-time",
    "Scheduled Start Time",
    "The time that the task should start running.",
    PropertyKind::Date,
);

pub static PROPERTY_DEPENDENCY_ID: TaskProperty = TaskProperty::new(
    "ds-task-dependency-id",
    "Dependency ID",
    "The IDs of tasks that must complete before this task may start.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_FAILED_DEPENDENCY_ACTION: TaskProperty = TaskProperty::new(
    "ds-task-failed-dependency-action",
    "Failed Dependency Action",
    "What to do if a dependency of this task does not complete successfully.",
    PropertyKind::Enumeration,
)
.with_allowed_values(&["process", "cancel", "disable"]);

pub static PROPERTY_NOTIFY_ON_START: TaskProperty = TaskProperty::new(
    "ds-task-notify-on-start",
    "Notify on Start",
    "Email addresses to notify when the task starts running.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_NOTIFY_ON_COMPLETION: TaskProperty = TaskProperty::new(
    "ds-task-notify-on-completion",
    "Notify on Completion",
    "Email addresses to notify when the task completes, whether or not it succeeds.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_NOTIFY_ON_SUCCESS: TaskProperty = TaskProperty::new(
    "ds-task-notify-on-success",
    "Notify on Success",
    "Email addresses to notify when the task completes successfully.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_NOTIFY_ON_ERROR: TaskProperty = TaskProperty::new(
    "ds-task-notify-on-error",
    "Notify on Error",
    "Email addresses to notify if the task does not complete successfully.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_ALERT_ON_START: TaskProperty = TaskProperty::new(
    "ds-task-alert-on-start",
    "Alert on Start",
    "Whether to generate an administrative alert when the task starts running.",
    PropertyKind::Boolean,
);

pub static PROPERTY_ALERT_ON_SUCCESS: TaskProperty = TaskProperty::new(
    "ds-task-alert-on-success",
    "Alert on Success",
    "Whether to generate an administrative alert when the task completes successfully.",
    PropertyKind::Boolean,
);

pub static PROPERTY_ALERT_ON_ERROR: TaskProperty = TaskProperty::new(
    "ds-task-alert-on-error",
    "Alert on Error",
    "Whether to generate an administrative alert if the task fails.",
    PropertyKind::Boolean,
);

pub static COMMON_PROPERTIES: [&TaskProperty; 11] = [
    &PROPERTY_TASK_ID,
    &PROPERTY_SCHEDULED_START_TIME,
    &PROPERTY_DEPENDENCY_ID,
    &PROPERTY_FAILED_DEPENDENCY_ACTION,
    &PROPERTY_NOTIFY_ON_START,
    &PROPERTY_NOTIFY_ON_COMPLETION,
    &PROPERTY_NOTIFY_ON_SUCCESS,
    &PROPERTY_NOTIFY_ON_ERROR,
    &PROPERTY_ALERT_ON_START,
    &PROPERTY_ALERT_ON_SUCCESS,
    &PROPERTY_ALERT_ON_ERROR,
];

/// What the server does with a task whose dependency failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailedDependencyAction {
    /// Run the task anyway.
    Process,
    Cancel,
    Disable,
}

impl FailedDependencyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedDependencyAction::Process => "process",
            FailedDependencyAction::Cancel => "cancel",
            FailedDependencyAction::Disable => "disable",
        }
    }
}

impl FromStr for FailedDependencyAction {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        value::lookup_name(
            s,
            "failed dependency action",
            &[
                ("process", FailedDependencyAction::Process),
                ("cancel", FailedDependencyAction::Cancel),
                ("disable", FailedDependencyAction::Disable),
            ],
        )
    }
}

impl fmt::Display for FailedDependencyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The attribute record every task carries.
///
/// Built with [`CommonTaskAttributes::new`] (generated ID) or
/// [`CommonTaskAttributes::with_task_id`], then refined with the
/// consuming setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonTaskAttributes {
    task_id: String,
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
}

impl Default for CommonTaskAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl CommonTaskAttributes {
    /// Everything unset, with a freshly generated task ID.
    pub fn new() -> Self {
        Self::unset(ids::generate_task_id())
    }

    pub fn generated_by(generator: &dyn IdGenerator) -> Self {
        Self::unset(generator.generate_task_id())
    }

    pub fn with_task_id(task_id: impl Into<String>) -> Result<Self, UsageError> {
        let task_id = task_id.into();
        if task_id.is_empty() {
            return Err(UsageError::new("task", "the task ID must not be empty"));
        }
        Ok(Self::unset(task_id))
    }

    fn unset(task_id: String) -> Self {
        Self {
            task_id,
            scheduled_start_time: None,
            dependency_ids: Vec::new(),
            failed_dependency_action: None,
            notify_on_start: Vec::new(),
            notify_on_completion: Vec::new(),
            notify_on_success: Vec::new(),
            notify_on_error: Vec::new(),
            alert_on_start: None,
            alert_on_success: None,
            alert_on_error: None,
        }
    }

    /// Sub-millisecond precision is dropped; the wire form keeps milliseconds
    /// and four-digit years.
    pub fn with_scheduled_start_time(
        mut self,
        time: Option<DateTime<Utc>>,
    ) -> Result<Self, UsageError> {
        self.scheduled_start_time = time
            .map(value::time::checked_generalized_time)
            .transpose()
            .map_err(|e| {
                UsageError::invalid_value("task", PROPERTY_SCHEDULED_START_TIME.attribute_name(), e)
            })?;
        Ok(self)
    }

    pub fn with_dependency_ids(mut self, ids: Vec<String>) -> Self {
        self.dependency_ids = ids;
        self
    }

    pub fn with_failed_dependency_action(mut self, action: Option<FailedDependencyAction>) -> Self {
        self.failed_dependency_action = action;
        self
    }

    pub fn with_notify_on_start(mut self, addresses: Vec<String>) -> Self {
        self.notify_on_start = addresses;
        self
    }

    pub fn with_notify_on_completion(mut self, addresses: Vec<String>) -> Self {
        self.notify_on_completion = addresses;
        self
    }

    pub fn with_notify_on_success(mut self, addresses: Vec<String>) -> Self {
        self.notify_on_success = addresses;
        self
    }

    pub fn with_notify_on_error(mut self, addresses: Vec<String>) -> Self {
        self.notify_on_error = addresses;
        self
    }

    pub fn with_alert_on_start(mut self, alert: Option<bool>) -> Self {
        self.alert_on_start = alert;
        self
    }

    pub fn with_alert_on_success(mut self, alert: Option<bool>) -> Self {
        self.alert_on_success = alert;
        self
    }

    pub fn with_alert_on_error(mut self, alert: Option<bool>) -> Self {
        self.alert_on_error = alert;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn scheduled_start_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_start_time
    }

    pub fn dependency_ids(&self) -> &[String] {
        &self.dependency_ids
    }

    pub fn failed_dependency_action(&self) -> Option<FailedDependencyAction> {
        self.failed_dependency_action
    }

    pub fn notify_on_start(&self) -> &[String] {
        &self.notify_on_start
    }

    pub fn notify_on_completion(&self) -> &[String] {
        &self.notify_on_completion
    }

    pub fn notify_on_success(&self) -> &[String] {
        &self.notify_on_success
    }

    pub fn notify_on_error(&self) -> &[String] {
        &self.notify_on_error
    }

    pub fn alert_on_start(&self) -> Option<bool> {
        self.alert_on_start
    }

    pub fn alert_on_success(&self) -> Option<bool> {
        self.alert_on_success
    }

    pub fn alert_on_error(&self) -> Option<bool> {
        self.alert_on_error
    }

    pub(crate) fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_value(&PROPERTY_TASK_ID, self.task_id.as_str());
        values.insert_optional(&PROPERTY_SCHEDULED_START_TIME, self.scheduled_start_time);
        values.insert_strings(&PROPERTY_DEPENDENCY_ID, &self.dependency_ids);
        values.insert_optional(
            &PROPERTY_FAILED_DEPENDENCY_ACTION,
            self.failed_dependency_action.map(|a| a.as_str()),
        );
        values.insert_strings(&PROPERTY_NOTIFY_ON_START, &self.notify_on_start);
        values.insert_strings(&PROPERTY_NOTIFY_ON_COMPLETION, &self.notify_on_completion);
        values.insert_strings(&PROPERTY_NOTIFY_ON_SUCCESS, &self.notify_on_success);
        values.insert_strings(&PROPERTY_NOTIFY_ON_ERROR, &self.notify_on_error);
        values.insert_optional(&PROPERTY_ALERT_ON_START, self.alert_on_start);
        values.insert_optional(&PROPERTY_ALERT_ON_SUCCESS, self.alert_on_success);
        values.insert_optional(&PROPERTY_ALERT_ON_ERROR, self.alert_on_error);
    }

    /// Reads the common record. Entries must name their task ID; a property
    /// map without one gets a generated ID.
    pub(crate) fn decode(
        reader: &PropertyReader<'_>,
        generate_missing_id: bool,
    ) -> Result<Self, DecodeError> {
        let task_id = match reader.string(&PROPERTY_TASK_ID)? {
            Some(id) if id.is_empty() => {
                return Err(DecodeError::invalid_value(
                    reader.task(),
                    PROPERTY_TASK_ID.attribute_name(),
                    ValueError::OutOfRange {
                        value: String::new(),
                        reason: "the task ID must not be empty",
                    },
                ));
            }
            Some(id) => id,
            None if generate_missing_id => ids::generate_task_id(),
            None => {
                return Err(DecodeError::missing_attribute(
                    reader.task(),
                    PROPERTY_TASK_ID.attribute_name(),
                ));
            }
        };

        Ok(Self {
            task_id,
            scheduled_start_time: reader.date(&PROPERTY_SCHEDULED_START_TIME)?,
            dependency_ids: reader.strings(&PROPERTY_DEPENDENCY_ID)?,
            failed_dependency_action: reader
                .parsed(&PROPERTY_FAILED_DEPENDENCY_ACTION, |s| s.parse())?,
            notify_on_start: reader.strings(&PROPERTY_NOTIFY_ON_START)?,
            notify_on_completion: reader.strings(&PROPERTY_NOTIFY_ON_COMPLETION)?,
            notify_on_success: reader.strings(&PROPERTY_NOTIFY_ON_SUCCESS)?,
            notify_on_error: reader.strings(&PROPERTY_NOTIFY_ON_ERROR)?,
            alert_on_start: reader.boolean(&PROPERTY_ALERT_ON_START)?,
            alert_on_success: reader.boolean(&PROPERTY_ALERT_ON_SUCCESS)?,
            alert_on_error: reader.boolean(&PROPERTY_ALERT_ON_ERROR)?,
        })
    }
}
