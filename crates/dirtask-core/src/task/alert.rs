//! Alert task: raises an administrative alert and/or changes which alert
//! types put the server into a degraded or unavailable state.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, UsageError, ValueError};
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};
use crate::value;

pub static PROPERTY_ALERT_TYPE: TaskProperty = TaskProperty::new(
    "ds-task-alert-type",
    "Alert Type",
    "The name of the alert type to use for the alert that is generated.",
    PropertyKind::String,
);

pub static PROPERTY_ALERT_MESSAGE: TaskProperty = TaskProperty::new(
    "ds-task-alert-message",
    "Alert Message",
    "The message to use for the alert that is generated.",
    PropertyKind::String,
);

pub static PROPERTY_ALERT_SEVERITY: TaskProperty = TaskProperty::new(
    "ds-task-alert-severity",
    "Alert Severity",
    "The severity of the alert that is generated.",
    PropertyKind::Enumeration,
)
.with_allowed_values(&["info", "warning", "error", "fatal"]);

pub static PROPERTY_ADD_DEGRADED_TYPE: TaskProperty = TaskProperty::new(
    "ds-task-alert-add-degraded-type",
    "Add Degraded Alert Type",
    "Alert types to add to the set of types that mark the server degraded.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_REMOVE_DEGRADED_TYPE: TaskProperty = TaskProperty::new(
    "ds-task-alert-remove-degraded-type",
    "Remove Degraded Alert Type",
    "Alert types to remove from the set of types that mark the server degraded.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_ADD_UNAVAILABLE_TYPE: TaskProperty = TaskProperty::new(
    "ds-task-alert-add-unavailable-type",
    "Add Unavailable Alert Type",
    "Alert types to add to the set of types that mark the server unavailable.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_REMOVE_UNAVAILABLE_TYPE: TaskProperty = TaskProperty::new(
    "ds-task-alert-remove-unavailable-type",
    "Remove Unavailable Alert Type",
    "Alert types to remove from the set of types that mark the server unavailable.",
    PropertyKind::String,
)
.multi_valued();

static PROPERTIES: [&TaskProperty; 7] = [
    &PROPERTY_ALERT_TYPE,
    &PROPERTY_ALERT_MESSAGE,
    &PROPERTY_ALERT_SEVERITY,
    &PROPERTY_ADD_DEGRADED_TYPE,
    &PROPERTY_REMOVE_DEGRADED_TYPE,
    &PROPERTY_ADD_UNAVAILABLE_TYPE,
    &PROPERTY_REMOVE_UNAVAILABLE_TYPE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Error => "error",
            AlertSeverity::Fatal => "fatal",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        value::lookup_name(
            s,
            "alert severity",
            &[
                ("info", AlertSeverity::Info),
                ("warning", AlertSeverity::Warning),
                ("error", AlertSeverity::Error),
                ("fatal", AlertSeverity::Fatal),
            ],
        )
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert type and message go together; at least one of that pair or a
/// status-change list must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTask {
    alert_type: Option<String>,
    alert_message: Option<String>,
    alert_severity: Option<AlertSeverity>,
    add_degraded_types: Vec<String>,
    remove_degraded_types: Vec<String>,
    add_unavailable_types: Vec<String>,
    remove_unavailable_types: Vec<String>,
}

impl AlertTask {
    pub fn new(
        alert_type: Option<String>,
        alert_message: Option<String>,
    ) -> Result<Self, UsageError> {
        Self::with_status_changes(
            alert_type,
            alert_message,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn with_status_changes(
        alert_type: Option<String>,
        alert_message: Option<String>,
        add_degraded_types: Vec<String>,
        remove_degraded_types: Vec<String>,
        add_unavailable_types: Vec<String>,
        remove_unavailable_types: Vec<String>,
    ) -> Result<Self, UsageError> {
        let task = Self {
            alert_type,
            alert_message,
            alert_severity: None,
            add_degraded_types,
            remove_degraded_types,
            add_unavailable_types,
            remove_unavailable_types,
        };
        task.validate().map_err(|m| UsageError::new(Self::TASK_NAME, m))?;
        Ok(task)
    }

    /// Only valid on a task that has an alert type and message.
    pub fn with_severity(mut self, severity: Option<AlertSeverity>) -> Result<Self, UsageError> {
        self.alert_severity = severity;
        self.validate().map_err(|m| UsageError::new(Self::TASK_NAME, m))?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), String> {
        let has_pair = match (&self.alert_type, &self.alert_message) {
            (Some(_), Some(_)) => true,
            (None, None) => false,
            _ => return Err("the alert type and alert message must be provided together".into()),
        };
        if self.alert_severity.is_some() && !has_pair {
            return Err("an alert severity requires an alert type and message".into());
        }
        let has_changes = !(self.add_degraded_types.is_empty()
            && self.remove_degraded_types.is_empty()
            && self.add_unavailable_types.is_empty()
            && self.remove_unavailable_types.is_empty());
        if !has_pair && !has_changes {
            return Err(
                "either an alert type and message or at least one degraded or unavailable \
                 alert type change must be provided"
                    .into(),
            );
        }
        Ok(())
    }

    pub fn alert_type(&self) -> Option<&str> {
        self.alert_type.as_deref()
    }

    pub fn alert_message(&self) -> Option<&str> {
        self.alert_message.as_deref()
    }

    pub fn alert_severity(&self) -> Option<AlertSeverity> {
        self.alert_severity
    }

    pub fn add_degraded_types(&self) -> &[String] {
        &self.add_degraded_types
    }

    pub fn remove_degraded_types(&self) -> &[String] {
        &self.remove_degraded_types
    }

    pub fn add_unavailable_types(&self) -> &[String] {
        &self.add_unavailable_types
    }

    pub fn remove_unavailable_types(&self) -> &[String] {
        &self.remove_unavailable_types
    }
}

impl TaskVariant for AlertTask {
    const TASK_NAME: &'static str = "alert task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.AlertTask";
    const OBJECT_CLASS: &'static str = "ds-task-alert";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        let task = Self {
            alert_type: reader.string(&PROPERTY_ALERT_TYPE)?,
            alert_message: reader.string(&PROPERTY_ALERT_MESSAGE)?,
            alert_severity: reader.parsed(&PROPERTY_ALERT_SEVERITY, |s| s.parse())?,
            add_degraded_types: reader.strings(&PROPERTY_ADD_DEGRADED_TYPE)?,
            remove_degraded_types: reader.strings(&PROPERTY_REMOVE_DEGRADED_TYPE)?,
            add_unavailable_types: reader.strings(&PROPERTY_ADD_UNAVAILABLE_TYPE)?,
            remove_unavailable_types: reader.strings(&PROPERTY_REMOVE_UNAVAILABLE_TYPE)?,
        };
        task.validate().map_err(|m| reader.invalid(m))?;
        Ok(task)
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_optional(&PROPERTY_ALERT_TYPE, self.alert_type.as_deref());
        values.insert_optional(&PROPERTY_ALERT_MESSAGE, self.alert_message.as_deref());
        values.insert_optional(
            &PROPERTY_ALERT_SEVERITY,
            self.alert_severity.map(|s| s.as_str()),
        );
        values.insert_strings(&PROPERTY_ADD_DEGRADED_TYPE, &self.add_degraded_types);
        values.insert_strings(&PROPERTY_REMOVE_DEGRADED_TYPE, &self.remove_degraded_types);
        values.insert_strings(&PROPERTY_ADD_UNAVAILABLE_TYPE, &self.add_unavailable_types);
        values.insert_strings(&PROPERTY_REMOVE_UNAVAILABLE_TYPE, &self.remove_unavailable_types);
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::Alert(task) => Some(task),
            _ => None,
        }
    }
}
