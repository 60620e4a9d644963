//! Lockdown mode tasks.
//!
//! In lockdown mode the server only accepts requests from root users over
//! loopback. Both tasks take an optional reason that ends up in the alert
//! the server raises.

use crate::error::DecodeError;
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};

pub static PROPERTY_ENTER_REASON: TaskProperty = TaskProperty::new(
    "ds-task-enter-lockdown-reason",
    "Reason",
    "The reason the server is entering lockdown mode.",
    PropertyKind::String,
);

pub static PROPERTY_LEAVE_REASON: TaskProperty = TaskProperty::new(
    "ds-task-leave-lockdown-reason",
    "Reason",
    "The reason the server is leaving lockdown mode.",
    PropertyKind::String,
);

static ENTER_PROPERTIES: [&TaskProperty; 1] = [&PROPERTY_ENTER_REASON];
static LEAVE_PROPERTIES: [&TaskProperty; 1] = [&PROPERTY_LEAVE_REASON];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnterLockdownModeTask {
    reason: Option<String>,
}

impl EnterLockdownModeTask {
    pub fn new(reason: Option<String>) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl TaskVariant for EnterLockdownModeTask {
    const TASK_NAME: &'static str = "enter lockdown mode task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.EnterLockdownModeTask";
    const OBJECT_CLASS: &'static str = "ds-task-enter-lockdown-mode";

    fn properties() -> &'static [&'static TaskProperty] {
        &ENTER_PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: reader.string(&PROPERTY_ENTER_REASON)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_optional(&PROPERTY_ENTER_REASON, self.reason.as_deref());
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::EnterLockdownMode(task) => Some(task),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaveLockdownModeTask {
    reason: Option<String>,
}

impl LeaveLockdownModeTask {
    pub fn new(reason: Option<String>) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl TaskVariant for LeaveLockdownModeTask {
    const TASK_NAME: &'static str = "leave lockdown mode task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.LeaveLockdownModeTask";
    const OBJECT_CLASS: &'static str = "ds-task-leave-lockdown-mode";

    fn properties() -> &'static [&'static TaskProperty] {
        &LEAVE_PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: reader.string(&PROPERTY_LEAVE_REASON)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_optional(&PROPERTY_LEAVE_REASON, self.reason.as_deref());
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::LeaveLockdownMode(task) => Some(task),
            _ => None,
        }
    }
}
