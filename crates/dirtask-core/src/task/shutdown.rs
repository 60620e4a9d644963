//! Shutdown task: stops or restarts the server.

use crate::error::DecodeError;
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};

pub static PROPERTY_SHUTDOWN_MESSAGE: TaskProperty = TaskProperty::new(
    "ds-task-shutdown-message",
    "Shutdown Message",
    "A message to include in the shutdown notice.",
    PropertyKind::String,
);

pub static PROPERTY_RESTART_SERVER: TaskProperty = TaskProperty::new(
    "ds-task-restart-server",
    "Restart Server",
    "Whether to restart the server instead of leaving it stopped.",
    PropertyKind::Boolean,
);

static PROPERTIES: [&TaskProperty; 2] = [&PROPERTY_SHUTDOWN_MESSAGE, &PROPERTY_RESTART_SERVER];

/// Every property is optional; `Default` is a plain shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShutdownTask {
    message: Option<String>,
    restart_server: Option<bool>,
}

impl ShutdownTask {
    pub fn new(message: Option<String>, restart_server: Option<bool>) -> Self {
        Self {
            message,
            restart_server,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn restart_server(&self) -> Option<bool> {
        self.restart_server
    }

    pub fn is_restart(&self) -> bool {
        self.restart_server.unwrap_or(false)
    }
}

impl TaskVariant for ShutdownTask {
    const TASK_NAME: &'static str = "shutdown task";
    const CLASS_NAME: &'static str = "org.opends.server.tasks.ShutdownTask";
    const OBJECT_CLASS: &'static str = "ds-task-shutdown";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            message: reader.string(&PROPERTY_SHUTDOWN_MESSAGE)?,
            restart_server: reader.boolean(&PROPERTY_RESTART_SERVER)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_optional(&PROPERTY_SHUTDOWN_MESSAGE, self.message.as_deref());
        values.insert_optional(&PROPERTY_RESTART_SERVER, self.restart_server);
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::Shutdown(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use crate::task::test_support::assert_round_trips;

    #[test]
    fn plain_shutdown_has_no_extra_attributes() {
        let task = Task::with_defaults(ShutdownTask::default());
        assert!(task.additional_attributes().is_empty());
        assert!(!task.variant::<ShutdownTask>().unwrap().is_restart());
        assert_round_trips(&task);
    }

    #[test]
    fn restart_flag_round_trips() {
        let task = Task::with_defaults(ShutdownTask::new(None, Some(true)));
        assert_eq!(
            task.to_entry().attribute_value("ds-task-restart-server"),
            Some("true")
        );
        assert_round_trips(&task);
    }
}
