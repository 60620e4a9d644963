//! Disconnect client task: terminates one client connection.

use crate::error::{DecodeError, UsageError, ValueError};
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};

pub static PROPERTY_CONNECTION_ID: TaskProperty = TaskProperty::new(
    "ds-task-disconnect-connection-id",
    "Connection ID",
    "The connection ID of the client to disconnect.",
    PropertyKind::Long,
)
.required();

pub static PROPERTY_DISCONNECT_MESSAGE: TaskProperty = TaskProperty::new(
    "ds-task-disconnect-message",
    "Disconnect Message",
    "A message to send to the client before it is disconnected.",
    PropertyKind::String,
);

pub static PROPERTY_NOTIFY_CLIENT: TaskProperty = TaskProperty::new(
    "ds-task-disconnect-notify-client",
    "Notify Client",
    "Whether to send the client a notice of disconnection.",
    PropertyKind::Boolean,
);

static PROPERTIES: [&TaskProperty; 3] = [
    &PROPERTY_CONNECTION_ID,
    &PROPERTY_DISCONNECT_MESSAGE,
    &PROPERTY_NOTIFY_CLIENT,
];

fn check_connection_id(id: i64) -> Result<i64, ValueError> {
    if id < 0 {
        return Err(ValueError::OutOfRange {
            value: id.to_string(),
            reason: "connection IDs are never negative",
        });
    }
    Ok(id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectClientTask {
    connection_id: i64,
    message: Option<String>,
    notify_client: Option<bool>,
}

impl DisconnectClientTask {
    pub fn new(
        connection_id: i64,
        message: Option<String>,
        notify_client: Option<bool>,
    ) -> Result<Self, UsageError> {
        let connection_id = check_connection_id(connection_id).map_err(|e| {
            UsageError::invalid_value(Self::TASK_NAME, PROPERTY_CONNECTION_ID.attribute_name(), e)
        })?;
        Ok(Self {
            connection_id,
            message,
            notify_client,
        })
    }

    pub fn connection_id(&self) -> i64 {
        self.connection_id
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn notify_client(&self) -> Option<bool> {
        self.notify_client
    }
}

impl TaskVariant for DisconnectClientTask {
    const TASK_NAME: &'static str = "disconnect client task";
    const CLASS_NAME: &'static str = "org.opends.server.tasks.DisconnectClientTask";
    const OBJECT_CLASS: &'static str = "ds-task-disconnect";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        let connection_id =
            reader.require(&PROPERTY_CONNECTION_ID, reader.long(&PROPERTY_CONNECTION_ID)?)?;
        let connection_id = check_connection_id(connection_id).map_err(|e| {
            DecodeError::invalid_value(reader.task(), PROPERTY_CONNECTION_ID.attribute_name(), e)
        })?;
        Ok(Self {
            connection_id,
            message: reader.string(&PROPERTY_DISCONNECT_MESSAGE)?,
            notify_client: reader.boolean(&PROPERTY_NOTIFY_CLIENT)?,
        })
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        values.insert_value(&PROPERTY_CONNECTION_ID, self.connection_id);
        values.insert_optional(&PROPERTY_DISCONNECT_MESSAGE, self.message.as_deref());
        values.insert_optional(&PROPERTY_NOTIFY_CLIENT, self.notify_client);
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::DisconnectClient(task) => Some(task),
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

    fn disconnect_entry() -> Entry {
        Entry::new("ds-task-id=d1,cn=Scheduled Tasks,cn=tasks")
            .with_attribute("objectClass", ["top", "ds-task", "ds-task-disconnect"])
            .with_attribute("ds-task-id", ["d1"])
            .with_attribute("ds-task-class-name", [DisconnectClientTask::CLASS_NAME])
    }

    #[test]
    fn negative_connection_id_is_rejected() {
        assert!(DisconnectClientTask::new(-1, None, None).is_err());

        let entry = disconnect_entry().with_attribute("ds-task-disconnect-connection-id", ["-5"]);
        let err = Task::decode_entry(&entry).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-task-disconnect-connection-id"));
    }

    #[test]
    fn connection_id_is_required() {
        let err = Task::decode_entry(&disconnect_entry()).unwrap_err();
        assert_eq!(err.attribute(), Some("ds-task-disconnect-connection-id"));
    }

    #[test]
    fn decodes_long_connection_ids() {
        let entry = disconnect_entry()
            .with_attribute("ds-task-disconnect-connection-id", ["9876543210"])
            .with_attribute("ds-task-disconnect-notify-client", ["TRUE"]);
        let task = Task::decode_entry(&entry).unwrap();
        let disconnect = task.variant::<DisconnectClientTask>().unwrap();
        assert_eq!(disconnect.connection_id(), 9_876_543_210);
        assert_eq!(disconnect.notify_client(), Some(true));
        assert_eq!(disconnect.message(), None);
    }

    #[test]
    fn round_trips() {
        let disconnect =
            DisconnectClientTask::new(42, Some("idle too long".to_string()), Some(false)).unwrap();
        assert_round_trips(&Task::new(common_attributes("d2"), disconnect));
    }
}
