//! Codec options.

use serde::{Deserialize, Serialize};

use crate::entry::escape_rdn_value;

pub const DEFAULT_TASKS_BASE_DN: &str = "cn=Scheduled Tasks,cn=tasks";

/// Options that shape the entries the codec produces.
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Parent DN under which task entries are created.
    pub tasks_base_dn: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            tasks_base_dn: DEFAULT_TASKS_BASE_DN.to_string(),
        }
    }
}

impl CodecConfig {
    pub fn with_tasks_base_dn(tasks_base_dn: impl Into<String>) -> Self {
        Self {
            tasks_base_dn: tasks_base_dn.into(),
        }
    }

    /// `ds-task-id=<id>,<tasks base DN>`
    pub fn task_dn(&self, task_id: &str) -> String {
        format!("ds-task-id={},{}", escape_rdn_value(task_id), self.tasks_base_dn)
    }
}
