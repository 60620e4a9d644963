//! Tasks whose class has no dedicated variant.
//!
//! The object classes and attributes the common codec does not consume are
//! kept verbatim, so an entry for a task class added on the server after this
//! crate was written still survives a decode/encode cycle.

use crate::entry::{Attribute, Entry, OBJECT_CLASS_ATTRIBUTE};
use crate::task::common::{ATTR_TASK_CLASS_NAME, COMMON_PROPERTIES, TASK_OBJECT_CLASS};

/// Object class used when an unknown task brings none of its own.
pub const FALLBACK_OBJECT_CLASS: &str = "extensibleObject";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTask {
    class_name: String,
    object_classes: Vec<String>,
    attributes: Vec<Attribute>,
}

fn is_base_object_class(object_class: &str) -> bool {
    object_class.eq_ignore_ascii_case("top") || object_class.eq_ignore_ascii_case(TASK_OBJECT_CLASS)
}

fn is_consumed_attribute(name: &str) -> bool {
    name.eq_ignore_ascii_case(OBJECT_CLASS_ATTRIBUTE)
        || name.eq_ignore_ascii_case(ATTR_TASK_CLASS_NAME)
        || COMMON_PROPERTIES.iter().any(|p| p.matches_name(name))
}

impl GenericTask {
    /// A task of `class_name` with no data of its own.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self::with_entry_data(class_name, Vec::new(), Vec::new())
    }

    /// Object classes `top` and `ds-task` are dropped, as are attributes the
    /// common codec owns and attributes without values.
    pub fn with_entry_data(
        class_name: impl Into<String>,
        object_classes: Vec<String>,
        attributes: Vec<Attribute>,
    ) -> Self {
        let mut object_classes: Vec<String> = object_classes
            .into_iter()
            .filter(|oc| !is_base_object_class(oc))
            .collect();
        if object_classes.is_empty() {
            object_classes.push(FALLBACK_OBJECT_CLASS.to_string());
        }
        let attributes = attributes
            .into_iter()
            .filter(|a| !a.values().is_empty() && !is_consumed_attribute(a.name()))
            .collect();
        Self {
            class_name: class_name.into(),
            object_classes,
            attributes,
        }
    }

    pub(crate) fn from_entry(class_name: &str, entry: &Entry) -> Self {
        Self::with_entry_data(
            class_name,
            entry.object_classes().to_vec(),
            entry.attributes().to_vec(),
        )
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Never empty.
    pub fn object_classes(&self) -> &[String] {
        &self.object_classes
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}
