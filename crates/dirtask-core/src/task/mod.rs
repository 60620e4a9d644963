//! Task - タスク定義と Entry / PropertyValueMap との相互変換
//!
//! # 二層構造
//! - **共通層**: [`CommonTaskAttributes`]（タスク ID、スケジュール、通知、アラート）
//! - **種別層**: [`TaskKind`] の各 variant（alert, search, ...）が独自のプロパティを持つ
//!
//! 共通層のエンコード/デコードは 1 箇所、種別層は [`TaskVariant`] の実装ごとに 1 箇所です。
//!
//! # 変換の経路
//! - `Task::decode_entry` / `Task::to_entry`: Entry ⇄ Task
//! - `Task::decode_property_map` / `Task::task_property_values`: PropertyValueMap ⇄ Task
//!
//! どちらの経路も同じ [`PropertyReader`] を通るので、同じ不変条件で失敗します。

pub mod alert;
pub mod audit_data_security;
pub mod codec;
pub mod collect_support_data;
pub mod common;
pub mod delay;
pub mod disconnect_client;
pub mod generic;
pub mod lockdown;
pub mod registry;
pub mod search;
pub mod shutdown;

#[cfg(test)]
mod test_support;

use std::fmt;

use crate::config::CodecConfig;
use crate::entry::{Attribute, Entry, OBJECT_CLASS_ATTRIBUTE};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::property::{PropertyValue, PropertyValueMap, TaskProperty};

pub use self::alert::AlertTask;
pub use self::audit_data_security::AuditDataSecurityTask;
pub use self::codec::PropertyReader;
pub use self::collect_support_data::{
    CollectSupportDataSecurityLevel, CollectSupportDataTask, CollectSupportDataTaskProperties,
};
pub use self::common::{CommonTaskAttributes, FailedDependencyAction};
pub use self::delay::{DelayTask, DelayTaskBuilder, TaskReturnState};
pub use self::disconnect_client::DisconnectClientTask;
pub use self::generic::GenericTask;
pub use self::lockdown::{EnterLockdownModeTask, LeaveLockdownModeTask};
pub use self::registry::{VariantEntry, known_task_classes, properties_for_class};
pub use self::search::{SearchScope, SearchTask};
pub use self::shutdown::ShutdownTask;

use self::common::{ATTR_TASK_CLASS_NAME, COMMON_PROPERTIES, PROPERTY_TASK_ID, TASK_OBJECT_CLASS};

/// TaskVariant は 1 つのタスク種別（サーバー側の実装クラス）に対応
///
/// # Associated Constants
/// - `CLASS_NAME`: サーバーが認識する実装クラス名（完全一致が必要）
/// - `OBJECT_CLASS`: エントリに必ず付与される種別固有の objectClass
///
/// `decode` は外部入力を扱うので、不正なデータは必ず `DecodeError` で返します。
pub trait TaskVariant: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Human-readable name used in usage errors, e.g. `alert task`.
    const TASK_NAME: &'static str;
    const CLASS_NAME: &'static str;
    const OBJECT_CLASS: &'static str;

    /// The variant's property catalogue, in declaration order.
    fn properties() -> &'static [&'static TaskProperty];

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError>;

    /// Adds every variant-specific property that is set.
    fn encode(&self, values: &mut PropertyValueMap);

    fn from_kind(kind: &TaskKind) -> Option<&Self>;
}

/// One case per supported task class; anything else decodes as `Generic`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Alert(AlertTask),
    AuditDataSecurity(AuditDataSecurityTask),
    CollectSupportData(CollectSupportDataTask),
    Delay(DelayTask),
    DisconnectClient(DisconnectClientTask),
    EnterLockdownMode(EnterLockdownModeTask),
    LeaveLockdownMode(LeaveLockdownModeTask),
    Search(SearchTask),
    Shutdown(ShutdownTask),
    Generic(GenericTask),
}

macro_rules! with_variant {
    ($kind:expr, $t:ident => $known:expr, $g:ident => $generic:expr) => {
        match $kind {
            TaskKind::Alert($t) => $known,
            TaskKind::AuditDataSecurity($t) => $known,
            TaskKind::CollectSupportData($t) => $known,
            TaskKind::Delay($t) => $known,
            TaskKind::DisconnectClient($t) => $known,
            TaskKind::EnterLockdownMode($t) => $known,
            TaskKind::LeaveLockdownMode($t) => $known,
            TaskKind::Search($t) => $known,
            TaskKind::Shutdown($t) => $known,
            TaskKind::Generic($g) => $generic,
        }
    };
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for TaskKind {
                fn from(task: $ty) -> Self {
                    TaskKind::$variant(task)
                }
            }
        )+
    };
}

impl_from_variant!(
    Alert(AlertTask),
    AuditDataSecurity(AuditDataSecurityTask),
    CollectSupportData(CollectSupportDataTask),
    Delay(DelayTask),
    DisconnectClient(DisconnectClientTask),
    EnterLockdownMode(EnterLockdownModeTask),
    LeaveLockdownMode(LeaveLockdownModeTask),
    Search(SearchTask),
    Shutdown(ShutdownTask),
    Generic(GenericTask),
);

fn class_name_of<T: TaskVariant>(_: &T) -> &'static str {
    T::CLASS_NAME
}

fn task_name_of<T: TaskVariant>(_: &T) -> &'static str {
    T::TASK_NAME
}

fn object_class_of<T: TaskVariant>(_: &T) -> &'static str {
    T::OBJECT_CLASS
}

fn properties_of<T: TaskVariant>(_: &T) -> &'static [&'static TaskProperty] {
    T::properties()
}

impl TaskKind {
    pub fn class_name(&self) -> &str {
        with_variant!(self, t => class_name_of(t), g => g.class_name())
    }

    pub fn task_name(&self) -> &str {
        with_variant!(self, t => task_name_of(t), _g => "task")
    }

    /// Never empty: known variants return their marker class.
    pub fn additional_object_classes(&self) -> Vec<String> {
        with_variant!(
            self,
            t => vec![object_class_of(t).to_string()],
            g => g.object_classes().to_vec()
        )
    }

    pub fn task_specific_properties(&self) -> &'static [&'static TaskProperty] {
        with_variant!(self, t => properties_of(t), _g => &[])
    }

    pub(crate) fn encode(&self, values: &mut PropertyValueMap) {
        with_variant!(self, t => t.encode(values), _g => ())
    }
}

/// A validated task: the common record plus one variant payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    common: CommonTaskAttributes,
    kind: TaskKind,
}

impl Task {
    pub fn new(common: CommonTaskAttributes, kind: impl Into<TaskKind>) -> Self {
        Self {
            common,
            kind: kind.into(),
        }
    }

    /// A task with a generated ID and no common attributes set.
    pub fn with_defaults(kind: impl Into<TaskKind>) -> Self {
        Self::new(CommonTaskAttributes::new(), kind)
    }

    pub fn common(&self) -> &CommonTaskAttributes {
        &self.common
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn into_parts(self) -> (CommonTaskAttributes, TaskKind) {
        (self.common, self.kind)
    }

    /// The variant payload, when this task is a `T`.
    pub fn variant<T: TaskVariant>(&self) -> Option<&T> {
        T::from_kind(&self.kind)
    }

    pub fn task_id(&self) -> &str {
        self.common.task_id()
    }

    pub fn class_name(&self) -> &str {
        self.kind.class_name()
    }

    pub fn additional_object_classes(&self) -> Vec<String> {
        self.kind.additional_object_classes()
    }

    /// Variant-specific attributes that are actually set.
    pub fn additional_attributes(&self) -> Vec<Attribute> {
        let mut values = PropertyValueMap::new();
        self.kind.encode(&mut values);
        let mut attributes: Vec<Attribute> = values
            .iter()
            .map(|(property, values)| {
                Attribute::new(
                    property.attribute_name(),
                    values.iter().map(PropertyValue::to_wire_string),
                )
            })
            .collect();
        if let TaskKind::Generic(generic) = &self.kind {
            attributes.extend(generic.attributes().iter().cloned());
        }
        attributes
    }

    pub fn common_task_properties() -> &'static [&'static TaskProperty] {
        &COMMON_PROPERTIES
    }

    pub fn task_specific_properties(&self) -> &'static [&'static TaskProperty] {
        self.kind.task_specific_properties()
    }

    /// Common and variant properties that are set, common ones first.
    pub fn task_property_values(&self) -> PropertyValueMap {
        let mut values = PropertyValueMap::new();
        self.common.encode(&mut values);
        self.kind.encode(&mut values);
        values
    }

    pub fn to_entry(&self) -> Entry {
        self.to_entry_with(&CodecConfig::default())
    }

    pub fn to_entry_with(&self, config: &CodecConfig) -> Entry {
        let mut entry = Entry::new(config.task_dn(self.task_id()));

        let mut object_classes = vec!["top".to_string(), TASK_OBJECT_CLASS.to_string()];
        object_classes.extend(self.additional_object_classes());
        entry.add_attribute(OBJECT_CLASS_ATTRIBUTE, object_classes);
        entry.add_attribute(PROPERTY_TASK_ID.attribute_name(), [self.task_id()]);
        entry.add_attribute(ATTR_TASK_CLASS_NAME, [self.class_name()]);

        for (property, values) in self.task_property_values().iter() {
            if *property == PROPERTY_TASK_ID {
                continue;
            }
            entry.add_attribute(
                property.attribute_name(),
                values.iter().map(PropertyValue::to_wire_string),
            );
        }
        if let TaskKind::Generic(generic) = &self.kind {
            for attribute in generic.attributes() {
                entry.add_attribute(attribute.name(), attribute.values().iter().cloned());
            }
        }

        tracing::debug!(
            task_id = self.task_id(),
            class_name = self.class_name(),
            attributes = entry.attributes().len(),
            "encoded task entry"
        );
        entry
    }

    /// Decodes a task entry.
    ///
    /// The entry must have the `ds-task` object class, a task ID and a class
    /// name. Attributes no catalogue knows are ignored, except for unknown
    /// task classes where they are kept on the [`GenericTask`].
    pub fn decode_entry(entry: &Entry) -> Result<Self, DecodeError> {
        let context = || format!("task entry '{}'", entry.dn());
        if !entry.has_object_class(TASK_OBJECT_CLASS) {
            return Err(DecodeError::new(
                context(),
                DecodeErrorKind::MissingObjectClass(TASK_OBJECT_CLASS.to_string()),
            ));
        }
        let class_name = match entry.attribute_values(ATTR_TASK_CLASS_NAME) {
            [] => return Err(DecodeError::missing_attribute(context(), ATTR_TASK_CLASS_NAME)),
            [class_name] => class_name.as_str(),
            values => {
                return Err(DecodeError::new(
                    context(),
                    DecodeErrorKind::MultipleValues {
                        attribute: ATTR_TASK_CLASS_NAME.to_string(),
                        count: values.len(),
                    },
                ));
            }
        };

        let mut values = codec::values_from_entry(entry, &COMMON_PROPERTIES);
        let variant = registry::lookup(class_name);
        if let Some(variant) = variant {
            values.extend(codec::values_from_entry(entry, variant.properties()));
        }

        let reader = PropertyReader::new(&values, class_name);
        let common = CommonTaskAttributes::decode(&reader, false)?;
        let kind = match variant {
            Some(variant) => variant.decode(&reader)?,
            None => {
                tracing::debug!(class_name, "no variant for task class; decoding as generic");
                TaskKind::Generic(GenericTask::from_entry(class_name, entry))
            }
        };

        let task = Task { common, kind };
        tracing::debug!(
            task_id = task.task_id(),
            class_name = task.class_name(),
            "decoded task entry"
        );
        Ok(task)
    }

    /// Decodes a property-value map for the given task class.
    ///
    /// Properties that are absent stay unset; a missing task ID is generated.
    /// For class names without a variant only the common properties are read.
    pub fn decode_property_map(
        class_name: &str,
        values: &PropertyValueMap,
    ) -> Result<Self, DecodeError> {
        if class_name.is_empty() {
            return Err(DecodeError::invalid("task", "the task class name must not be empty"));
        }

        let reader = PropertyReader::new(values, class_name);
        let common = CommonTaskAttributes::decode(&reader, true)?;
        let kind = match registry::lookup(class_name) {
            Some(variant) => variant.decode(&reader)?,
            None => TaskKind::Generic(GenericTask::new(class_name)),
        };

        tracing::debug!(task_id = common.task_id(), class_name, "decoded task properties");
        Ok(Task { common, kind })
    }
}
