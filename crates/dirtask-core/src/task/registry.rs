//! Variant registry - タスククラス名から variant の codec を引く
//!
//! # 内部実装
//! - `variant_entry::<T>()` で [`TaskVariant`] の実装から [`VariantEntry`] を作る
//! - 型消去は fn pointer で行う
//! - 表は `static` なので実行時の登録処理はない
//!
//! クラス名は完全一致（大文字小文字を区別）で比較します。

use std::fmt;

use super::alert::AlertTask;
use super::audit_data_security::AuditDataSecurityTask;
use super::codec::PropertyReader;
use super::collect_support_data::CollectSupportDataTask;
use super::delay::DelayTask;
use super::disconnect_client::DisconnectClientTask;
use super::lockdown::{EnterLockdownModeTask, LeaveLockdownModeTask};
use super::search::SearchTask;
use super::shutdown::ShutdownTask;
use super::{TaskKind, TaskVariant};
use crate::error::DecodeError;
use crate::property::TaskProperty;

/// One registered variant, with its codec erased to plain fn pointers.
pub struct VariantEntry {
    class_name: &'static str,
    task_name: &'static str,
    object_class: &'static str,
    properties: fn() -> &'static [&'static TaskProperty],
    decode: fn(&PropertyReader<'_>) -> Result<TaskKind, DecodeError>,
}

impl VariantEntry {
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn task_name(&self) -> &'static str {
        self.task_name
    }

    pub fn object_class(&self) -> &'static str {
        self.object_class
    }

    pub fn properties(&self) -> &'static [&'static TaskProperty] {
        (self.properties)()
    }

    pub(crate) fn decode(&self, reader: &PropertyReader<'_>) -> Result<TaskKind, DecodeError> {
        (self.decode)(reader)
    }
}

impl fmt::Debug for VariantEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantEntry")
            .field("class_name", &self.class_name)
            .field("object_class", &self.object_class)
            .finish_non_exhaustive()
    }
}

fn decode_into<T>(reader: &PropertyReader<'_>) -> Result<TaskKind, DecodeError>
where
    T: TaskVariant + Into<TaskKind>,
{
    T::decode(reader).map(Into::into)
}

const fn variant_entry<T>() -> VariantEntry
where
    T: TaskVariant + Into<TaskKind>,
{
    VariantEntry {
        class_name: T::CLASS_NAME,
        task_name: T::TASK_NAME,
        object_class: T::OBJECT_CLASS,
        properties: T::properties,
        decode: decode_into::<T>,
    }
}

static VARIANTS: [VariantEntry; 9] = [
    variant_entry::<AlertTask>(),
    variant_entry::<AuditDataSecurityTask>(),
    variant_entry::<CollectSupportDataTask>(),
    variant_entry::<DelayTask>(),
    variant_entry::<DisconnectClientTask>(),
    variant_entry::<EnterLockdownModeTask>(),
    variant_entry::<LeaveLockdownModeTask>(),
    variant_entry::<SearchTask>(),
    variant_entry::<ShutdownTask>(),
];

pub fn variants() -> &'static [VariantEntry] {
    &VARIANTS
}

pub fn lookup(class_name: &str) -> Option<&'static VariantEntry> {
    VARIANTS.iter().find(|v| v.class_name == class_name)
}

pub fn known_task_classes() -> impl Iterator<Item = &'static str> {
    VARIANTS.iter().map(VariantEntry::class_name)
}

/// The property catalogue for a known task class.
pub fn properties_for_class(class_name: &str) -> Option<&'static [&'static TaskProperty]> {
    lookup(class_name).map(VariantEntry::properties)
}
