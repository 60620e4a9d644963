//! dirtask-core
//!
//! Typed definitions of directory server administrative tasks and their
//! conversion to and from task entries.
//!
//! # モジュール構成
//! - **value**: 文字列 ⇄ 型付き値（boolean, 整数, 期間, サイズ, 時刻）
//! - **property**: TaskProperty（プロパティ記述子）と PropertyValueMap
//! - **entry**: Entry / Attribute（タスクの保存形式）
//! - **filter**: 検索フィルタの構文解析
//! - **task**: Task, TaskKind, 共通属性, 各タスク種別, codec
//! - **clock / ids**: タスク ID の生成（ULID）
//! - **config**: CodecConfig
//! - **error**: ValueError / UsageError / DecodeError
//!
//! # 使用例
//! ```
//! use dirtask_core::task::{SearchScope, SearchTask, Task};
//!
//! let search = SearchTask::new(
//!     "dc=example,dc=com",
//!     SearchScope::Sub,
//!     "(uid=jdoe)",
//!     vec![],
//!     "/tmp/jdoe.ldif",
//!     None,
//! )
//! .unwrap();
//! let task = Task::with_defaults(search);
//!
//! let entry = task.to_entry();
//! assert_eq!(Task::decode_entry(&entry).unwrap(), task);
//! ```

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod ids;
pub mod property;
pub mod task;
pub mod value;

pub use crate::config::CodecConfig;
pub use crate::entry::{Attribute, Entry};
pub use crate::error::{DecodeError, DecodeErrorKind, Error, UsageError, ValueError};
pub use crate::filter::Filter;
pub use crate::property::{PropertyKind, PropertyValue, PropertyValueMap, TaskProperty};
pub use crate::task::{CommonTaskAttributes, Task, TaskKind, TaskVariant};
