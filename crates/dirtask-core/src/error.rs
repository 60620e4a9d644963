//! Errors - 値変換・構築・デコードのエラー型
//!
//! # 分類
//! - **ValueError**: 文字列 ⇄ 型付き値の変換失敗（属性の文脈なし）
//! - **UsageError**: 呼び出し側コードの引数が矛盾している（プログラムの誤り）
//! - **DecodeError**: 外部入力（Entry / PropertyValueMap）が不正
//!
//! UsageError と DecodeError は互いに素です。同じ不変条件違反でも、
//! 直接構築なら UsageError、デコードなら DecodeError になります。

use thiserror::Error;

/// A raw value could not be coerced into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("'{0}' is not a valid boolean value (expected 'true' or 'false')")]
    InvalidBoolean(String),

    #[error("'{value}' is not a valid {kind} value")]
    InvalidNumber { value: String, kind: &'static str },

    #[error("{value} is not allowed: {reason}")]
    OutOfRange { value: String, reason: &'static str },

    #[error("'{0}' is not a valid duration")]
    InvalidDuration(String),

    #[error("'{0}' is not a valid data size")]
    InvalidSize(String),

    #[error("'{value}' is not a recognized {kind}")]
    UnknownName { value: String, kind: &'static str },

    #[error("'{0}' is not a valid generalized time value")]
    InvalidTimestamp(String),

    #[error("expected a {expected} value but found a {actual} value")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("'{value}' is not a valid search filter: {reason}")]
    InvalidFilter { value: String, reason: String },

    #[error("'{0}' is not a valid LDAP URL")]
    InvalidUrl(String),

    #[error("malformed property document: {0}")]
    InvalidDocument(String),
}

/// Direct construction with self-contradictory or missing arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments for {task}: {message}")]
pub struct UsageError {
    task: &'static str,
    message: String,
}

impl UsageError {
    pub fn new(task: &'static str, message: impl Into<String>) -> Self {
        Self {
            task,
            message: message.into(),
        }
    }

    /// Wraps a coercion failure for the named argument.
    pub fn invalid_value(task: &'static str, argument: &str, source: ValueError) -> Self {
        Self::new(task, format!("{argument}: {source}"))
    }

    pub fn task(&self) -> &'static str {
        self.task
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What went wrong while decoding external task data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("entry does not have object class '{0}'")]
    MissingObjectClass(String),

    #[error("missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("attribute '{attribute}' must have exactly one value but has {count}")]
    MultipleValues { attribute: String, count: usize },

    #[error("attribute '{attribute}' has an invalid value: {source}")]
    InvalidValue {
        attribute: String,
        #[source]
        source: ValueError,
    },

    #[error("{0}")]
    Invalid(String),
}

/// External input (an entry or a property-value map) failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to decode {task}: {kind}")]
pub struct DecodeError {
    task: String,
    kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(task: impl Into<String>, kind: DecodeErrorKind) -> Self {
        Self {
            task: task.into(),
            kind,
        }
    }

    pub fn missing_attribute(task: impl Into<String>, attribute: &str) -> Self {
        Self::new(task, DecodeErrorKind::MissingAttribute(attribute.to_string()))
    }

    pub fn invalid_value(task: impl Into<String>, attribute: &str, source: ValueError) -> Self {
        Self::new(
            task,
            DecodeErrorKind::InvalidValue {
                attribute: attribute.to_string(),
                source,
            },
        )
    }

    pub fn invalid(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(task, DecodeErrorKind::Invalid(message.into()))
    }

    /// The task class (or `task` when the class is not yet known).
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// The attribute the failure is attributed to, when there is one.
    pub fn attribute(&self) -> Option<&str> {
        match &self.kind {
            DecodeErrorKind::MissingAttribute(attribute)
            | DecodeErrorKind::MultipleValues { attribute, .. }
            | DecodeErrorKind::InvalidValue { attribute, .. } => Some(attribute),
            DecodeErrorKind::MissingObjectClass(_) | DecodeErrorKind::Invalid(_) => None,
        }
    }
}

/// Either failure surfaced by the framework.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
