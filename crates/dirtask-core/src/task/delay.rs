//! Delay task - 後続タスクの実行を遅らせる
//!
//! # 待機条件（少なくとも 1 つ必要）
//! - **sleep**: 固定時間だけ待つ
//! - **work queue idle**: ワークキューが空になるまで待つ（上限時間つき）
//! - **search**: LDAP URL の検索がエントリを返すまで待つ
//!
//! search を使う場合は interval / time limit / duration の 3 つが必須で、
//! search を使わない場合はこの 3 つを指定できません。
//!
//! # Fail-fast 設計
//! [`DelayTaskBuilder::build`] で全ての組み合わせを検証します。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DecodeError, UsageError, ValueError};
use crate::property::{PropertyKind, PropertyValueMap, TaskProperty};
use crate::task::codec::PropertyReader;
use crate::task::{TaskKind, TaskVariant};
use crate::value;

pub static PROPERTY_SLEEP_DURATION: TaskProperty = TaskProperty::new(
    "ds-task-delay-sleep-duration",
    "Sleep Duration",
    "The length of time to sleep.",
    PropertyKind::Duration,
);

pub static PROPERTY_WAIT_FOR_WORK_QUEUE_IDLE: TaskProperty = TaskProperty::new(
    "ds-task-delay-duration-to-wait-for-work-queue-idle",
    "Duration to Wait for Work Queue Idle",
    "The maximum length of time to wait for the work queue to become idle.",
    PropertyKind::Duration,
);

pub static PROPERTY_SEARCH_URL: TaskProperty = TaskProperty::new(
    "ds-task-delay-ldap-url-for-search-expected-to-return-entries",
    "LDAP URL for Search Expected to Return Entries",
    "LDAP URLs for searches that are expected to return at least one entry.",
    PropertyKind::String,
)
.multi_valued();

pub static PROPERTY_SEARCH_INTERVAL: TaskProperty = TaskProperty::new(
    "ds-task-delay-search-interval",
    "Search Interval",
    "The length of time to wait between search attempts.",
    PropertyKind::Duration,
);

pub static PROPERTY_SEARCH_TIME_LIMIT: TaskProperty = TaskProperty::new(
    "ds-task-delay-search-time-limit",
    "Search Time Limit",
    "The maximum length of time to spend on any single search.",
    PropertyKind::Duration,
);

pub static PROPERTY_WAIT_FOR_SEARCH_ENTRIES: TaskProperty = TaskProperty::new(
    "ds-task-delay-duration-to-wait-for-search-to-return-entries",
    "Duration to Wait for Search to Return Entries",
    "The maximum length of time to wait for every search to return an entry.",
    PropertyKind::Duration,
);

pub static PROPERTY_TIMEOUT_RETURN_STATE: TaskProperty = TaskProperty::new(
    "ds-task-delay-task-return-state-if-timeout-is-encountered",
    "Task Return State if Timeout is Encountered",
    "The state the task ends in if a wait condition times out.",
    PropertyKind::Enumeration,
)
.with_allowed_values(&["stopped-by-error", "completed-with-errors", "completed-successfully"]);

static PROPERTIES: [&TaskProperty; 7] = [
    &PROPERTY_SLEEP_DURATION,
    &PROPERTY_WAIT_FOR_WORK_QUEUE_IDLE,
    &PROPERTY_SEARCH_URL,
    &PROPERTY_SEARCH_INTERVAL,
    &PROPERTY_SEARCH_TIME_LIMIT,
    &PROPERTY_WAIT_FOR_SEARCH_ENTRIES,
    &PROPERTY_TIMEOUT_RETURN_STATE,
];

/// Final task state when a wait condition times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskReturnState {
    StoppedByError,
    CompletedWithErrors,
    CompletedSuccessfully,
}

impl TaskReturnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskReturnState::StoppedByError => "stopped-by-error",
            TaskReturnState::CompletedWithErrors => "completed-with-errors",
            TaskReturnState::CompletedSuccessfully => "completed-successfully",
        }
    }
}

impl FromStr for TaskReturnState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        value::lookup_name(
            s,
            "task return state",
            &[
                ("stopped-by-error", TaskReturnState::StoppedByError),
                ("stopped_by_error", TaskReturnState::StoppedByError),
                ("completed-with-errors", TaskReturnState::CompletedWithErrors),
                ("completed_with_errors", TaskReturnState::CompletedWithErrors),
                ("completed-successfully", TaskReturnState::CompletedSuccessfully),
                ("completed_successfully", TaskReturnState::CompletedSuccessfully),
            ],
        )
    }
}

impl fmt::Display for TaskReturnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `ldap://`, `ldaps://` and `ldapi://` URLs.
fn check_ldap_url(url: &str) -> Result<(), ValueError> {
    let invalid = || ValueError::InvalidUrl(url.to_string());
    let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
    let known = ["ldap", "ldaps", "ldapi"]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme));
    if !known || rest.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayTask {
    sleep_duration_millis: Option<u64>,
    wait_for_work_queue_idle_millis: Option<u64>,
    search_urls: Vec<String>,
    search_interval_millis: Option<u64>,
    search_time_limit_millis: Option<u64>,
    wait_for_search_entries_millis: Option<u64>,
    timeout_return_state: Option<TaskReturnState>,
}

impl DelayTask {
    pub fn builder() -> DelayTaskBuilder {
        DelayTaskBuilder::default()
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(url) = self.search_urls.iter().find(|u| check_ldap_url(u).is_err()) {
            return Err(format!("'{url}' is not a valid LDAP URL"));
        }

        let search_settings = [
            (self.search_interval_millis, "search interval"),
            (self.search_time_limit_millis, "search time limit"),
            (
                self.wait_for_search_entries_millis,
                "duration to wait for search to return entries",
            ),
        ];
        if self.search_urls.is_empty() {
            if let Some((_, name)) = search_settings.iter().find(|(v, _)| v.is_some()) {
                return Err(format!("a {name} may only be given with search LDAP URLs"));
            }
            if self.sleep_duration_millis.is_none() && self.wait_for_work_queue_idle_millis.is_none()
            {
                return Err(
                    "at least one of a sleep duration, a work queue idle duration or \
                     search LDAP URLs must be provided"
                        .into(),
                );
            }
        } else if let Some((_, name)) = search_settings.iter().find(|(v, _)| v.is_none()) {
            return Err(format!("a {name} is required when search LDAP URLs are given"));
        }

        if self.search_interval_millis == Some(0) {
            return Err("the search interval must be greater than zero".into());
        }
        Ok(())
    }

    pub fn sleep_duration(&self) -> Option<Duration> {
        self.sleep_duration_millis.map(Duration::from_millis)
    }

    pub fn wait_for_work_queue_idle(&self) -> Option<Duration> {
        self.wait_for_work_queue_idle_millis.map(Duration::from_millis)
    }

    pub fn search_urls(&self) -> &[String] {
        &self.search_urls
    }

    pub fn search_interval(&self) -> Option<Duration> {
        self.search_interval_millis.map(Duration::from_millis)
    }

    pub fn search_time_limit(&self) -> Option<Duration> {
        self.search_time_limit_millis.map(Duration::from_millis)
    }

    pub fn wait_for_search_entries(&self) -> Option<Duration> {
        self.wait_for_search_entries_millis.map(Duration::from_millis)
    }

    pub fn timeout_return_state(&self) -> Option<TaskReturnState> {
        self.timeout_return_state
    }
}

/// DelayTaskBuilder は DelayTask を構築
///
/// # 使用例
/// ```
/// use std::time::Duration;
/// use dirtask_core::task::DelayTask;
///
/// let delay = DelayTask::builder()
///     .sleep_duration(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(delay.sleep_duration(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DelayTaskBuilder {
    sleep_duration: Option<Duration>,
    wait_for_work_queue_idle: Option<Duration>,
    search_urls: Vec<String>,
    search_interval: Option<Duration>,
    search_time_limit: Option<Duration>,
    wait_for_search_entries: Option<Duration>,
    timeout_return_state: Option<TaskReturnState>,
}

impl DelayTaskBuilder {
    pub fn sleep_duration(mut self, duration: Duration) -> Self {
        self.sleep_duration = Some(duration);
        self
    }

    pub fn wait_for_work_queue_idle(mut self, duration: Duration) -> Self {
        self.wait_for_work_queue_idle = Some(duration);
        self
    }

    /// Waits until every URL's search returns at least one entry.
    pub fn search_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_interval(mut self, interval: Duration) -> Self {
        self.search_interval = Some(interval);
        self
    }

    pub fn search_time_limit(mut self, limit: Duration) -> Self {
        self.search_time_limit = Some(limit);
        self
    }

    pub fn wait_for_search_entries(mut self, duration: Duration) -> Self {
        self.wait_for_search_entries = Some(duration);
        self
    }

    pub fn timeout_return_state(mut self, state: TaskReturnState) -> Self {
        self.timeout_return_state = Some(state);
        self
    }

    /// # 検証
    /// - 待機条件が 1 つもなければエラー
    /// - search の設定が URL と揃っていなければエラー
    pub fn build(self) -> Result<DelayTask, UsageError> {
        let millis = |d: Option<Duration>, property: &TaskProperty| {
            d.map(value::duration_to_millis)
                .transpose()
                .map_err(|e| {
                    UsageError::invalid_value(DelayTask::TASK_NAME, property.attribute_name(), e)
                })
        };
        let task = DelayTask {
            sleep_duration_millis: millis(self.sleep_duration, &PROPERTY_SLEEP_DURATION)?,
            wait_for_work_queue_idle_millis: millis(
                self.wait_for_work_queue_idle,
                &PROPERTY_WAIT_FOR_WORK_QUEUE_IDLE,
            )?,
            search_urls: self.search_urls,
            search_interval_millis: millis(self.search_interval, &PROPERTY_SEARCH_INTERVAL)?,
            search_time_limit_millis: millis(self.search_time_limit, &PROPERTY_SEARCH_TIME_LIMIT)?,
            wait_for_search_entries_millis: millis(
                self.wait_for_search_entries,
                &PROPERTY_WAIT_FOR_SEARCH_ENTRIES,
            )?,
            timeout_return_state: self.timeout_return_state,
        };
        task.validate()
            .map_err(|m| UsageError::new(DelayTask::TASK_NAME, m))?;
        Ok(task)
    }
}

impl TaskVariant for DelayTask {
    const TASK_NAME: &'static str = "delay task";
    const CLASS_NAME: &'static str = "com.unboundid.directory.server.tasks.DelayTask";
    const OBJECT_CLASS: &'static str = "ds-task-delay";

    fn properties() -> &'static [&'static TaskProperty] {
        &PROPERTIES
    }

    fn decode(reader: &PropertyReader<'_>) -> Result<Self, DecodeError> {
        let task = Self {
            sleep_duration_millis: reader.duration_millis(&PROPERTY_SLEEP_DURATION)?,
            wait_for_work_queue_idle_millis: reader
                .duration_millis(&PROPERTY_WAIT_FOR_WORK_QUEUE_IDLE)?,
            search_urls: reader.strings(&PROPERTY_SEARCH_URL)?,
            search_interval_millis: reader.duration_millis(&PROPERTY_SEARCH_INTERVAL)?,
            search_time_limit_millis: reader.duration_millis(&PROPERTY_SEARCH_TIME_LIMIT)?,
            wait_for_search_entries_millis: reader
                .duration_millis(&PROPERTY_WAIT_FOR_SEARCH_ENTRIES)?,
            timeout_return_state: reader.parsed(&PROPERTY_TIMEOUT_RETURN_STATE, |s| s.parse())?,
        };
        task.validate().map_err(|m| reader.invalid(m))?;
        Ok(task)
    }

    fn encode(&self, values: &mut PropertyValueMap) {
        let durations = [
            (&PROPERTY_SLEEP_DURATION, self.sleep_duration_millis),
            (
                &PROPERTY_WAIT_FOR_WORK_QUEUE_IDLE,
                self.wait_for_work_queue_idle_millis,
            ),
        ];
        for (property, millis) in durations {
            values.insert_optional(property, millis.map(value::format_duration_millis));
        }
        values.insert_strings(&PROPERTY_SEARCH_URL, &self.search_urls);
        let durations = [
            (&PROPERTY_SEARCH_INTERVAL, self.search_interval_millis),
            (&PROPERTY_SEARCH_TIME_LIMIT, self.search_time_limit_millis),
            (
                &PROPERTY_WAIT_FOR_SEARCH_ENTRIES,
                self.wait_for_search_entries_millis,
            ),
        ];
        for (property, millis) in durations {
            values.insert_optional(property, millis.map(value::format_duration_millis));
        }
        values.insert_optional(
            &PROPERTY_TIMEOUT_RETURN_STATE,
            self.timeout_return_state.map(|s| s.as_str()),
        );
    }

    fn from_kind(kind: &TaskKind) -> Option<&Self> {
        match kind {
            TaskKind::Delay(task) => Some(task),
            _ => None,
        }
    }
}
