//! Task ID generation.
//!
//! # ULID ベースのタスク ID
//! タスク ID が指定されなかった場合、ULID を生成して使用します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//! - **DN に安全**: Crockford base32 なので RDN のエスケープが不要

use std::sync::OnceLock;

use ulid::Ulid;

use crate::clock::{Clock, SystemClock};

/// IdGenerator はタスク ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（プロセス全体で共有される）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> String;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って時刻部分を決めるので、FixedClock と組み合わせると
/// timestamp 部分が決定的になります。
#[derive(Debug, Clone)]
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn generate_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> String {
        self.generate_ulid().to_string()
    }
}

fn default_generator() -> &'static UlidGenerator<SystemClock> {
    static GENERATOR: OnceLock<UlidGenerator<SystemClock>> = OnceLock::new();
    GENERATOR.get_or_init(|| UlidGenerator::new(SystemClock))
}

/// Generates a task ID with the process-wide default generator.
pub fn generate_task_id() -> String {
    default_generator().generate_task_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn generated_ids_are_unique() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_task_id();
        let id2 = id_gen.generate_task_id();
        let id3 = generate_task_id();

        // 各 ID が一意であることを確認
        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_eq!(id1.len(), 26);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let a = id_gen.generate_ulid();
        let b = id_gen.generate_ulid();

        // ランダム部分があるので ID は異なる
        assert_ne!(a, b);

        // ただし、timestamp 部分は同じはず
        assert_eq!(a.timestamp_ms(), b.timestamp_ms());
        assert_eq!(a.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn ids_parse_back_as_ulids() {
        let id = generate_task_id();
        assert!(Ulid::from_string(&id).is_ok());
    }
}
