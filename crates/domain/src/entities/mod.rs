//! 领域实体
//!
//! 作业（Job）拥有一组任务（Task），任务通过 `job_id` 引用所属作业；
//! 资源池（Pool）通过专属队列接收工作集（WorkSet）。
//! 所有实体的权威副本都在记录存储中，这里的结构体只是一次读取的快照。

pub mod job;
pub mod pool;
pub mod task;
pub mod workset;

pub use job::*;
pub use pool::*;
pub use task::*;
pub use workset::*;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use fuzz_scheduler_core::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 计算 `now` 之后 `hours` 小时的截止时间（毫秒精度）
///
/// 时长不为正或结果超出时间范围时返回 [`SchedulerError::InvalidDuration`]。
pub fn deadline_after(now: DateTime<Utc>, hours: i64) -> SchedulerResult<DateTime<Utc>> {
    if hours <= 0 {
        return Err(SchedulerError::InvalidDuration { hours });
    }
    TimeDelta::try_hours(hours)
        .and_then(|delta| now.checked_add_signed(delta))
        .map(|deadline| deadline.trunc_subsecs(3))
        .ok_or(SchedulerError::InvalidDuration { hours })
}

/// 操作系统
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Os {
    Windows,
    #[default]
    Linux,
}

/// 提交者归属信息，原样随事件传递
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub application_id: Option<Uuid>,
    pub object_id: Option<Uuid>,
    pub upn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after_adds_hours() {
        let now = Utc::now().trunc_subsecs(3);
        let deadline = deadline_after(now, 2).unwrap();
        assert_eq!(deadline - now, TimeDelta::hours(2));
    }

    #[test]
    fn test_deadline_after_rejects_out_of_range_durations() {
        let now = Utc::now();
        for hours in [0, -5, i64::MAX, i64::MAX / 1000] {
            match deadline_after(now, hours) {
                Err(SchedulerError::InvalidDuration { hours: reported }) => {
                    assert_eq!(reported, hours)
                }
                other => panic!("unexpected result for {hours}: {other:?}"),
            }
        }
    }
}
