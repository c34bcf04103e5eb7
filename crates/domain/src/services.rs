//! 协作方接口

use async_trait::async_trait;
use fuzz_scheduler_core::{Filter, SchedulerResult};
use uuid::Uuid;

use crate::entities::Task;

/// 任务生命周期接口
///
/// 作业的级联停止只依赖这两个能力：按条件完整读取任务，以及向任务发出停止信号。
#[async_trait]
pub trait TaskLifecycle: Send + Sync {
    /// 完整读取满足条件的任务
    async fn query(&self, filter: Filter) -> SchedulerResult<Vec<Task>>;

    /// 通知任务停止；幂等，不等待任务真正结束
    async fn mark_stopping(&self, task: &Task) -> SchedulerResult<()>;

    async fn get_by_job_id(&self, job_id: Uuid) -> SchedulerResult<Vec<Task>> {
        self.query(Filter::eq("job_id", job_id)).await
    }
}
