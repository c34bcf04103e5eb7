use async_trait::async_trait;
use chrono::Utc;
use fuzz_scheduler_core::{ApiError, ErrorCode, Filter, Orm, SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{
    Event, EventTaskFailed, EventTaskStateUpdated, Job, OrchestratorContext, Task, TaskLifecycle,
    TaskState,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 基于记录存储的任务生命周期操作
#[derive(Clone)]
pub struct TaskOperations {
    context: OrchestratorContext,
    tasks: Orm<Task>,
}

impl TaskOperations {
    pub fn new(context: OrchestratorContext) -> Self {
        let tasks = context.orm::<Task>();
        Self { context, tasks }
    }

    pub async fn get_by_task_id(&self, task_id: Uuid) -> SchedulerResult<Option<Task>> {
        let mut tasks = self.tasks.query_all(Filter::eq("task_id", task_id)).await?;
        Ok(tasks.pop())
    }

    /// 插入新任务，所属作业必须已存在
    pub async fn create(&self, task: &Task) -> SchedulerResult<Task> {
        let job_key = task.job_id.to_string();
        if self
            .context
            .orm::<Job>()
            .get(&job_key, &job_key)
            .await?
            .is_none()
        {
            warn!("任务 {} 引用的作业 {} 不存在", task.task_id, task.job_id);
            return Err(SchedulerError::JobNotFound { job_id: job_key });
        }
        self.tasks.insert(task).await
    }

    /// 将任务标记为失败并进入 Stopping；已在停止中的任务保持不变
    #[instrument(skip(self, task, error), fields(task_id = %task.task_id, job_id = %task.job_id))]
    pub async fn mark_failed(&self, task: &Task, error: ApiError) -> SchedulerResult<Task> {
        if task.state.shutting_down() {
            debug!("任务 {} 已在停止中，忽略失败标记", task.task_id);
            return Ok(task.clone());
        }

        warn!("任务 {} 失败: {}", task.task_id, error);
        let mut failed = task.clone();
        failed.error = Some(error.clone());
        failed.state = TaskState::Stopping;
        let failed = self.tasks.replace(&failed).await?;

        self.context
            .events
            .send_event(Event::TaskFailed(EventTaskFailed {
                job_id: failed.job_id,
                task_id: failed.task_id,
                error,
                user_info: failed.user_info.clone(),
                config: failed.config.clone(),
            }))
            .await?;
        Ok(failed)
    }

    /// 持久化新的任务状态并发出状态变更事件
    ///
    /// 任务首次进入运行阶段时按配置时长设置截止时间。
    /// `Stopped` 是终态，已停止的任务不会被改回其他状态。
    #[instrument(skip(self, task), fields(task_id = %task.task_id, state = %state))]
    pub async fn set_state(&self, task: &Task, state: TaskState) -> SchedulerResult<Task> {
        if task.state == state {
            return Ok(task.clone());
        }
        if task.is_stopped() {
            warn!("任务 {} 已停止，拒绝迁移到 {}", task.task_id, state);
            return Ok(task.clone());
        }

        let mut updated = task.clone();
        updated.state = state;
        if matches!(state, TaskState::Running | TaskState::SettingUp) && updated.end_time.is_none()
        {
            updated.end_time = Some(updated.deadline_from(Utc::now())?);
        }
        let updated = self.tasks.replace(&updated).await?;

        self.context
            .events
            .send_event(Event::TaskStateUpdated(EventTaskStateUpdated {
                job_id: updated.job_id,
                task_id: updated.task_id,
                state,
                end_time: updated.end_time,
                config: updated.config.clone(),
            }))
            .await?;
        Ok(updated)
    }
}

#[async_trait]
impl TaskLifecycle for TaskOperations {
    async fn query(&self, filter: Filter) -> SchedulerResult<Vec<Task>> {
        self.tasks.query_all(filter).await
    }

    async fn mark_stopping(&self, task: &Task) -> SchedulerResult<()> {
        if task.state.shutting_down() {
            debug!("任务 {} 已处于 {} 状态", task.task_id, task.state);
            return Ok(());
        }

        if !task.state.has_started() {
            self.mark_failed(
                task,
                ApiError::new(ErrorCode::TaskFailed, "task never started"),
            )
            .await?;
        } else {
            info!("停止任务 {}", task.task_id);
            self.set_state(task, TaskState::Stopping).await?;
        }
        Ok(())
    }
}
