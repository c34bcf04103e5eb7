//! 作业生命周期
//!
//! 级联停止是电平触发的：每次调用都根据任务的当前状态重新判断，
//! 可以在每个调度周期重复调用，直到作业进入 `Stopped`。

use chrono::Utc;
use futures::stream::BoxStream;
use fuzz_scheduler_core::{Filter, Orm, SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{
    Event, EventJobStopped, Job, JobConfig, JobState, JobTaskStopped, OrchestratorContext,
    TaskLifecycle, UserInfo,
};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobOperations {
    context: OrchestratorContext,
    jobs: Orm<Job>,
}

impl JobOperations {
    pub fn new(context: OrchestratorContext) -> Self {
        let jobs = context.orm::<Job>();
        Self { context, jobs }
    }

    /// 按 ID 查找作业，不存在时返回 `None`
    pub async fn get(&self, job_id: Uuid) -> SchedulerResult<Option<Job>> {
        let key = job_id.to_string();
        self.jobs.get(&key, &key).await
    }

    /// 创建处于 Init 状态的新作业
    ///
    /// 运行时长必须能换算成有效的截止时间，否则拒绝创建。
    pub async fn create(&self, config: JobConfig, user_info: Option<UserInfo>) -> SchedulerResult<Job> {
        let job = Job::new(config, user_info);
        job.deadline_from(job.created_at)?;
        let job = self.jobs.insert(&job).await?;
        info!("创建作业 {} ({})", job.job_id, job.config.name);
        Ok(job)
    }

    /// Init → Enabled
    pub async fn init(&self, job: &Job) -> SchedulerResult<Job> {
        if job.state == JobState::Enabled || !job.state.can_transition_to(JobState::Enabled) {
            debug!("作业 {} 已处于 {} 状态，跳过初始化", job.job_id, job.state);
            return Ok(job.clone());
        }
        let mut enabled = job.clone();
        enabled.state = JobState::Enabled;
        self.jobs.replace(&enabled).await
    }

    /// 首次启动时设置截止时间；已设置则不做任何修改
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn on_start(&self, job: &Job) -> SchedulerResult<Job> {
        if job.is_started() {
            return Ok(job.clone());
        }

        let mut started = job.clone();
        started.end_time = Some(job.deadline_from(Utc::now())?);
        let started = self.jobs.replace(&started).await?;
        debug!("作业 {} 截止时间: {:?}", started.job_id, started.end_time);
        Ok(started)
    }

    /// 截止时间早于当前时刻的作业
    pub fn search_expired(&self) -> BoxStream<'static, SchedulerResult<Job>> {
        self.jobs.query(Filter::lt("end_time", Utc::now()))
    }

    /// 状态属于给定集合的作业
    pub fn search_state(&self, states: &[JobState]) -> BoxStream<'static, SchedulerResult<Job>> {
        self.jobs
            .query(Filter::equal_any("state", states.iter().copied()))
    }

    /// 停止长时间未启动的作业
    ///
    /// 仅在配置了超时阈值时可用。单个作业失败只记录日志，不影响其余作业，
    /// 返回本轮成功推进的作业数。
    pub async fn stop_never_started_jobs(
        &self,
        tasks: &dyn TaskLifecycle,
    ) -> SchedulerResult<usize> {
        let Some(timeout) = self.context.settings.never_started_timeout else {
            return Err(SchedulerError::NotImplemented(
                "未配置未启动作业超时时间".to_string(),
            ));
        };

        let cutoff = Utc::now() - timeout;
        let filter = Filter::eq("state", JobState::Init).and(Filter::lt("created_at", cutoff));
        let stale = self.jobs.query_all(filter).await?;

        let mut processed = 0;
        for job in &stale {
            warn!("作业 {} 创建于 {} 之后从未启动，开始停止", job.job_id, job.created_at);
            match self.stopping(job, tasks).await {
                Ok(_) => processed += 1,
                Err(e) if e.is_retryable() => {
                    warn!("停止作业 {} 失败，下一轮重试: {}", job.job_id, e);
                }
                Err(e) => {
                    error!("停止作业 {} 失败: {}", job.job_id, e);
                }
            }
        }
        Ok(processed)
    }

    /// 级联停止
    ///
    /// 仍有未停止的任务时逐个发出停止信号，作业保持 `Stopping`；
    /// 全部任务已停止（包括没有任务）时作业进入 `Stopped` 并发出一次 `JobStopped` 事件。
    /// 两个分支都只在最后写入一次作业记录，版本冲突原样返回给调用方。
    #[instrument(skip(self, job, tasks), fields(job_id = %job.job_id))]
    pub async fn stopping(&self, job: &Job, tasks: &dyn TaskLifecycle) -> SchedulerResult<Job> {
        if !job.state.can_transition_to(JobState::Stopping) {
            debug!("作业 {} 已停止", job.job_id);
            return Ok(job.clone());
        }

        let mut job = job.clone();
        job.state = JobState::Stopping;

        let all_tasks = tasks.get_by_job_id(job.job_id).await?;
        let (not_stopped, stopped): (Vec<_>, Vec<_>) =
            all_tasks.into_iter().partition(|task| !task.is_stopped());

        if !not_stopped.is_empty() {
            info!(
                "作业 {} 仍有 {} 个任务未停止",
                job.job_id,
                not_stopped.len()
            );
            for task in &not_stopped {
                tasks.mark_stopping(task).await?;
            }
        } else {
            job.state = JobState::Stopped;
            let task_info = stopped
                .into_iter()
                .map(|task| JobTaskStopped {
                    task_id: task.task_id,
                    task_type: task.task_type(),
                    error: task.error,
                })
                .collect();

            self.context
                .events
                .send_event(Event::JobStopped(EventJobStopped {
                    job_id: job.job_id,
                    config: job.config.clone(),
                    user_info: job.user_info.clone(),
                    task_info,
                }))
                .await?;
            counter!("job_stopped_total").increment(1);
            info!("作业 {} 已停止", job.job_id);
        }

        self.jobs.replace(&job).await
    }
}
