use std::collections::HashSet;
use std::time::Duration;

use futures::TryStreamExt;
use fuzz_scheduler_core::{SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{Job, JobState, TaskLifecycle};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::job_lifecycle::JobOperations;

/// 一次扫描的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 本次进入 Stopped 的作业
    pub stopped: usize,
    /// 仍在等待任务停止的作业
    pub stopping: usize,
    /// 处理失败的作业（版本冲突也计入，下个周期重试）
    pub failed: usize,
}

/// 周期性推进作业状态
///
/// 每个周期处理已过期的作业、处于 Stopping 的作业，以及（如已配置）长时间未启动的作业。
pub struct JobTimer<T> {
    jobs: JobOperations,
    tasks: T,
    interval: Duration,
    stop_never_started: bool,
}

impl<T: TaskLifecycle> JobTimer<T> {
    pub fn new(jobs: JobOperations, tasks: T, interval: Duration) -> Self {
        Self {
            jobs,
            tasks,
            interval,
            stop_never_started: false,
        }
    }

    pub fn with_never_started_sweep(mut self, enabled: bool) -> Self {
        self.stop_never_started = enabled;
        self
    }

    pub async fn run_once(&self) -> SchedulerResult<SweepReport> {
        let mut report = SweepReport::default();

        let mut visited = HashSet::new();

        let expired: Vec<Job> = self.jobs.search_expired().try_collect().await?;
        for job in expired.iter().filter(|job| !job.state.shutting_down()) {
            info!("作业 {} 已过期", job.job_id);
            visited.insert(job.job_id);
            self.stop_job(job, &mut report).await;
        }

        let stopping: Vec<Job> = self
            .jobs
            .search_state(&[JobState::Stopping])
            .try_collect()
            .await?;
        for job in stopping.iter().filter(|job| !visited.contains(&job.job_id)) {
            self.stop_job(job, &mut report).await;
        }

        if self.stop_never_started {
            match self.jobs.stop_never_started_jobs(&self.tasks).await {
                Ok(count) if count > 0 => info!("停止了 {} 个未启动的作业", count),
                Ok(_) => {}
                Err(e) => Self::log_failure("未启动作业", &e, &mut report),
            }
        }

        Ok(report)
    }

    async fn stop_job(&self, job: &Job, report: &mut SweepReport) {
        match self.jobs.stopping(job, &self.tasks).await {
            Ok(job) if job.state == JobState::Stopped => report.stopped += 1,
            Ok(_) => report.stopping += 1,
            Err(e) => Self::log_failure(&job.job_id.to_string(), &e, report),
        }
    }

    fn log_failure(target: &str, e: &SchedulerError, report: &mut SweepReport) {
        report.failed += 1;
        if e.is_retryable() {
            warn!("处理 {} 时发生可重试错误，下个周期重试: {}", target, e);
        } else {
            error!("处理 {} 失败: {}", target, e);
        }
    }

    /// 按固定间隔扫描，直到收到关闭信号
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!("启动作业定时扫描，间隔 {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) if report != SweepReport::default() => {
                            info!(
                                "扫描完成: 停止 {}，停止中 {}，失败 {}",
                                report.stopped, report.stopping, report.failed
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!("作业扫描失败: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("收到停止信号，退出作业定时扫描");
                    break;
                }
            }
        }
    }
}
