mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use fuzz_scheduler_dispatcher::{JobOperations, JobTimer, SweepReport, TaskOperations};
use fuzz_scheduler_domain::{
    ContextSettings, Job, JobConfig, JobState, Os, Task, TaskState, TaskType,
};
use tokio::sync::broadcast;

use common::TestHarness;

fn config() -> JobConfig {
    JobConfig::new("proj", "timer", "b1", 1)
}

#[tokio::test]
async fn test_run_once_stops_expired_jobs() {
    let harness = TestHarness::new();
    let jobs = JobOperations::new(harness.context.clone());
    let tasks = TaskOperations::new(harness.context.clone());
    let orm = harness.context.orm::<Job>();

    let mut expired = jobs.create(config(), None).await.unwrap();
    expired.end_time = Some(Utc::now() - Duration::minutes(5));
    let expired = orm.replace(&expired).await.unwrap();

    let mut with_task = jobs.create(config(), None).await.unwrap();
    with_task.end_time = Some(Utc::now() - Duration::minutes(5));
    let with_task = orm.replace(&with_task).await.unwrap();
    let mut task = Task::new(with_task.job_id, Os::Linux, TaskType::LibfuzzerFuzz, 1);
    task.state = TaskState::Running;
    tasks.create(&task).await.unwrap();

    let active = jobs.on_start(&jobs.create(config(), None).await.unwrap()).await.unwrap();

    let timer = JobTimer::new(jobs.clone(), tasks, StdDuration::from_secs(60));
    let report = timer.run_once().await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            stopped: 1,
            stopping: 1,
            failed: 0
        }
    );
    let state = |job_id| {
        let jobs = jobs.clone();
        async move { jobs.get(job_id).await.unwrap().unwrap().state }
    };
    assert_eq!(state(expired.job_id).await, JobState::Stopped);
    assert_eq!(state(with_task.job_id).await, JobState::Stopping);
    assert_eq!(state(active.job_id).await, JobState::Init);
}

#[tokio::test]
async fn test_run_once_advances_stopping_jobs() {
    let harness = TestHarness::new();
    let jobs = JobOperations::new(harness.context.clone());
    let tasks = TaskOperations::new(harness.context.clone());

    let job = jobs.create(config(), None).await.unwrap();
    let mut task = Task::new(job.job_id, Os::Linux, TaskType::LibfuzzerFuzz, 1);
    task.state = TaskState::Running;
    let task = tasks.create(&task).await.unwrap();
    jobs.stopping(&job, &tasks).await.unwrap();

    let timer = JobTimer::new(jobs.clone(), tasks.clone(), StdDuration::from_secs(60));
    let report = timer.run_once().await.unwrap();
    assert_eq!(report.stopping, 1);

    let stopping = tasks.get_by_task_id(task.task_id).await.unwrap().unwrap();
    tasks.set_state(&stopping, TaskState::Stopped).await.unwrap();

    let report = timer.run_once().await.unwrap();
    assert_eq!(report.stopped, 1);
    assert_eq!(
        jobs.get(job.job_id).await.unwrap().unwrap().state,
        JobState::Stopped
    );
}

#[tokio::test]
async fn test_run_once_with_never_started_sweep() {
    let harness = TestHarness::with_settings(ContextSettings {
        never_started_timeout: Some(Duration::hours(1)),
        ..ContextSettings::default()
    });
    let jobs = JobOperations::new(harness.context.clone());
    let tasks = TaskOperations::new(harness.context.clone());
    let orm = harness.context.orm::<Job>();

    let mut stale = jobs.create(config(), None).await.unwrap();
    stale.created_at = Utc::now() - Duration::hours(3);
    let stale = orm.replace(&stale).await.unwrap();

    let timer = JobTimer::new(jobs.clone(), tasks, StdDuration::from_secs(60))
        .with_never_started_sweep(true);
    let report = timer.run_once().await.unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(
        jobs.get(stale.job_id).await.unwrap().unwrap().state,
        JobState::Stopped
    );
}

#[tokio::test]
async fn test_never_started_sweep_without_threshold_is_reported() {
    let harness = TestHarness::new();
    let jobs = JobOperations::new(harness.context.clone());
    let tasks = TaskOperations::new(harness.context.clone());

    let timer = JobTimer::new(jobs, tasks, StdDuration::from_secs(60)).with_never_started_sweep(true);
    let report = timer.run_once().await.unwrap();
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_run_exits_on_shutdown() {
    let harness = TestHarness::new();
    let jobs = JobOperations::new(harness.context.clone());
    let tasks = TaskOperations::new(harness.context.clone());
    let timer = JobTimer::new(jobs, tasks, StdDuration::from_millis(10));

    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { timer.run(rx).await });

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(StdDuration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
