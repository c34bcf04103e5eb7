use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use fuzz_scheduler::app::Application;
use fuzz_scheduler::shutdown::ShutdownManager;
use fuzz_scheduler_core::config::{QueueType, StoreType};
use fuzz_scheduler_core::{AppConfig, QueueTransport};
use fuzz_scheduler_dispatcher::{JobOperations, PoolOperations, TaskOperations};
use fuzz_scheduler_domain::{
    Job, JobConfig, JobState, Os, Pool, PoolState, Task, TaskState, TaskType,
    WorkSet,
};

fn sqlite_config(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.r#type = StoreType::Sqlite;
    config.store.sqlite_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("scheduler.db").display()
    );
    config.store.page_size = 2;
    config.queue.r#type = QueueType::Memory;
    config.timer.interval_seconds = 1;
    config
}

#[tokio::test]
async fn test_expired_job_is_stopped_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(sqlite_config(&dir)).await.unwrap();
    let context = app.context().clone();

    let jobs = JobOperations::new(context.clone());
    let tasks = TaskOperations::new(context.clone());

    let job = jobs
        .create(JobConfig::new("zlib", "inflate", "b7", 1), None)
        .await
        .unwrap();
    let job = jobs.on_start(&jobs.init(&job).await.unwrap()).await.unwrap();
    let mut task = Task::new(job.job_id, Os::Linux, TaskType::LibfuzzerFuzz, 1);
    task.state = TaskState::Running;
    let task = tasks.create(&task).await.unwrap();

    // 截止时间提前到过去
    let mut expired = job.clone();
    expired.end_time = Some(Utc::now() - Duration::seconds(1));
    context.orm::<Job>().replace(&expired).await.unwrap();

    let report = app.run_once().await.unwrap();
    assert_eq!(report.stopping, 1);
    assert_eq!(
        jobs.get(job.job_id).await.unwrap().unwrap().state,
        JobState::Stopping
    );

    let stopping = tasks.get_by_task_id(task.task_id).await.unwrap().unwrap();
    assert_eq!(stopping.state, TaskState::Stopping);
    tasks.set_state(&stopping, TaskState::Stopped).await.unwrap();

    let report = app.run_once().await.unwrap();
    assert_eq!(report.stopped, 1);
    assert_eq!(
        jobs.get(job.job_id).await.unwrap().unwrap().state,
        JobState::Stopped
    );

    // 任务状态变更和作业停止事件都写入事件队列
    let pending = context.queue.queue_size("events").await.unwrap();
    assert_eq!(pending, 3);
}

#[tokio::test]
async fn test_pool_dispatch_with_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(sqlite_config(&dir)).await.unwrap();
    let context = app.context().clone();
    let pools = PoolOperations::new(context.clone());

    let mut pool = Pool::new("linux-pool", Os::Linux, true);
    pool.state = PoolState::Running;
    pools.create(&pool).await.unwrap();

    let found = pools.get_by_name("linux-pool").await.unwrap();
    assert!(pools
        .schedule_workset(&found, &WorkSet::new("https://setup", vec![]))
        .await
        .unwrap());
    assert_eq!(
        context.queue.queue_size(&found.queue_name()).await.unwrap(),
        1
    );

    let mut halted = found.clone();
    halted.state = PoolState::Halt;
    let halted = context.orm::<Pool>().replace(&halted).await.unwrap();
    let reloaded = pools.get_by_name("linux-pool").await.unwrap();
    assert_eq!(reloaded.state, halted.state);
    assert!(!pools
        .schedule_workset(&reloaded, &WorkSet::new("https://setup", vec![]))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_application_stops_on_shutdown_signal() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(sqlite_config(&dir)).await.unwrap();
    let shutdown = ShutdownManager::new();
    let rx = shutdown.subscribe().await;

    let handle = tokio::spawn(async move { app.run(rx).await });
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    shutdown.shutdown().await;

    let result = tokio::time::timeout(StdDuration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
