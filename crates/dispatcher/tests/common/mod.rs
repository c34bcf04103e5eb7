#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fuzz_scheduler_core::{Filter, SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{ContextSettings, OrchestratorContext, Task, TaskLifecycle};
use fuzz_scheduler_infrastructure::{
    InMemoryEventBus, InMemoryQueue, InMemoryQueueConfig, InMemoryRecordStore,
};
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use uuid::Uuid;

pub struct TestHarness {
    pub context: OrchestratorContext,
    pub store: Arc<InMemoryRecordStore>,
    pub queue: InMemoryQueue,
    pub events: InMemoryEventBus,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(ContextSettings::default())
    }

    pub fn with_settings(settings: ContextSettings) -> Self {
        Self::build(settings, InMemoryQueue::new())
    }

    pub fn with_queue_config(config: InMemoryQueueConfig) -> Self {
        Self::build(ContextSettings::default(), InMemoryQueue::with_config(config))
    }

    fn build(settings: ContextSettings, queue: InMemoryQueue) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let events = InMemoryEventBus::new();
        let context = OrchestratorContext::new(
            store.clone(),
            Arc::new(queue.clone()),
            Arc::new(events.clone()),
        )
        .with_settings(settings);

        Self {
            context,
            store,
            queue,
            events,
        }
    }
}

/// 记录 mark_stopping 调用的任务生命周期，任务状态由测试直接设定
#[derive(Default)]
pub struct RecordingTasks {
    tasks: Mutex<Vec<Task>>,
    stop_calls: Mutex<HashMap<Uuid, usize>>,
    failing_jobs: Mutex<HashSet<Uuid>>,
}

impl RecordingTasks {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    /// 该作业下任务的 mark_stopping 调用返回存储错误
    pub fn fail_job(&self, job_id: Uuid) {
        self.failing_jobs.lock().unwrap().insert(job_id);
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap() = tasks;
    }

    pub fn stop_calls(&self, task_id: Uuid) -> usize {
        self.stop_calls
            .lock()
            .unwrap()
            .get(&task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_stop_calls(&self) -> usize {
        self.stop_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl TaskLifecycle for RecordingTasks {
    async fn query(&self, filter: Filter) -> SchedulerResult<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .iter()
            .filter(|task| filter.matches(&serde_json::to_value(task).unwrap()))
            .cloned()
            .collect())
    }

    async fn mark_stopping(&self, task: &Task) -> SchedulerResult<()> {
        if self.failing_jobs.lock().unwrap().contains(&task.job_id) {
            return Err(SchedulerError::Store(format!(
                "任务 {} 写入失败",
                task.task_id
            )));
        }
        *self
            .stop_calls
            .lock()
            .unwrap()
            .entry(task.task_id)
            .or_default() += 1;
        Ok(())
    }
}

/// 按名称累计计数器的本地指标记录器
#[derive(Default)]
pub struct CountingRecorder {
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
}

impl CountingRecorder {
    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .map(|value| value.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let value = self
            .counters
            .lock()
            .unwrap()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Counter::from_arc(value)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// 在当前线程的运行时中执行 `future`，期间的指标写入 `recorder`
pub fn run_with_recorder<F: std::future::Future>(recorder: &CountingRecorder, future: F) -> F::Output {
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    })
}
