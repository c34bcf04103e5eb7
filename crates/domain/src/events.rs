//! 领域事件
//!
//! 事件是发后即忘的通知，经由 [`EventSender`] 发出。发送失败会向调用方传播，
//! 调度核心本身不重试。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fuzz_scheduler_core::{ApiError, SchedulerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{JobConfig, TaskConfig, TaskState, TaskType, UserInfo};

/// 作业停止时每个任务的摘要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobTaskStopped {
    pub task_id: Uuid,
    pub task_type: TaskType,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventJobStopped {
    pub job_id: Uuid,
    pub config: JobConfig,
    pub user_info: Option<UserInfo>,
    pub task_info: Vec<JobTaskStopped>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventTaskStateUpdated {
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub state: TaskState,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub config: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventTaskFailed {
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub error: ApiError,
    pub user_info: Option<UserInfo>,
    pub config: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum Event {
    JobStopped(EventJobStopped),
    TaskStateUpdated(EventTaskStateUpdated),
    TaskFailed(EventTaskFailed),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::JobStopped(_) => "job_stopped",
            Event::TaskStateUpdated(_) => "task_state_updated",
            Event::TaskFailed(_) => "task_failed",
        }
    }

    /// 事件所属的作业
    pub fn job_id(&self) -> Uuid {
        match self {
            Event::JobStopped(e) => e.job_id,
            Event::TaskStateUpdated(e) => e.job_id,
            Event::TaskFailed(e) => e.job_id,
        }
    }
}

/// 投递到事件队列的信封
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    pub event_id: Uuid,
    pub event: Event,
    pub timestamp: DateTime<Utc>,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event,
            timestamp: Utc::now(),
        }
    }
}

/// 事件发送接口
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send_event(&self, event: Event) -> SchedulerResult<()>;
}
