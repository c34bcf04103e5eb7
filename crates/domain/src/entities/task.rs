use chrono::{DateTime, Utc};
use fuzz_scheduler_core::{ApiError, QueryValue, Record, SchedulerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deadline_after, Os, UserInfo};

/// 任务状态
///
/// `Stopped` 为终态，进入后不再变化。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Init,
    Waiting,
    Scheduled,
    SettingUp,
    Running,
    Stopping,
    Stopped,
    WaitJob,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Init => "init",
            TaskState::Waiting => "waiting",
            TaskState::Scheduled => "scheduled",
            TaskState::SettingUp => "setting_up",
            TaskState::Running => "running",
            TaskState::Stopping => "stopping",
            TaskState::Stopped => "stopped",
            TaskState::WaitJob => "wait_job",
        }
    }

    /// 任务是否已经在节点上运行过
    pub fn has_started(&self) -> bool {
        matches!(
            self,
            TaskState::Running | TaskState::Stopping | TaskState::Stopped
        )
    }

    pub fn shutting_down(&self) -> bool {
        matches!(self, TaskState::Stopping | TaskState::Stopped)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TaskState> for QueryValue {
    fn from(state: TaskState) -> Self {
        QueryValue::Str(state.as_str().to_string())
    }
}

/// 任务类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Coverage,
    DotnetCoverage,
    DotnetCrashReport,
    LibfuzzerDotnetFuzz,
    LibfuzzerFuzz,
    LibfuzzerCoverage,
    LibfuzzerCrashReport,
    LibfuzzerMerge,
    LibfuzzerRegression,
    GenericAnalysis,
    GenericSupervisor,
    GenericMerge,
    GenericGenerator,
    GenericCrashReport,
    GenericRegression,
}

/// 任务执行细节
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDetails {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// 运行时长（小时）
    pub duration: i64,
    pub target_exe: Option<String>,
    #[serde(default)]
    pub target_options: Vec<String>,
    #[serde(default)]
    pub target_env: std::collections::BTreeMap<String, String>,
}

/// 任务期望运行的资源池
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPool {
    pub count: i64,
    pub pool_name: String,
}

/// 任务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskConfig {
    pub job_id: Uuid,
    #[serde(default)]
    pub prereq_tasks: Vec<Uuid>,
    pub task: TaskDetails,
    pub pool: Option<TaskPool>,
    pub colocate: Option<bool>,
}

/// 任务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub state: TaskState,
    pub os: Os,
    pub config: TaskConfig,
    pub error: Option<ApiError>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub heartbeat: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub user_info: Option<UserInfo>,
    #[serde(skip)]
    pub etag: Option<u64>,
}

impl Task {
    /// 为作业创建处于 Init 状态的任务
    pub fn new(job_id: Uuid, os: Os, task_type: TaskType, duration: i64) -> Self {
        Self {
            job_id,
            task_id: Uuid::new_v4(),
            state: TaskState::Init,
            os,
            config: TaskConfig {
                job_id,
                prereq_tasks: Vec::new(),
                task: TaskDetails {
                    task_type,
                    duration,
                    target_exe: None,
                    target_options: Vec::new(),
                    target_env: Default::default(),
                },
                pool: None,
                colocate: None,
            },
            error: None,
            heartbeat: None,
            end_time: None,
            user_info: None,
            etag: None,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.config.task.task_type
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TaskState::Stopped
    }

    /// 根据任务时长计算从 `now` 开始的截止时间
    pub fn deadline_from(&self, now: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
        deadline_after(now, self.config.task.duration)
    }
}

impl Record for Task {
    const TABLE: &'static str = "tasks";

    fn partition_key(&self) -> String {
        self.job_id.to_string()
    }

    fn row_key(&self) -> String {
        self.task_id.to_string()
    }

    fn etag(&self) -> Option<u64> {
        self.etag
    }

    fn set_etag(&mut self, etag: Option<u64>) {
        self.etag = etag;
    }
}
