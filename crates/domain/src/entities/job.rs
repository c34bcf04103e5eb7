use chrono::{DateTime, SubsecRound, Utc};
use fuzz_scheduler_core::{QueryValue, Record, SchedulerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deadline_after, UserInfo};

/// 作业状态
///
/// 状态只能向前推进：
///
/// ```text
/// Init → Enabled → Stopping → Stopped
///   └──────────────↗
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    Enabled,
    Stopping,
    Stopped,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Init => "init",
            JobState::Enabled => "enabled",
            JobState::Stopping => "stopping",
            JobState::Stopped => "stopped",
        }
    }

    pub fn shutting_down(&self) -> bool {
        matches!(self, JobState::Stopping | JobState::Stopped)
    }

    /// 是否允许迁移到目标状态（保持不变也视为允许）
    pub fn can_transition_to(&self, next: JobState) -> bool {
        next >= *self
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<JobState> for QueryValue {
    fn from(state: JobState) -> Self {
        QueryValue::Str(state.as_str().to_string())
    }
}

/// 作业配置，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobConfig {
    pub project: String,
    pub name: String,
    pub build: String,
    /// 运行时长（小时），用于计算截止时间
    pub duration: i64,
    pub logs: Option<String>,
}

impl JobConfig {
    pub fn new(project: &str, name: &str, build: &str, duration: i64) -> Self {
        Self {
            project: project.to_string(),
            name: name.to_string(),
            build: build.to_string(),
            duration,
            logs: None,
        }
    }
}

/// 作业
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub job_id: Uuid,
    pub state: JobState,
    pub config: JobConfig,
    pub error: Option<String>,
    /// 运行截止时间，作业启动时设置且只设置一次
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub user_info: Option<UserInfo>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub etag: Option<u64>,
}

impl Job {
    /// 创建处于 Init 状态的新作业
    pub fn new(config: JobConfig, user_info: Option<UserInfo>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            state: JobState::Init,
            config,
            error: None,
            end_time: None,
            user_info,
            // 存储按毫秒保存时间戳
            created_at: Utc::now().trunc_subsecs(3),
            etag: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.end_time.is_some()
    }

    /// 根据配置时长计算从 `now` 开始的截止时间
    pub fn deadline_from(&self, now: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
        deadline_after(now, self.config.duration)
    }
}

impl Record for Job {
    const TABLE: &'static str = "jobs";

    fn partition_key(&self) -> String {
        self.job_id.to_string()
    }

    fn row_key(&self) -> String {
        self.job_id.to_string()
    }

    fn etag(&self) -> Option<u64> {
        self.etag
    }

    fn set_etag(&mut self, etag: Option<u64>) {
        self.etag = etag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_only_moves_forward() {
        assert!(JobState::Init.can_transition_to(JobState::Enabled));
        assert!(JobState::Init.can_transition_to(JobState::Stopping));
        assert!(JobState::Stopping.can_transition_to(JobState::Stopping));
        assert!(JobState::Stopping.can_transition_to(JobState::Stopped));
        assert!(!JobState::Stopped.can_transition_to(JobState::Stopping));
        assert!(!JobState::Enabled.can_transition_to(JobState::Init));
    }

    #[test]
    fn test_job_serialization_skips_etag_and_uses_millis() {
        let mut job = Job::new(JobConfig::new("proj", "fuzz", "build-1", 2), None);
        job.etag = Some(7);
        job.end_time = Some(job.deadline_from(job.created_at).unwrap());

        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("etag").is_none());
        assert_eq!(value["state"], "init");
        assert_eq!(
            value["end_time"].as_i64().unwrap(),
            job.end_time.unwrap().timestamp_millis()
        );

        let decoded: Job = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.end_time, job.end_time);
        assert_eq!(decoded.created_at, job.created_at);
        assert_eq!(decoded.etag, None);
    }

    #[test]
    fn test_missing_end_time_deserializes_as_none() {
        let job = Job::new(JobConfig::new("proj", "fuzz", "build-1", 1), None);
        let mut value = serde_json::to_value(&job).unwrap();
        value.as_object_mut().unwrap().remove("end_time");

        let decoded: Job = serde_json::from_value(value).unwrap();
        assert!(decoded.end_time.is_none());
        assert!(!decoded.is_started());
    }
}
