use serde::{Deserialize, Serialize};

use crate::{SchedulerError, SchedulerResult};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 记录存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Memory,
    Sqlite,
}

/// 记录存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub r#type: StoreType,
    pub sqlite_url: String,
    pub max_connections: u32,
    /// 枚举查询时每页拉取的记录数
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            r#type: StoreType::Memory,
            sqlite_url: "sqlite://fuzz-scheduler.db?mode=rwc".to_string(),
            max_connections: 5,
            page_size: 100,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.page_size == 0 {
            return Err(SchedulerError::Configuration(
                "分页大小必须大于0".to_string(),
            ));
        }
        if self.r#type == StoreType::Sqlite {
            if self.sqlite_url.is_empty() {
                return Err(SchedulerError::Configuration(
                    "SQLite连接地址不能为空".to_string(),
                ));
            }
            if self.max_connections == 0 {
                return Err(SchedulerError::Configuration(
                    "数据库最大连接数必须大于0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// 消息队列类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    #[default]
    Memory,
    Redis,
}

/// 消息队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    #[serde(rename = "type")]
    pub r#type: QueueType,
    pub redis_url: String,
    /// 内存队列单个队列的最大消息数（0表示无限制）
    pub max_queue_size: usize,
    /// 事件通知使用的队列
    pub event_queue: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            r#type: QueueType::Memory,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            max_queue_size: 10000,
            event_queue: "events".to_string(),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.r#type == QueueType::Redis && self.redis_url.is_empty() {
            return Err(SchedulerError::Configuration(
                "Redis连接地址不能为空".to_string(),
            ));
        }
        if self.event_queue.is_empty() {
            return Err(SchedulerError::Configuration(
                "事件队列名称不能为空".to_string(),
            ));
        }
        Ok(())
    }
}

/// 定时扫描配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub interval_seconds: u64,
    /// 处于 Init 状态超过该时长的作业会被停止；不配置则不启用
    pub never_started_timeout_hours: Option<u64>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            never_started_timeout_hours: None,
        }
    }
}

impl TimerConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.interval_seconds == 0 {
            return Err(SchedulerError::Configuration(
                "扫描间隔必须大于0".to_string(),
            ));
        }
        if self.never_started_timeout_hours == Some(0) {
            return Err(SchedulerError::Configuration(
                "未启动作业超时时间必须大于0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "text" => Ok(LogFormat::Text),
            _ => Err(SchedulerError::Configuration(format!(
                "不支持的日志格式: {s}"
            ))),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(SchedulerError::Configuration(format!(
                "无效的日志级别: {other}"
            ))),
        }
    }
}
