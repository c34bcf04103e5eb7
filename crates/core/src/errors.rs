use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对外暴露的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    UnableToFind,
    NotImplemented,
    ConcurrencyConflict,
    TaskFailed,
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::UnableToFind => "UNABLE_TO_FIND",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            ErrorCode::TaskFailed => "TASK_FAILED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可序列化的错误载荷，随任务记录和事件一起传递
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub errors: Vec<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            errors: vec![message.into()],
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.errors.join("; "))
    }
}

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("记录存储错误: {0}")]
    Store(String),

    /// 乐观替换失败：记录自读取后已被其他调用修改
    #[error("并发冲突: {table} [{partition_key}/{row_key}] 已被修改")]
    Conflict {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("记录未找到: {table} [{partition_key}/{row_key}]")]
    RecordNotFound {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("作业不存在: {job_id}")]
    JobNotFound { job_id: String },

    /// 运行时长无法换算成有效的截止时间
    #[error("无效的运行时长: {hours} 小时")]
    InvalidDuration { hours: i64 },

    #[error("unable to find pool: {name} ({source})")]
    PoolLookupFailed {
        name: String,
        #[source]
        source: Box<SchedulerError>,
    },

    #[error("error identifying pool: 未找到名称为 {name} 的资源池")]
    PoolNotFound { name: String },

    #[error("error identifying pool: 名称 {name} 匹配到 {count} 个资源池")]
    PoolAmbiguous { name: String, count: usize },

    #[error("功能未实现: {0}")]
    NotImplemented(String),

    #[error("消息队列错误: {0}")]
    MessageQueue(String),

    #[error("消息队列不可用: {0}")]
    QueueUnavailable(String),

    #[error("事件发送错误: {0}")]
    EventBus(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// 错误对应的对外错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            SchedulerError::PoolLookupFailed { .. }
            | SchedulerError::PoolNotFound { .. }
            | SchedulerError::PoolAmbiguous { .. }
            | SchedulerError::JobNotFound { .. }
            | SchedulerError::InvalidDuration { .. } => ErrorCode::InvalidRequest,
            SchedulerError::RecordNotFound { .. } => ErrorCode::UnableToFind,
            SchedulerError::Conflict { .. } => ErrorCode::ConcurrencyConflict,
            SchedulerError::NotImplemented(_) => ErrorCode::NotImplemented,
            SchedulerError::QueueUnavailable(_) => ErrorCode::ServiceUnavailable,
            SchedulerError::Database(_)
            | SchedulerError::Store(_)
            | SchedulerError::MessageQueue(_)
            | SchedulerError::EventBus(_)
            | SchedulerError::Serialization(_)
            | SchedulerError::Configuration(_)
            | SchedulerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 是否可以由调用方在下一轮重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::Conflict { .. } | SchedulerError::QueueUnavailable(_)
        )
    }

    /// 转换为可序列化的错误载荷
    pub fn to_api_error(&self) -> ApiError {
        let message = match self {
            SchedulerError::PoolLookupFailed { .. } => "unable to find pool".to_string(),
            SchedulerError::PoolNotFound { .. } | SchedulerError::PoolAmbiguous { .. } => {
                "error identifying pool".to_string()
            }
            other => other.to_string(),
        };
        ApiError::new(self.code(), message)
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(e: serde_json::Error) -> Self {
        SchedulerError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_lookup_errors_share_invalid_request_code() {
        let not_found = SchedulerError::PoolNotFound {
            name: "linux".to_string(),
        };
        let ambiguous = SchedulerError::PoolAmbiguous {
            name: "linux".to_string(),
            count: 2,
        };

        assert_eq!(not_found.code(), ErrorCode::InvalidRequest);
        assert_eq!(ambiguous.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            not_found.to_api_error().errors,
            vec!["error identifying pool".to_string()]
        );
        assert_eq!(ambiguous.to_api_error(), not_found.to_api_error());
    }

    #[test]
    fn test_only_conflict_and_unavailable_are_retryable() {
        let conflict = SchedulerError::Conflict {
            table: "jobs".to_string(),
            partition_key: "a".to_string(),
            row_key: "b".to_string(),
        };
        assert!(conflict.is_retryable());
        assert!(SchedulerError::QueueUnavailable("down".to_string()).is_retryable());
        assert!(!SchedulerError::NotImplemented("x".to_string()).is_retryable());
        assert!(!SchedulerError::Store("x".to_string()).is_retryable());
    }

    #[test]
    fn test_request_errors_are_not_retryable() {
        let missing_job = SchedulerError::JobNotFound {
            job_id: "job-1".to_string(),
        };
        let bad_duration = SchedulerError::InvalidDuration { hours: -1 };

        assert_eq!(missing_job.code(), ErrorCode::InvalidRequest);
        assert_eq!(bad_duration.code(), ErrorCode::InvalidRequest);
        assert!(!missing_job.is_retryable());
        assert!(!bad_duration.is_retryable());
        assert_eq!(missing_job.to_api_error().errors, vec!["作业不存在: job-1".to_string()]);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InvalidRequest).unwrap();
        assert_eq!(json, "\"INVALID_REQUEST\"");

        let api_error = ApiError::new(ErrorCode::TaskFailed, "task never started");
        assert_eq!(api_error.to_string(), "TASK_FAILED: task never started");
    }
}
