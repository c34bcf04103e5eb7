//! 日志初始化
//!
//! 基于 `tracing-subscriber`：`RUST_LOG` 环境变量优先于配置中的日志级别。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::{SchedulerError, SchedulerResult};

/// 初始化全局日志订阅器
pub fn init_logging(config: &LoggingConfig) -> SchedulerResult<()> {
    config.validate()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };

    result.map_err(|e| SchedulerError::Configuration(format!("初始化日志系统失败: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected_before_init() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            format: LogFormat::Text,
        };
        assert!(matches!(
            init_logging(&config),
            Err(SchedulerError::Configuration(_))
        ));
    }
}
