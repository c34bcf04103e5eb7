//! 配置管理
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//!
//! 1. 内置默认值（[`AppConfig::default`]）
//! 2. TOML 配置文件（可选）
//! 3. 以 `FUZZ_SCHEDULER` 为前缀、`__` 为层级分隔符的环境变量，
//!    例如 `FUZZ_SCHEDULER__TIMER__INTERVAL_SECONDS=30`
//!
//! ```toml
//! [store]
//! type = "sqlite"
//! sqlite_url = "sqlite://scheduler.db"
//! page_size = 100
//!
//! [queue]
//! type = "redis"
//! redis_url = "redis://127.0.0.1:6379/0"
//!
//! [timer]
//! interval_seconds = 60
//! never_started_timeout_hours = 24
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

pub mod models;

use std::path::Path;

pub use models::*;

use crate::{SchedulerError, SchedulerResult};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "FUZZ_SCHEDULER";

impl AppConfig {
    /// 加载配置：默认值 → 配置文件（如果提供）→ 环境变量
    pub fn load(path: Option<&str>) -> SchedulerResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| SchedulerError::Configuration(format!("构建默认配置失败: {e}")))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !Path::new(path).exists() {
                return Err(SchedulerError::Configuration(format!(
                    "配置文件不存在: {path}"
                )));
            }
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SchedulerError::Configuration(format!("加载配置失败: {e}")))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// 从 TOML 字符串解析配置，缺省字段使用默认值
    pub fn from_toml_str(content: &str) -> SchedulerResult<Self> {
        let app_config: AppConfig = toml::from_str(content)
            .map_err(|e| SchedulerError::Configuration(format!("TOML解析失败: {e}")))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// 验证配置
    pub fn validate(&self) -> SchedulerResult<()> {
        self.store.validate()?;
        self.queue.validate()?;
        self.timer.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
