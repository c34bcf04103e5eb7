use std::sync::Arc;

use chrono::Duration;
use fuzz_scheduler_core::{Orm, QueueTransport, Record, RecordStore, DEFAULT_PAGE_SIZE};

use crate::events::EventSender;

/// 运行参数
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub page_size: usize,
    /// 未启动作业的超时阈值，`None` 表示不启用
    pub never_started_timeout: Option<Duration>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            never_started_timeout: None,
        }
    }
}

/// 调度核心的依赖集合
///
/// 在构造各组件时显式传入，替代全局环境。克隆只复制引用计数。
#[derive(Clone)]
pub struct OrchestratorContext {
    pub store: Arc<dyn RecordStore>,
    pub queue: Arc<dyn QueueTransport>,
    pub events: Arc<dyn EventSender>,
    pub settings: ContextSettings,
}

impl OrchestratorContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn QueueTransport>,
        events: Arc<dyn EventSender>,
    ) -> Self {
        Self {
            store,
            queue,
            events,
            settings: ContextSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ContextSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 获取某类实体的类型化访问层
    pub fn orm<T: Record>(&self) -> Orm<T> {
        Orm::new(Arc::clone(&self.store), self.settings.page_size)
    }
}
