use std::sync::Arc;

use chrono::Duration;
use fuzz_scheduler_core::config::{QueueConfig, QueueType, StoreConfig, StoreType};
use fuzz_scheduler_core::{AppConfig, QueueTransport, RecordStore, SchedulerResult};
use fuzz_scheduler_domain::{ContextSettings, OrchestratorContext};
use tracing::{debug, info};

use crate::database::{InMemoryRecordStore, SqliteRecordStore};
use crate::events::QueueEventSender;
use crate::in_memory_queue::{InMemoryQueue, InMemoryQueueConfig};
use crate::redis_queue::RedisQueue;

/// 根据配置装配 [`OrchestratorContext`]
pub struct ContextFactory;

impl ContextFactory {
    pub async fn create(config: &AppConfig) -> SchedulerResult<OrchestratorContext> {
        let store = Self::create_store(&config.store).await?;
        let queue = Self::create_queue(&config.queue).await?;
        let events = Arc::new(QueueEventSender::new(
            Arc::clone(&queue),
            config.queue.event_queue.clone(),
        ));

        let settings = ContextSettings {
            page_size: config.store.page_size,
            never_started_timeout: config
                .timer
                .never_started_timeout_hours
                .map(|hours| Duration::hours(hours as i64)),
        };

        Ok(OrchestratorContext::new(store, queue, events).with_settings(settings))
    }

    pub async fn create_store(config: &StoreConfig) -> SchedulerResult<Arc<dyn RecordStore>> {
        debug!("Creating record store with type: {:?}", config.r#type);

        match config.r#type {
            StoreType::Memory => {
                info!("使用内存记录存储");
                Ok(Arc::new(InMemoryRecordStore::new()))
            }
            StoreType::Sqlite => {
                info!("连接SQLite记录存储: {}", config.sqlite_url);
                let store =
                    SqliteRecordStore::connect(&config.sqlite_url, config.max_connections).await?;
                store.migrate().await?;
                Ok(Arc::new(store))
            }
        }
    }

    pub async fn create_queue(config: &QueueConfig) -> SchedulerResult<Arc<dyn QueueTransport>> {
        debug!("Creating message queue with type: {:?}", config.r#type);

        match config.r#type {
            QueueType::Memory => {
                info!("Initializing in-memory message queue");
                Ok(Arc::new(InMemoryQueue::with_config(InMemoryQueueConfig {
                    max_queue_size: config.max_queue_size,
                })))
            }
            QueueType::Redis => {
                info!("Initializing Redis message queue");
                Ok(Arc::new(RedisQueue::connect(&config.redis_url).await?))
            }
        }
    }
}
