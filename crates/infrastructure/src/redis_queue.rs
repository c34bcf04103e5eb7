use async_trait::async_trait;
use fuzz_scheduler_core::{QueueTransport, SchedulerError, SchedulerResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, info};

/// 基于 Redis 列表的消息队列
///
/// 每个队列对应一个 Redis 列表，`RPUSH` 写入。连接由 `ConnectionManager` 维护并自动重连，
/// 调度核心不做额外重试。
#[derive(Clone)]
pub struct RedisQueue {
    connection: ConnectionManager,
}

impl RedisQueue {
    pub async fn connect(url: &str) -> SchedulerResult<Self> {
        let client = Client::open(url).map_err(|e| {
            SchedulerError::Configuration(format!("Failed to create Redis client: {e}"))
        })?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(Self::map_error)?;
        info!("Connected to Redis queue at {}", url);
        Ok(Self { connection })
    }

    fn map_error(e: RedisError) -> SchedulerError {
        if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            SchedulerError::QueueUnavailable(e.to_string())
        } else {
            SchedulerError::MessageQueue(e.to_string())
        }
    }
}

#[async_trait]
impl QueueTransport for RedisQueue {
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> SchedulerResult<bool> {
        let mut connection = self.connection.clone();
        let length: u64 = connection
            .rpush(queue, payload)
            .await
            .map_err(Self::map_error)?;
        debug!("Pushed message to {} (length: {})", queue, length);
        Ok(length > 0)
    }

    async fn queue_size(&self, queue: &str) -> SchedulerResult<u64> {
        let mut connection = self.connection.clone();
        connection.llen(queue).await.map_err(Self::map_error)
    }
}
