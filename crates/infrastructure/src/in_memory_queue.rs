use async_trait::async_trait;
use fuzz_scheduler_core::{QueueTransport, SchedulerResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// 内存消息队列实现
///
/// 适用于嵌入式部署和测试场景。队列在首次写入时自动创建，
/// 达到容量上限后拒绝新消息（返回 `false`），不阻塞调用方。
#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    /// 队列存储：队列名 -> 消息
    queues: Arc<RwLock<HashMap<String, VecDeque<Vec<u8>>>>>,
    config: InMemoryQueueConfig,
    stats: Arc<QueueCounters>,
}

#[derive(Debug, Clone)]
pub struct InMemoryQueueConfig {
    /// 队列最大容量（0表示无限制）
    pub max_queue_size: usize,
}

impl Default for InMemoryQueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000, // 默认最大10000条消息
        }
    }
}

#[derive(Debug, Default)]
struct QueueCounters {
    enqueue_calls: AtomicUsize,
    accepted: AtomicUsize,
    rejected: AtomicUsize,
}

/// 队列统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueue_calls: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total_queues: usize,
    pub total_messages: usize,
}

impl InMemoryQueue {
    /// 创建新的内存消息队列实例
    pub fn new() -> Self {
        Self::with_config(InMemoryQueueConfig::default())
    }

    /// 使用指定配置创建内存消息队列实例
    pub fn with_config(config: InMemoryQueueConfig) -> Self {
        debug!("Creating in-memory queue with config: {:?}", config);
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            config,
            stats: Arc::new(QueueCounters::default()),
        }
    }

    /// 取出队首消息
    pub async fn dequeue(&self, queue: &str) -> Option<Vec<u8>> {
        self.queues
            .write()
            .await
            .get_mut(queue)
            .and_then(VecDeque::pop_front)
    }

    /// 查看队列中的全部消息（不出队）
    pub async fn peek_all(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues
            .read()
            .await
            .get(queue)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 所有出现过的队列名称
    pub async fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// 获取队列统计信息
    pub async fn get_queue_stats(&self) -> QueueStats {
        let queues = self.queues.read().await;
        QueueStats {
            enqueue_calls: self.stats.enqueue_calls.load(Ordering::Relaxed),
            accepted: self.stats.accepted.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            total_queues: queues.len(),
            total_messages: queues.values().map(VecDeque::len).sum(),
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueue {
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> SchedulerResult<bool> {
        self.stats.enqueue_calls.fetch_add(1, Ordering::Relaxed);

        let mut queues = self.queues.write().await;
        let messages = queues.entry(queue.to_string()).or_default();

        if self.config.max_queue_size > 0 && messages.len() >= self.config.max_queue_size {
            warn!(
                "Queue {} is full ({}/{}), rejecting message",
                queue,
                messages.len(),
                self.config.max_queue_size
            );
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }

        messages.push_back(payload.to_vec());
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        debug!("Enqueued message to {} (size: {})", queue, messages.len());
        Ok(true)
    }

    async fn queue_size(&self, queue: &str) -> SchedulerResult<u64> {
        Ok(self
            .queues
            .read()
            .await
            .get(queue)
            .map(|messages| messages.len() as u64)
            .unwrap_or(0))
    }
}
