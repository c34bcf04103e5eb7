use async_trait::async_trait;
use serde::Serialize;

use crate::{SchedulerError, SchedulerResult};

/// 消息队列传输抽象接口
///
/// 只暴露调度核心需要的入队能力。投递语义（至少一次、是否严格 FIFO）由具体实现决定。
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// 将载荷写入指定队列，返回传输层是否接受了该消息
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> SchedulerResult<bool>;

    /// 获取队列中的消息数量
    async fn queue_size(&self, queue: &str) -> SchedulerResult<u64>;
}

/// 以 JSON 序列化对象并入队
pub async fn queue_object<T>(
    transport: &dyn QueueTransport,
    queue: &str,
    object: &T,
) -> SchedulerResult<bool>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(object)
        .map_err(|e| SchedulerError::Serialization(format!("序列化队列消息失败: {e}")))?;
    transport.enqueue(queue, &payload).await
}
