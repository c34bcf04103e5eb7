use std::sync::Arc;

use async_trait::async_trait;
use fuzz_scheduler_core::{queue_object, QueueTransport, SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{Event, EventMessage, EventSender};
use tokio::sync::RwLock;
use tracing::debug;

/// 将事件包装为 [`EventMessage`] 写入事件队列
pub struct QueueEventSender {
    queue: Arc<dyn QueueTransport>,
    queue_name: String,
}

impl QueueEventSender {
    pub fn new(queue: Arc<dyn QueueTransport>, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl EventSender for QueueEventSender {
    async fn send_event(&self, event: Event) -> SchedulerResult<()> {
        let message = EventMessage::new(event);
        let accepted = queue_object(self.queue.as_ref(), &self.queue_name, &message).await?;
        if !accepted {
            return Err(SchedulerError::EventBus(format!(
                "事件队列 {} 拒绝了事件 {}",
                self.queue_name,
                message.event.event_type()
            )));
        }
        debug!(
            "发送事件 {} ({}) 到 {}",
            message.event.event_type(),
            message.event_id,
            self.queue_name
        );
        Ok(())
    }
}

/// 在内存中记录所有事件，用于嵌入式部署的观测和测试
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventBus {
    events: Arc<RwLock<Vec<Event>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventSender for InMemoryEventBus {
    async fn send_event(&self, event: Event) -> SchedulerResult<()> {
        debug!("记录事件 {}", event.event_type());
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_queue::{InMemoryQueue, InMemoryQueueConfig};
    use fuzz_scheduler_domain::{EventJobStopped, JobConfig};
    use uuid::Uuid;

    fn job_stopped() -> Event {
        Event::JobStopped(EventJobStopped {
            job_id: Uuid::new_v4(),
            config: JobConfig::new("proj", "name", "build", 1),
            user_info: None,
            task_info: vec![],
        })
    }

    #[tokio::test]
    async fn test_queue_event_sender_publishes_envelope() {
        let queue = InMemoryQueue::new();
        let sender = QueueEventSender::new(Arc::new(queue.clone()), "events");
        let event = job_stopped();

        sender.send_event(event.clone()).await.unwrap();

        let messages = queue.peek_all("events").await;
        assert_eq!(messages.len(), 1);
        let decoded: EventMessage = serde_json::from_slice(&messages[0]).unwrap();
        assert_eq!(decoded.event, event);
    }

    #[tokio::test]
    async fn test_rejected_event_is_an_error() {
        let queue = InMemoryQueue::with_config(InMemoryQueueConfig { max_queue_size: 1 });
        let sender = QueueEventSender::new(Arc::new(queue), "events");

        sender.send_event(job_stopped()).await.unwrap();
        let err = sender.send_event(job_stopped()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::EventBus(_)));
    }
}
