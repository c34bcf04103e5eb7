pub mod database;
pub mod events;
pub mod factory;
pub mod in_memory_queue;
pub mod redis_queue;

pub use database::*;
pub use events::{InMemoryEventBus, QueueEventSender};
pub use factory::ContextFactory;
pub use in_memory_queue::{InMemoryQueue, InMemoryQueueConfig, QueueStats};
pub use redis_queue::RedisQueue;
