pub mod message_queue;
pub mod record_store;

pub use message_queue::*;
pub use record_store::*;
