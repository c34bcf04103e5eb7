pub mod in_memory_store;
pub mod sqlite_record_store;

pub use in_memory_store::{InMemoryRecordStore, StoreStats};
pub use sqlite_record_store::SqliteRecordStore;
