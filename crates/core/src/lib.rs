//! 调度核心基础设施：错误类型、查询表达式、存储与队列抽象、配置与日志

pub mod config;
pub mod errors;
pub mod logging;
pub mod orm;
pub mod query;
pub mod traits;

pub use config::AppConfig;
pub use errors::*;
pub use orm::{Orm, Record, DEFAULT_PAGE_SIZE};
pub use query::{Filter, Operator, QueryValue};
pub use traits::{queue_object, Continuation, Page, QueueTransport, RecordStore, StoredRecord};
