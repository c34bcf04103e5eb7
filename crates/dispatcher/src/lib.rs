//! 作业生命周期与资源池分发

pub mod job_lifecycle;
pub mod pool_dispatch;
pub mod task_lifecycle;
pub mod timer;

pub use job_lifecycle::JobOperations;
pub use pool_dispatch::PoolOperations;
pub use task_lifecycle::TaskOperations;
pub use timer::{JobTimer, SweepReport};
