pub mod context;
pub mod entities;
pub mod events;
pub mod services;

pub use context::*;
pub use entities::*;
pub use events::*;
pub use fuzz_scheduler_core::{SchedulerError, SchedulerResult};
pub use services::*;
