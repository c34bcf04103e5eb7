use fuzz_scheduler_core::{QueryValue, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Os;

/// 资源池状态
///
/// 状态迁移由外部的扩缩容和回收逻辑驱动，调度核心只读取。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Init,
    Running,
    Shutdown,
    Halt,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Init => "init",
            PoolState::Running => "running",
            PoolState::Shutdown => "shutdown",
            PoolState::Halt => "halt",
        }
    }

    /// 是否接收新的工作集
    pub fn accepts_work(&self) -> bool {
        matches!(self, PoolState::Init | PoolState::Running)
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PoolState> for QueryValue {
    fn from(state: PoolState) -> Self {
        QueryValue::Str(state.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[default]
    X86_64,
}

/// 资源池
///
/// 名称按约定唯一，但存储层不做唯一性约束。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pool {
    pub name: String,
    pub pool_id: Uuid,
    pub os: Os,
    pub managed: bool,
    pub arch: Architecture,
    pub state: PoolState,
    pub client_id: Option<Uuid>,
    #[serde(skip)]
    pub etag: Option<u64>,
}

impl Pool {
    pub fn new(name: &str, os: Os, managed: bool) -> Self {
        Self {
            name: name.to_string(),
            pool_id: Uuid::new_v4(),
            os,
            managed,
            arch: Architecture::X86_64,
            state: PoolState::Init,
            client_id: None,
            etag: None,
        }
    }

    /// 资源池专属队列名称：`pool-` 加上 32 位十六进制的池 ID
    pub fn queue_name(&self) -> String {
        format!("pool-{}", self.pool_id.simple())
    }
}

impl Record for Pool {
    const TABLE: &'static str = "pools";

    fn partition_key(&self) -> String {
        self.name.clone()
    }

    fn row_key(&self) -> String {
        self.pool_id.to_string()
    }

    fn etag(&self) -> Option<u64> {
        self.etag
    }

    fn set_etag(&mut self, etag: Option<u64>) {
        self.etag = etag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name_is_hex_pool_id() {
        let mut pool = Pool::new("linux", Os::Linux, true);
        pool.pool_id = Uuid::parse_str("6f1c2b2e-8a3d-4c55-9e1a-0b7d3f9c2a11").unwrap();

        assert_eq!(pool.queue_name(), "pool-6f1c2b2e8a3d4c559e1a0b7d3f9c2a11");
    }

    #[test]
    fn test_admission_states() {
        assert!(PoolState::Init.accepts_work());
        assert!(PoolState::Running.accepts_work());
        assert!(!PoolState::Shutdown.accepts_work());
        assert!(!PoolState::Halt.accepts_work());
    }
}
