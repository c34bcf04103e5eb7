use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TaskType;

/// 分配给资源池节点的一个工作单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkUnit {
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub task_type: TaskType,
    /// 序列化后的任务配置，由节点代理解析
    pub config: String,
}

/// 投递到资源池队列的工作集，调度核心不持久化
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkSet {
    pub reboot: bool,
    pub setup_url: String,
    pub script: bool,
    pub work_units: Vec<WorkUnit>,
}

impl WorkSet {
    pub fn new(setup_url: &str, work_units: Vec<WorkUnit>) -> Self {
        Self {
            reboot: false,
            setup_url: setup_url.to_string(),
            script: false,
            work_units,
        }
    }
}
