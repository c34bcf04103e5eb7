use fuzz_scheduler_core::{queue_object, Filter, Orm, SchedulerError, SchedulerResult};
use fuzz_scheduler_domain::{OrchestratorContext, Pool, WorkSet};
use metrics::counter;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 资源池查找与准入控制下的工作分发
#[derive(Clone)]
pub struct PoolOperations {
    context: OrchestratorContext,
    pools: Orm<Pool>,
}

impl PoolOperations {
    pub fn new(context: OrchestratorContext) -> Self {
        let pools = context.orm::<Pool>();
        Self { context, pools }
    }

    pub async fn create(&self, pool: &Pool) -> SchedulerResult<Pool> {
        self.pools.insert(pool).await
    }

    /// 按名称查找资源池，必须恰好匹配一个
    pub async fn get_by_name(&self, name: &str) -> SchedulerResult<Pool> {
        let mut pools = self
            .pools
            .query_all(Filter::eq("name", name))
            .await
            .map_err(|e| SchedulerError::PoolLookupFailed {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        match pools.len() {
            1 => Ok(pools.remove(0)),
            0 => Err(SchedulerError::PoolNotFound {
                name: name.to_string(),
            }),
            count => Err(SchedulerError::PoolAmbiguous {
                name: name.to_string(),
                count,
            }),
        }
    }

    pub async fn get_by_id(&self, pool_id: Uuid) -> SchedulerResult<Option<Pool>> {
        let mut pools = self.pools.query_all(Filter::eq("pool_id", pool_id)).await?;
        Ok(pools.pop())
    }

    pub fn queue_name(pool: &Pool) -> String {
        pool.queue_name()
    }

    /// 向资源池专属队列投递工作集
    ///
    /// 资源池处于 Shutdown 或 Halt 时直接返回 `false`，不入队也不报错；
    /// 否则返回传输层是否接受了该消息。
    #[instrument(skip(self, pool, work_set), fields(pool = %pool.name, state = %pool.state))]
    pub async fn schedule_workset(&self, pool: &Pool, work_set: &WorkSet) -> SchedulerResult<bool> {
        if !pool.state.accepts_work() {
            debug!("资源池 {} 处于 {} 状态，拒绝工作集", pool.name, pool.state);
            counter!("pool_workset_rejected_total").increment(1);
            return Ok(false);
        }

        let queue = Self::queue_name(pool);
        let accepted = queue_object(self.context.queue.as_ref(), &queue, work_set).await?;
        if accepted {
            counter!("pool_workset_scheduled_total").increment(1);
            info!(
                "投递 {} 个工作单元到 {}",
                work_set.work_units.len(),
                queue
            );
        }
        Ok(accepted)
    }
}
