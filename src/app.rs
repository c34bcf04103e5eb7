use std::time::Duration;

use anyhow::{Context, Result};
use fuzz_scheduler_core::AppConfig;
use fuzz_scheduler_dispatcher::{JobOperations, JobTimer, SweepReport, TaskOperations};
use fuzz_scheduler_domain::OrchestratorContext;
use fuzz_scheduler_infrastructure::ContextFactory;
use tokio::sync::broadcast;
use tracing::info;

/// 主应用程序
pub struct Application {
    config: AppConfig,
    context: OrchestratorContext,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化应用程序，存储: {:?}，队列: {:?}",
            config.store.r#type, config.queue.r#type
        );

        let context = ContextFactory::create(&config)
            .await
            .context("创建调度上下文失败")?;

        Ok(Self { config, context })
    }

    pub fn context(&self) -> &OrchestratorContext {
        &self.context
    }

    fn timer(&self) -> JobTimer<TaskOperations> {
        JobTimer::new(
            JobOperations::new(self.context.clone()),
            TaskOperations::new(self.context.clone()),
            Duration::from_secs(self.config.timer.interval_seconds),
        )
        .with_never_started_sweep(self.config.timer.never_started_timeout_hours.is_some())
    }

    /// 执行一次扫描
    pub async fn run_once(&self) -> Result<SweepReport> {
        let report = self.timer().run_once().await.context("作业扫描失败")?;
        info!(
            "扫描完成: 停止 {}，停止中 {}，失败 {}",
            report.stopped, report.stopping, report.failed
        );
        Ok(report)
    }

    /// 运行定时扫描直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动作业调度服务");
        self.timer().run(shutdown_rx).await;
        info!("作业调度服务已停止");
        Ok(())
    }
}
