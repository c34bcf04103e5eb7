//! 记录存储接口定义
//!
//! 记录以 JSON 文档形式保存，通过 `(table, partition_key, row_key)` 定位，
//! 每条记录携带单调递增的版本号（etag）用于乐观并发控制。
//!
//! ## 替换语义
//!
//! - `replace` 携带 `Some(etag)` 时为比较并交换：版本号不一致返回
//!   [`SchedulerError::Conflict`](crate::SchedulerError::Conflict)，记录不存在返回
//!   [`SchedulerError::RecordNotFound`](crate::SchedulerError::RecordNotFound)。
//! - `replace` 携带 `None` 时为无条件写入（不存在则插入）。
//!
//! ## 分页
//!
//! `query_page` 按 `(partition_key, row_key)` 升序返回一页结果和续传标记，
//! 调用方据此驱动惰性枚举，见 [`crate::orm::Orm::query`]。

use async_trait::async_trait;
use serde_json::Value;

use crate::query::Filter;
use crate::SchedulerResult;

/// 存储中的一条原始记录
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub partition_key: String,
    pub row_key: String,
    pub etag: Option<u64>,
    pub body: Value,
}

/// 分页续传标记：上一页最后一条记录的键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Continuation {
    pub partition_key: String,
    pub row_key: String,
}

/// 查询结果页
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<StoredRecord>,
    pub continuation: Option<Continuation>,
}

/// 记录存储抽象接口
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 在服务端按过滤条件查询一页记录
    async fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        continuation: Option<&Continuation>,
        page_size: usize,
    ) -> SchedulerResult<Page>;

    /// 按键读取单条记录
    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> SchedulerResult<Option<StoredRecord>>;

    /// 插入新记录，键已存在时返回冲突；返回新版本号
    async fn insert(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64>;

    /// 替换记录；返回新版本号
    async fn replace(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64>;

    /// 删除记录，不存在时不报错
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> SchedulerResult<()>;
}
