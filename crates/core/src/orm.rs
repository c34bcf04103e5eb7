//! 类型化记录访问层
//!
//! [`Orm`] 把实现了 [`Record`] 的实体与底层 [`RecordStore`] 连接起来：
//! 负责 JSON 编解码、版本号回填以及分页枚举。它本身不持有任何状态副本，
//! 每次调用都直接读写存储。

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::query::Filter;
use crate::traits::{Continuation, RecordStore, StoredRecord};
use crate::{SchedulerError, SchedulerResult};

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// 可持久化的实体
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 所在表名
    const TABLE: &'static str;

    fn partition_key(&self) -> String;

    fn row_key(&self) -> String;

    /// 读取时回填的版本号；新建对象为 `None`
    fn etag(&self) -> Option<u64>;

    fn set_etag(&mut self, etag: Option<u64>);
}

pub struct Orm<T> {
    store: Arc<dyn RecordStore>,
    page_size: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Orm<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            page_size: self.page_size,
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Orm<T> {
    pub fn new(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// 惰性枚举满足条件的记录
    ///
    /// 过滤在存储端执行，结果按页拉取；流可以随时丢弃，再次调用即重新开始枚举。
    pub fn query(&self, filter: Filter) -> BoxStream<'static, SchedulerResult<T>> {
        let store = Arc::clone(&self.store);
        let page_size = self.page_size;

        // 外层 None 表示已经没有下一页
        let pages = stream::try_unfold(
            Some(None::<Continuation>),
            move |state: Option<Option<Continuation>>| {
                let store = Arc::clone(&store);
                let filter = filter.clone();
                async move {
                    let continuation = match state {
                        Some(continuation) => continuation,
                        None => return Ok(None),
                    };
                    let page = store
                        .query_page(T::TABLE, &filter, continuation.as_ref(), page_size)
                        .await?;
                    let records = page
                        .records
                        .into_iter()
                        .map(Self::from_stored)
                        .collect::<SchedulerResult<Vec<T>>>()?;
                    Ok::<_, SchedulerError>(Some((records, page.continuation.map(Some))))
                }
            },
        );

        pages
            .map_ok(|records| stream::iter(records.into_iter().map(Ok::<T, SchedulerError>)))
            .try_flatten()
            .boxed()
    }

    /// 完整读取满足条件的所有记录
    pub async fn query_all(&self, filter: Filter) -> SchedulerResult<Vec<T>> {
        self.query(filter).try_collect().await
    }

    pub async fn get(&self, partition_key: &str, row_key: &str) -> SchedulerResult<Option<T>> {
        self.store
            .get(T::TABLE, partition_key, row_key)
            .await?
            .map(Self::from_stored)
            .transpose()
    }

    /// 插入新记录，返回带版本号的记录
    pub async fn insert(&self, record: &T) -> SchedulerResult<T> {
        let stored = Self::to_stored(record)?;
        let etag = self.store.insert(T::TABLE, &stored).await?;
        let mut inserted = record.clone();
        inserted.set_etag(Some(etag));
        Ok(inserted)
    }

    /// 乐观替换记录，返回带新版本号的记录
    pub async fn replace(&self, record: &T) -> SchedulerResult<T> {
        let stored = Self::to_stored(record)?;
        let etag = self.store.replace(T::TABLE, &stored).await?;
        let mut replaced = record.clone();
        replaced.set_etag(Some(etag));
        Ok(replaced)
    }

    pub async fn delete(&self, record: &T) -> SchedulerResult<()> {
        self.store
            .delete(T::TABLE, &record.partition_key(), &record.row_key())
            .await
    }

    fn to_stored(record: &T) -> SchedulerResult<StoredRecord> {
        let body = serde_json::to_value(record).map_err(|e| {
            SchedulerError::Serialization(format!("序列化 {} 记录失败: {e}", T::TABLE))
        })?;
        Ok(StoredRecord {
            partition_key: record.partition_key(),
            row_key: record.row_key(),
            etag: record.etag(),
            body,
        })
    }

    fn from_stored(stored: StoredRecord) -> SchedulerResult<T> {
        let mut record: T = serde_json::from_value(stored.body).map_err(|e| {
            SchedulerError::Serialization(format!("反序列化 {} 记录失败: {e}", T::TABLE))
        })?;
        record.set_etag(stored.etag);
        Ok(record)
    }
}
