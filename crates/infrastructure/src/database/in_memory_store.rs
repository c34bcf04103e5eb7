use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fuzz_scheduler_core::{
    Continuation, Filter, Page, RecordStore, SchedulerError, SchedulerResult, StoredRecord,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

type Key = (String, String);

#[derive(Debug, Clone)]
struct Entry {
    etag: u64,
    body: Value,
}

/// 写操作计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub queries: usize,
    pub inserts: usize,
    pub replaces: usize,
    pub deletes: usize,
}

/// 内存记录存储
///
/// 适用于嵌入式部署和测试。过滤条件直接在 JSON 文档上求值，
/// 结果按 `(partition_key, row_key)` 有序分页，与 SQLite 实现保持一致。
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, BTreeMap<Key, Entry>>>,
    queries: AtomicUsize,
    inserts: AtomicUsize,
    replaces: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            queries: self.queries.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            replaces: self.replaces.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    /// 某张表中的记录数
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn conflict(table: &str, record: &StoredRecord) -> SchedulerError {
        SchedulerError::Conflict {
            table: table.to_string(),
            partition_key: record.partition_key.clone(),
            row_key: record.row_key.clone(),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        continuation: Option<&Continuation>,
        page_size: usize,
    ) -> SchedulerResult<Page> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Page::default());
        };

        let lower = match continuation {
            Some(c) => Bound::Excluded((c.partition_key.clone(), c.row_key.clone())),
            None => Bound::Unbounded,
        };

        let mut matched: Vec<StoredRecord> = rows
            .range((lower, Bound::Unbounded))
            .filter(|(_, entry)| filter.matches(&entry.body))
            .take(page_size + 1)
            .map(|((partition_key, row_key), entry)| StoredRecord {
                partition_key: partition_key.clone(),
                row_key: row_key.clone(),
                etag: Some(entry.etag),
                body: entry.body.clone(),
            })
            .collect();

        let continuation = if matched.len() > page_size {
            matched.truncate(page_size);
            matched.last().map(|last| Continuation {
                partition_key: last.partition_key.clone(),
                row_key: last.row_key.clone(),
            })
        } else {
            None
        };

        debug!(
            "查询 {} [{}]：返回 {} 条记录，续传: {}",
            table,
            filter,
            matched.len(),
            continuation.is_some()
        );

        Ok(Page {
            records: matched,
            continuation,
        })
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> SchedulerResult<Option<StoredRecord>> {
        let tables = self.tables.read().await;
        let key = (partition_key.to_string(), row_key.to_string());
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&key))
            .map(|entry| StoredRecord {
                partition_key: key.0.clone(),
                row_key: key.1.clone(),
                etag: Some(entry.etag),
                body: entry.body.clone(),
            }))
    }

    async fn insert(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let key = (record.partition_key.clone(), record.row_key.clone());
        if rows.contains_key(&key) {
            return Err(Self::conflict(table, record));
        }

        rows.insert(
            key,
            Entry {
                etag: 1,
                body: record.body.clone(),
            },
        );
        self.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(1)
    }

    async fn replace(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let key = (record.partition_key.clone(), record.row_key.clone());

        let etag = match (rows.get_mut(&key), record.etag) {
            (Some(entry), Some(expected)) if entry.etag != expected => {
                return Err(Self::conflict(table, record));
            }
            (Some(entry), _) => {
                entry.etag += 1;
                entry.body = record.body.clone();
                entry.etag
            }
            (None, Some(_)) => {
                return Err(SchedulerError::RecordNotFound {
                    table: table.to_string(),
                    partition_key: record.partition_key.clone(),
                    row_key: record.row_key.clone(),
                });
            }
            (None, None) => {
                rows.insert(
                    key,
                    Entry {
                        etag: 1,
                        body: record.body.clone(),
                    },
                );
                1
            }
        };

        self.replaces.fetch_add(1, Ordering::Relaxed);
        Ok(etag)
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> SchedulerResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            rows.remove(&(partition_key.to_string(), row_key.to_string()));
        }
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
