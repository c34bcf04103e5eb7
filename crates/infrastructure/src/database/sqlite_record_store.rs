use async_trait::async_trait;
use fuzz_scheduler_core::query::json_path;
use fuzz_scheduler_core::{
    Continuation, Filter, Page, QueryValue, RecordStore, SchedulerError, SchedulerResult,
    StoredRecord,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    table_name    TEXT    NOT NULL,
    partition_key TEXT    NOT NULL,
    row_key       TEXT    NOT NULL,
    etag          INTEGER NOT NULL,
    body          TEXT    NOT NULL,
    PRIMARY KEY (table_name, partition_key, row_key)
)
"#;

/// 基于 SQLite 的记录存储
///
/// 所有实体共用一张 `records` 表，文档以 JSON 文本保存。过滤条件翻译为
/// `json_extract` 表达式，字段路径和取值全部通过参数绑定传入。
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 连接数据库；内存数据库只能使用单个连接
    pub async fn connect(url: &str, max_connections: u32) -> SchedulerResult<Self> {
        let options = if url.contains(":memory:") {
            // 连接关闭后内存数据库随之丢失
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };
        let pool = options.connect(url).await?;
        info!("已连接SQLite记录存储: {}", url);
        Ok(Self::new(pool))
    }

    /// 创建记录表
    pub async fn migrate(&self) -> SchedulerResult<()> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        debug!("记录表结构已就绪");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
        match filter {
            Filter::All => {
                builder.push("1 = 1");
            }
            Filter::Compare { field, op, value } => {
                builder.push("json_extract(body, ");
                builder.push_bind(json_path(field));
                builder.push(") ");
                builder.push(op.as_sql());
                builder.push(" ");
                Self::push_value(builder, value);
            }
            Filter::EqualAny { field, values } => {
                if values.is_empty() {
                    builder.push("1 = 0");
                    return;
                }
                builder.push("json_extract(body, ");
                builder.push_bind(json_path(field));
                builder.push(") IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    Self::push_value(builder, value);
                }
                builder.push(")");
            }
            Filter::And(filters) => {
                builder.push("(");
                for (i, inner) in filters.iter().enumerate() {
                    if i > 0 {
                        builder.push(" AND ");
                    }
                    Self::push_filter(builder, inner);
                }
                builder.push(")");
            }
        }
    }

    /// 取值的绑定形式与文档中的 JSON 表示一致
    fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &QueryValue) {
        match value {
            QueryValue::Str(s) => {
                builder.push_bind(s.clone());
            }
            QueryValue::Uuid(id) => {
                builder.push_bind(id.to_string());
            }
            QueryValue::Timestamp(ts) => {
                builder.push_bind(ts.timestamp_millis());
            }
            QueryValue::Int(i) => {
                builder.push_bind(*i);
            }
            QueryValue::Bool(b) => {
                builder.push_bind(*b);
            }
        }
    }

    fn row_to_record(row: &SqliteRow) -> SchedulerResult<StoredRecord> {
        let body: String = row.try_get("body")?;
        let etag: i64 = row.try_get("etag")?;
        Ok(StoredRecord {
            partition_key: row.try_get("partition_key")?,
            row_key: row.try_get("row_key")?,
            etag: Some(etag as u64),
            body: serde_json::from_str(&body)?,
        })
    }

    async fn exists(&self, table: &str, partition_key: &str, row_key: &str) -> SchedulerResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM records WHERE table_name = $1 AND partition_key = $2 AND row_key = $3",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        continuation: Option<&Continuation>,
        page_size: usize,
    ) -> SchedulerResult<Page> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT partition_key, row_key, etag, body FROM records WHERE table_name = ",
        );
        builder.push_bind(table.to_string());

        if let Some(c) = continuation {
            builder.push(" AND (partition_key > ");
            builder.push_bind(c.partition_key.clone());
            builder.push(" OR (partition_key = ");
            builder.push_bind(c.partition_key.clone());
            builder.push(" AND row_key > ");
            builder.push_bind(c.row_key.clone());
            builder.push("))");
        }

        builder.push(" AND ");
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY partition_key, row_key LIMIT ");
        builder.push_bind((page_size + 1) as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<SchedulerResult<Vec<_>>>()?;

        let continuation = if records.len() > page_size {
            records.truncate(page_size);
            records.last().map(|last| Continuation {
                partition_key: last.partition_key.clone(),
                row_key: last.row_key.clone(),
            })
        } else {
            None
        };

        debug!("查询 {} [{}]：返回 {} 条记录", table, filter, records.len());
        Ok(Page {
            records,
            continuation,
        })
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> SchedulerResult<Option<StoredRecord>> {
        let row = sqlx::query(
            "SELECT partition_key, row_key, etag, body FROM records WHERE table_name = $1 AND partition_key = $2 AND row_key = $3",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn insert(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64> {
        let body = serde_json::to_string(&record.body)?;
        let result = sqlx::query(
            r#"
            INSERT INTO records (table_name, partition_key, row_key, etag, body)
            VALUES ($1, $2, $3, 1, $4)
            ON CONFLICT(table_name, partition_key, row_key) DO NOTHING
            "#,
        )
        .bind(table)
        .bind(&record.partition_key)
        .bind(&record.row_key)
        .bind(body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::Conflict {
                table: table.to_string(),
                partition_key: record.partition_key.clone(),
                row_key: record.row_key.clone(),
            });
        }
        Ok(1)
    }

    async fn replace(&self, table: &str, record: &StoredRecord) -> SchedulerResult<u64> {
        let body = serde_json::to_string(&record.body)?;

        let Some(expected) = record.etag else {
            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO records (table_name, partition_key, row_key, etag, body)
                VALUES ($1, $2, $3, 1, $4)
                ON CONFLICT(table_name, partition_key, row_key)
                DO UPDATE SET etag = records.etag + 1, body = excluded.body
                "#,
            )
            .bind(table)
            .bind(&record.partition_key)
            .bind(&record.row_key)
            .bind(body)
            .execute(&mut *tx)
            .await?;

            let etag: i64 = sqlx::query_scalar(
                "SELECT etag FROM records WHERE table_name = $1 AND partition_key = $2 AND row_key = $3",
            )
            .bind(table)
            .bind(&record.partition_key)
            .bind(&record.row_key)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(etag as u64);
        };

        let result = sqlx::query(
            r#"
            UPDATE records SET etag = etag + 1, body = $1
            WHERE table_name = $2 AND partition_key = $3 AND row_key = $4 AND etag = $5
            "#,
        )
        .bind(body)
        .bind(table)
        .bind(&record.partition_key)
        .bind(&record.row_key)
        .bind(expected as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(expected + 1);
        }

        if self
            .exists(table, &record.partition_key, &record.row_key)
            .await?
        {
            Err(SchedulerError::Conflict {
                table: table.to_string(),
                partition_key: record.partition_key.clone(),
                row_key: record.row_key.clone(),
            })
        } else {
            Err(SchedulerError::RecordNotFound {
                table: table.to_string(),
                partition_key: record.partition_key.clone(),
                row_key: record.row_key.clone(),
            })
        }
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> SchedulerResult<()> {
        sqlx::query(
            "DELETE FROM records WHERE table_name = $1 AND partition_key = $2 AND row_key = $3",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
