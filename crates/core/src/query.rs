//! 类型化的查询表达式
//!
//! 记录存储只支持简单的字段比较（`eq`、`lt`、`gt`）以及基于枚举字段的
//! "等于任意一个" 条件。这里用类型化的表达式树代替字符串拼接，由各存储适配器
//! 自行翻译（内存实现直接在 JSON 文档上求值，SQLite 实现翻译为带绑定参数的 SQL）。
//!
//! 字段名使用点号分隔的路径，例如 `config.name` 对应文档中的 `{"config": {"name": ..}}`。
//! 时间戳统一按 epoch 毫秒比较。

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// 查询参数值
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Int(i64),
    Bool(bool),
}

impl QueryValue {
    /// 转换为文档中对应的 JSON 表示
    pub fn to_json(&self) -> Value {
        match self {
            QueryValue::Str(s) => Value::String(s.clone()),
            QueryValue::Uuid(id) => Value::String(id.to_string()),
            QueryValue::Timestamp(ts) => Value::from(ts.timestamp_millis()),
            QueryValue::Int(i) => Value::from(*i),
            QueryValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<Uuid> for QueryValue {
    fn from(value: Uuid) -> Self {
        QueryValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(value: DateTime<Utc>) -> Self {
        QueryValue::Timestamp(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => write!(f, "'{s}'"),
            QueryValue::Uuid(id) => write!(f, "'{id}'"),
            QueryValue::Timestamp(ts) => write!(f, "datetime'{}'", ts.to_rfc3339()),
            QueryValue::Int(i) => write!(f, "{i}"),
            QueryValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
        }
    }

    /// SQL 中的运算符
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Gt => ordering == Ordering::Greater,
        }
    }
}

/// 过滤表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// 匹配全部记录
    All,
    Compare {
        field: String,
        op: Operator,
        value: QueryValue,
    },
    /// 字段等于集合中任意一个值；空集合不匹配任何记录
    EqualAny {
        field: String,
        values: Vec<QueryValue>,
    },
    And(Vec<Filter>),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn eq(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::compare(field, Operator::Eq, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::compare(field, Operator::Lt, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::compare(field, Operator::Gt, value)
    }

    pub fn compare(field: impl Into<String>, op: Operator, value: impl Into<QueryValue>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equal_any<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        Filter::EqualAny {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// 与另一个条件组合
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// 在 JSON 文档上求值；缺失或为 null 的字段不满足任何比较
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Compare { field, op, value } => match lookup(document, field) {
                Some(actual) => compare_json(actual, &value.to_json())
                    .map(|ordering| op.accepts(ordering))
                    .unwrap_or(false),
                None => false,
            },
            Filter::EqualAny { field, values } => match lookup(document, field) {
                Some(actual) => values.iter().any(|value| {
                    compare_json(actual, &value.to_json()) == Some(Ordering::Equal)
                }),
                None => false,
            },
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(document)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("*"),
            Filter::Compare { field, op, value } => {
                write!(f, "{field} {} {value}", op.as_str())
            }
            Filter::EqualAny { field, values } => {
                if values.is_empty() {
                    return f.write_str("false");
                }
                let parts: Vec<String> = values
                    .iter()
                    .map(|value| format!("{field} eq {value}"))
                    .collect();
                write!(f, "({})", parts.join(" or "))
            }
            Filter::And(filters) => {
                let parts: Vec<String> = filters.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

/// 将点号路径转换为 SQLite json_extract 使用的路径
pub fn json_path(field: &str) -> String {
    format!("$.{field}")
}

fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in field.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn compare_json(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
