use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _};
use thiserror::Error;
use tracing::debug;

/// One result row keyed by lower-case column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("could not decode row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for WarehouseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                WarehouseError::Connection(err.to_string())
            }
            other => WarehouseError::Query(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::Decode(err.to_string())
    }
}

/// A value bound to a `$n` placeholder. Values never travel inside the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(Option<String>),
    Int(i32),
    Float(Option<f64>),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(Some(value.to_string()))
    }
}

impl From<Option<&str>> for SqlParam {
    fn from(value: Option<&str>) -> Self {
        SqlParam::Text(value.map(str::to_string))
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(Some(value))
    }
}

impl From<Option<f64>> for SqlParam {
    fn from(value: Option<f64>) -> Self {
        // Postgres would store NaN and reject it in the sentiment CHECK; treat it as absent.
        SqlParam::Float(value.filter(|v| v.is_finite()))
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(value: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(value)
    }
}

/// The single data-access capability the rest of the crate depends on.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, WarehouseError>;

    /// Runs a statement and acknowledges with the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, WarehouseError>;
}

pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param.clone() {
            SqlParam::Text(value) => query.bind(value),
            SqlParam::Int(value) => query.bind(value),
            SqlParam::Float(value) => query.bind(value),
            SqlParam::Timestamp(value) => query.bind(value),
        };
    }
    query
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, WarehouseError> {
        // Postgres serializes the whole result set, so rows come back typed
        // without a per-column decode table.
        let wrapped = format!(
            "SELECT COALESCE(json_agg(t), '[]'::json)::text AS rows FROM ({}) t",
            sql.trim().trim_end_matches(';')
        );
        debug!(sql_len = wrapped.len(), params = params.len(), "warehouse query");

        let payload: String = bind_all(sqlx::query(&wrapped), params)
            .fetch_one(&self.pool)
            .await?
            .try_get("rows")?;

        Ok(serde_json::from_str(&payload)?)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, WarehouseError> {
        debug!(sql_len = sql.len(), params = params.len(), "warehouse execute");
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, WarehouseError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(WarehouseError::from))
        .collect()
}
