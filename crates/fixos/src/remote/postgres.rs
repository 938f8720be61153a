//! PostgreSQL implementation of the remote mirror.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use tracing::{debug, info};

use super::schema::{self, ColumnKind, ColumnSpec};
use super::{document_id, RemoteStore};
use crate::config::CloudConfig;
use crate::error::{Error, Result};
use crate::model::Collection;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Remote mirror backed by a lazily connected PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgRemote {
    pool: PgPool,
}

impl PgRemote {
    /// Build a pool for `database_url` without connecting yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let options =
            PgConnectOptions::from_str(database_url).map_err(|e| Error::ConfigValidation {
                message: format!("invalid cloud database URL: {e}"),
            })?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(15))
            .idle_timeout(Duration::from_secs(120))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    /// The remote configured for cloud mode, if cloud mode is on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteNotConfigured`] when cloud mode is on without
    /// a database URL, or an error if the URL cannot be parsed.
    pub fn from_config(config: &CloudConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let url = config
            .database_url
            .as_deref()
            .ok_or(Error::RemoteNotConfigured)?;
        Self::connect_lazy(url, config.max_connections).map(Some)
    }
}

#[async_trait]
impl RemoteStore for PgRemote {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<()> {
        let statements = schema::initialize_statements();
        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!(statements = statements.len(), "remote schema initialized");
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        let specs = schema::columns(collection);
        let sql = format!(
            "SELECT {} FROM {}{}",
            column_list(specs),
            collection.table(),
            schema::order_clause(collection)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        debug!(collection = collection.table(), rows = rows.len(), "listed remote rows");
        rows.iter()
            .map(|row| row_to_document(collection, row))
            .collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let specs = schema::columns(collection);
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            column_list(specs),
            collection.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row_to_document(collection, &row)).transpose()
    }

    async fn upsert(&self, collection: Collection, document: &Value) -> Result<()> {
        let id = document_id(document)?;
        let sql = schema::upsert_statement(collection);
        let mut query = sqlx::query(&sql);
        for spec in schema::columns(collection) {
            query = bind_column(query, collection, spec, document.get(spec.field))?;
        }
        query.execute(&self.pool).await?;
        debug!(collection = collection.table(), id, "upserted remote row");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        debug!(collection = collection.table(), id, "deleted remote row");
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => decode_json(&row, "value"),
            None => Ok(None),
        }
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value.clone())
        .execute(&self.pool)
        .await?;
        debug!(key, "stored remote setting");
        Ok(())
    }
}

fn column_list(specs: &[ColumnSpec]) -> String {
    specs
        .iter()
        .map(|spec| spec.column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_column<'q>(
    query: PgQuery<'q>,
    collection: Collection,
    spec: &ColumnSpec,
    value: Option<&Value>,
) -> Result<PgQuery<'q>> {
    let value = value.filter(|v| !v.is_null());
    let malformed = |message: String| Error::RemoteRow {
        table: collection.table(),
        message: format!("{}: {message}", spec.field),
    };
    Ok(match spec.kind {
        ColumnKind::Text => query.bind(value.map(text_value)),
        ColumnKind::Integer => query.bind(value.map(integer_value).transpose().map_err(malformed)?),
        ColumnKind::Decimal => query.bind(value.map(decimal_value).transpose().map_err(malformed)?),
        ColumnKind::Json => query.bind(value.cloned()),
    })
}

/// Text column content for a document value.
fn text_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn integer_value(value: &Value) -> std::result::Result<i64, String> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("not an integer: {n}")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("not an integer: {text}")),
        other => Err(format!("not an integer: {other}")),
    }
}

fn decimal_value(value: &Value) -> std::result::Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(text) => text.trim().to_string(),
        other => return Err(format!("not a number: {other}")),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| format!("not a number: {text}"))
}

fn row_to_document(collection: Collection, row: &PgRow) -> Result<Value> {
    let mut document = Map::new();
    for spec in schema::columns(collection) {
        let value = match spec.kind {
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(spec.column)?
                .map(Value::String),
            ColumnKind::Integer => decode_integer(row, spec.column)?.map(Value::from),
            ColumnKind::Decimal => row
                .try_get::<Option<Decimal>, _>(spec.column)?
                .map(serde_json::to_value)
                .transpose()?,
            ColumnKind::Json => decode_json(row, spec.column)?,
        };
        // Absent columns fall back to the document's serde defaults.
        if let Some(value) = value {
            document.insert(spec.field.to_string(), value);
        }
    }
    Ok(Value::Object(document))
}

fn decode_integer(row: &PgRow, column: &str) -> Result<Option<i64>> {
    match row.try_get::<Option<i32>, _>(column) {
        Ok(value) => Ok(value.map(i64::from)),
        Err(_) => Ok(row.try_get::<Option<i64>, _>(column)?),
    }
}

/// Read a JSON column, accepting JSON stored as plain text.
fn decode_json(row: &PgRow, column: &str) -> Result<Option<Value>> {
    let value = match row.try_get::<Option<Value>, _>(column) {
        Ok(value) => value,
        Err(_) => row
            .try_get::<Option<String>, _>(column)?
            .map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text))),
    };
    Ok(value.map(unwrap_encoded_json))
}

/// Undo double encoding: a JSON string whose content is an array or object.
fn unwrap_encoded_json(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed @ (Value::Array(_) | Value::Object(_))) => parsed,
            _ => Value::String(text),
        },
        other => other,
    }
}
