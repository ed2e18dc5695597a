//! PostgreSQL store adapter
//!
//! Every statement returns rows as `jsonb`, so the adapter never needs to know a
//! model's Rust type. Create and update go through `jsonb_populate_record`, which lets
//! Postgres coerce payload values to the column types.

pub mod schema;
pub mod sql_generation;

pub use schema::{PgModel, PgRelation, PgSchema, RelationKind};
pub use sql_generation::{Param, SqlGenerator};

use super::{FindManyArgs, StoreAdapter, StoreResult};
use crate::errors::StoreError;
use crate::id_type::RecordId;
use crate::query_builder::{Filter, GroupBy, GroupRow, Payload, Projection, Window};
use crate::validation::quote_identifier;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

type TxSlot = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: Arc<PgSchema>,
}

/// Handle of an open Postgres transaction
#[derive(Clone)]
pub struct PgTransaction {
    id: Uuid,
    inner: TxSlot,
}

impl PgTransaction {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").field("id", &self.id).finish()
    }
}

/// Where a statement runs
enum Connection<'c> {
    Pool(&'c PgPool),
    Tx(&'c TxSlot),
}

// Shared parameter binding: timestamps and UUIDs travel typed, documents as jsonb
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            Value::String(s) => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                    $query.bind(dt.with_timezone(&chrono::Utc))
                } else if let Ok(uuid) = Uuid::parse_str(&s) {
                    $query.bind(uuid)
                } else {
                    $query.bind(s)
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            Value::Bool(b) => $query.bind(b),
            Value::Null => $query.bind(Option::<String>::None),
            document => $query.bind(sqlx::types::Json(document)),
        }
    };
}

// Run `$body` with `$executor` bound to the pool or the open transaction
macro_rules! on_connection {
    ($connection:expr, |$executor:ident| $body:expr) => {
        match $connection {
            Connection::Pool(pool) => {
                let $executor = pool;
                $body
            }
            Connection::Tx(slot) => {
                let mut guard = slot.lock().await;
                let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
                let $executor = &mut **tx;
                $body
            }
        }
    };
}

fn rows_query(sql: &str, params: Vec<Param>) -> QueryScalar<'_, Postgres, Value, PgArguments> {
    let mut query = sqlx::query_scalar::<_, Value>(sql);
    for param in params {
        query = match param {
            Param::Text(text) => query.bind(text),
            Param::Inferred(value) => bind_json_param!(query, value),
        };
    }
    query
}

fn count_query(sql: &str, params: Vec<Param>) -> QueryScalar<'_, Postgres, i64, PgArguments> {
    let mut query = sqlx::query_scalar::<_, i64>(sql);
    for param in params {
        query = match param {
            Param::Text(text) => query.bind(text),
            Param::Inferred(value) => bind_json_param!(query, value),
        };
    }
    query
}

fn not_found(model: &str, id: &RecordId) -> StoreError {
    StoreError::NotFound(format!("{} with id {}", model, id))
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema: Arc::new(PgSchema::default()),
        }
    }

    /// Register a model; statements for unregistered models fail with `UnknownModel`
    pub fn with_model(mut self, model: PgModel) -> Self {
        Arc::make_mut(&mut self.schema).register(model);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &PgSchema {
        &self.schema
    }

    async fn fetch_all(
        &self,
        connection: Connection<'_>,
        sql: &str,
        params: Vec<Param>,
    ) -> StoreResult<Vec<Value>> {
        debug_log!("[PG] {} ({} params)", sql, params.len());
        let query = rows_query(sql, params);
        let rows = on_connection!(connection, |executor| query.fetch_all(executor).await?);
        Ok(rows)
    }

    async fn fetch_optional(
        &self,
        connection: Connection<'_>,
        sql: &str,
        params: Vec<Param>,
    ) -> StoreResult<Option<Value>> {
        debug_log!("[PG] {} ({} params)", sql, params.len());
        let query = rows_query(sql, params);
        let row = on_connection!(connection, |executor| query.fetch_optional(executor).await?);
        Ok(row)
    }

    async fn fetch_count(
        &self,
        connection: Connection<'_>,
        sql: &str,
        params: Vec<Param>,
    ) -> StoreResult<u64> {
        debug_log!("[PG] {} ({} params)", sql, params.len());
        let query = count_query(sql, params);
        let total = on_connection!(connection, |executor| query.fetch_one(executor).await?);
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn run_create(
        &self,
        connection: Connection<'_>,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        let model = self.schema.model(model)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let table = model.table.quoted();

        let insert = if data.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
        } else {
            let columns = quoted_columns(&data)?;
            let source = generator.param(Value::Object(data.into_map()));
            format!(
                "INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, {source}::jsonb) RETURNING *"
            )
        };
        let sql = format!(
            "WITH t0 AS ({}) SELECT {} FROM t0",
            insert,
            generator.projection(model, projection)?
        );

        self.fetch_optional(connection, &sql, generator.into_params())
            .await?
            .ok_or_else(|| StoreError::Database(format!("insert into {} returned no row", table)))
    }

    async fn run_find_many(
        &self,
        connection: Connection<'_>,
        model: &str,
        args: &FindManyArgs,
    ) -> StoreResult<Vec<Value>> {
        let model = self.schema.model(model)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let sql = generator.select(
            model,
            &args.filter,
            &args.order_by,
            &args.projection,
            args.window,
        )?;
        self.fetch_all(connection, &sql, generator.into_params()).await
    }

    async fn run_find_first(
        &self,
        connection: Connection<'_>,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        let model = self.schema.model(model)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let sql = generator.select(
            model,
            filter,
            &[],
            projection,
            Some(Window { skip: 0, take: 1 }),
        )?;
        self.fetch_optional(connection, &sql, generator.into_params())
            .await
    }

    async fn run_find_unique(
        &self,
        connection: Connection<'_>,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        let primary_key = self.schema.model(model)?.primary_key.as_str().to_string();
        let filter = Filter::new().eq(&primary_key, id.to_value());
        self.run_find_first(connection, model, &filter, projection)
            .await
    }

    async fn run_update(
        &self,
        connection: Connection<'_>,
        model_name: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        let model = self.schema.model(model_name)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let table = model.table.quoted();
        let primary_key = model.primary_key.quoted();

        let assignment = match data.fields().count() {
            0 => format!("{primary_key} = {primary_key}"),
            1 => {
                let columns = quoted_columns(&data)?;
                let source = generator.param(Value::Object(data.into_map()));
                format!(
                    "{columns} = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, {source}::jsonb))"
                )
            }
            _ => {
                let columns = quoted_columns(&data)?;
                let source = generator.param(Value::Object(data.into_map()));
                format!(
                    "({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, {source}::jsonb))"
                )
            }
        };
        let id_param = generator.column_param(model, model.primary_key.as_str(), id.to_value());
        let sql = format!(
            "WITH t0 AS (UPDATE {table} SET {assignment} WHERE {primary_key} = {id_param} RETURNING *) SELECT {} FROM t0",
            generator.projection(model, projection)?
        );

        self.fetch_optional(connection, &sql, generator.into_params())
            .await?
            .ok_or_else(|| not_found(model_name, id))
    }

    async fn run_delete(
        &self,
        connection: Connection<'_>,
        model_name: &str,
        id: &RecordId,
    ) -> StoreResult<Value> {
        let model = self.schema.model(model_name)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let id_param = generator.column_param(model, model.primary_key.as_str(), id.to_value());
        let sql = format!(
            "WITH t0 AS (DELETE FROM {} WHERE {} = {} RETURNING *) SELECT to_jsonb(t0) FROM t0",
            model.table.quoted(),
            model.primary_key.quoted(),
            id_param
        );

        self.fetch_optional(connection, &sql, generator.into_params())
            .await?
            .ok_or_else(|| not_found(model_name, id))
    }

    async fn run_count(
        &self,
        connection: Connection<'_>,
        model: &str,
        filter: &Filter,
    ) -> StoreResult<u64> {
        let model = self.schema.model(model)?;
        let mut generator = SqlGenerator::new(&self.schema);
        let where_clause = generator.where_clause(model, filter)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} t0{}",
            model.table.quoted(),
            where_clause
        );
        self.fetch_count(connection, &sql, generator.into_params())
            .await
    }

    async fn run_group_by(
        &self,
        connection: Connection<'_>,
        model: &str,
        args: &GroupBy,
    ) -> StoreResult<Vec<GroupRow>> {
        let model = self.schema.model(model)?;
        if args.by.is_empty() {
            return Err(StoreError::Validation(
                "group by needs at least one field".to_string(),
            ));
        }
        for directive in &args.order_by {
            let grouped = matches!(directive.path.as_slice(), [field] if args.by.contains(field));
            if !grouped {
                return Err(StoreError::Validation(format!(
                    "cannot order groups by '{}': not a grouped field",
                    directive.path.join(".")
                )));
            }
        }

        let mut generator = SqlGenerator::new(&self.schema);
        let mut columns = Vec::with_capacity(args.by.len());
        let mut pairs = Vec::with_capacity(args.by.len() + 1);
        for field in &args.by {
            let column = format!("t0.{}", quote_identifier(field)?);
            pairs.push(format!("'{}', {}", field, column));
            columns.push(column);
        }
        pairs.push("'_count', jsonb_build_object('_all', COUNT(*))".to_string());

        let where_clause = generator.where_clause(model, &args.filter)?;
        let order_clause = generator.order_clause(model, &args.order_by)?;
        let sql = format!(
            "SELECT jsonb_build_object({}) FROM {} t0{} GROUP BY {}{} LIMIT {} OFFSET {}",
            pairs.join(", "),
            model.table.quoted(),
            where_clause,
            columns.join(", "),
            order_clause,
            args.take,
            args.skip
        );

        let rows = self
            .fetch_all(connection, &sql, generator.into_params())
            .await?;
        rows.into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Serialization(format!(
                    "group row is not an object: {}",
                    other
                ))),
            })
            .collect()
    }
}

fn quoted_columns(data: &Payload) -> StoreResult<String> {
    let columns = data
        .fields()
        .map(|field| quote_identifier(field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns.join(", "))
}

#[async_trait]
impl StoreAdapter for PgStore {
    type Tx = PgTransaction;

    async fn create(
        &self,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        self.run_create(Connection::Pool(&self.pool), model, data, projection)
            .await
    }

    async fn find_many(&self, model: &str, args: &FindManyArgs) -> StoreResult<Vec<Value>> {
        self.run_find_many(Connection::Pool(&self.pool), model, args)
            .await
    }

    async fn find_unique(
        &self,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.run_find_unique(Connection::Pool(&self.pool), model, id, projection)
            .await
    }

    async fn find_first(
        &self,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.run_find_first(Connection::Pool(&self.pool), model, filter, projection)
            .await
    }

    async fn update(
        &self,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        self.run_update(Connection::Pool(&self.pool), model, id, data, projection)
            .await
    }

    async fn delete(&self, model: &str, id: &RecordId) -> StoreResult<Value> {
        self.run_delete(Connection::Pool(&self.pool), model, id)
            .await
    }

    async fn count(&self, model: &str, filter: &Filter) -> StoreResult<u64> {
        self.run_count(Connection::Pool(&self.pool), model, filter)
            .await
    }

    async fn group_by(&self, model: &str, args: &GroupBy) -> StoreResult<Vec<GroupRow>> {
        self.run_group_by(Connection::Pool(&self.pool), model, args)
            .await
    }

    async fn create_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        self.run_create(Connection::Tx(&tx.inner), model, data, projection)
            .await
    }

    async fn find_many_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        args: &FindManyArgs,
    ) -> StoreResult<Vec<Value>> {
        self.run_find_many(Connection::Tx(&tx.inner), model, args)
            .await
    }

    async fn find_unique_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.run_find_unique(Connection::Tx(&tx.inner), model, id, projection)
            .await
    }

    async fn find_first_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.run_find_first(Connection::Tx(&tx.inner), model, filter, projection)
            .await
    }

    async fn update_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        self.run_update(Connection::Tx(&tx.inner), model, id, data, projection)
            .await
    }

    async fn delete_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        id: &RecordId,
    ) -> StoreResult<Value> {
        self.run_delete(Connection::Tx(&tx.inner), model, id)
            .await
    }

    async fn count_in(&self, tx: &PgTransaction, model: &str, filter: &Filter) -> StoreResult<u64> {
        self.run_count(Connection::Tx(&tx.inner), model, filter)
            .await
    }

    async fn group_by_in(
        &self,
        tx: &PgTransaction,
        model: &str,
        args: &GroupBy,
    ) -> StoreResult<Vec<GroupRow>> {
        self.run_group_by(Connection::Tx(&tx.inner), model, args)
            .await
    }

    async fn begin(&self) -> StoreResult<PgTransaction> {
        let tx = self.pool.begin().await?;
        let handle = PgTransaction {
            id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(Some(tx))),
        };
        debug_log!("[PG] BEGIN {}", handle.id);
        Ok(handle)
    }

    async fn commit(&self, tx: PgTransaction) -> StoreResult<()> {
        let open = tx
            .inner
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionClosed)?;
        open.commit().await?;
        debug_log!("[PG] COMMIT {}", tx.id);
        Ok(())
    }

    async fn rollback(&self, tx: PgTransaction) -> StoreResult<()> {
        let open = tx
            .inner
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionClosed)?;
        open.rollback().await?;
        debug_log!("[PG] ROLLBACK {}", tx.id);
        Ok(())
    }
}
