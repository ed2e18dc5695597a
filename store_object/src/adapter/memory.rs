//! In-memory store adapter
//!
//! Document-shaped backend: every model is a list of JSON objects, relations are
//! embedded sub-documents (an embedded array matches a relation filter when any element
//! does). `include` is accepted but changes nothing since related documents are always
//! present; `select` keeps the listed top-level keys.
//!
//! A transaction reads and writes a private copy of all models taken at `begin` and
//! records each write. `commit` replays those writes onto the live state, so writes
//! committed by others in the meantime survive; a replay that no longer applies (the
//! row is gone, the id is taken) fails the commit and leaves the live state untouched.
//! `rollback` drops the copy. Integer ids come from a per-model sequence shared by all
//! transactions. Null ordering follows Postgres: nulls sort last ascending and first
//! descending.

use super::{FindManyArgs, StoreAdapter, StoreResult};
use crate::errors::StoreError;
use crate::id_type::RecordId;
use crate::query_builder::{
    Condition, FieldFilter, Filter, GroupBy, GroupRow, OrderBy, Payload, Projection, QueryMode,
    QueryOperator, SortOrder, Window,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Default)]
struct Tables {
    models: HashMap<String, Vec<Value>>,
}

/// Last integer id handed out per model
#[derive(Debug, Clone, Default)]
struct Sequences(Arc<std::sync::Mutex<HashMap<String, i64>>>);

impl Sequences {
    fn next(&self, model: &str, rows: &[Value]) -> StoreResult<i64> {
        let mut last_ids = self
            .0
            .lock()
            .map_err(|_| StoreError::Database("id sequence lock poisoned".to_string()))?;
        let highest = rows
            .iter()
            .filter_map(|row| row.get(ID_FIELD).and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        let last = last_ids.entry(model.to_string()).or_insert(0);
        *last = (*last).max(highest) + 1;
        Ok(*last)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<Tables>>,
    sequences: Sequences,
}

/// Write recorded inside a transaction, replayed on commit
#[derive(Debug, Clone)]
enum Change {
    Insert { model: String, record: Value },
    Update { model: String, id: RecordId, data: Payload },
    Delete { model: String, id: RecordId },
}

#[derive(Debug)]
struct Working {
    tables: Tables,
    changes: Vec<Change>,
}

/// Handle of an open in-memory transaction
#[derive(Debug, Clone)]
pub struct MemoryTransaction {
    id: Uuid,
    working: Arc<Mutex<Option<Working>>>,
}

impl MemoryTransaction {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty model
    pub fn with_model(self, model: &str) -> Self {
        self.with_records(model, Vec::new())
    }

    /// Declare a model with initial documents
    pub fn with_records(self, model: &str, records: Vec<Value>) -> Self {
        // Not shared yet, so the lock is uncontended
        if let Ok(mut state) = self.state.try_write() {
            state.models.insert(model.to_string(), records);
        }
        self
    }

    /// Snapshot of a model's documents in insertion order
    pub async fn records(&self, model: &str) -> StoreResult<Vec<Value>> {
        let state = self.state.read().await;
        rows(&state, model).map(|rows| rows.to_vec())
    }

    async fn working_copy<'a>(
        &self,
        tx: &'a MemoryTransaction,
    ) -> StoreResult<tokio::sync::MutexGuard<'a, Option<Working>>> {
        let guard = tx.working.lock().await;
        if guard.is_none() {
            return Err(StoreError::TransactionClosed);
        }
        Ok(guard)
    }
}

/// Run `$body` against the transaction's working copy
macro_rules! in_transaction {
    ($self:ident, $tx:ident, |$working:ident| $body:expr) => {{
        let mut guard = $self.working_copy($tx).await?;
        let $working = guard.as_mut().ok_or(StoreError::TransactionClosed)?;
        $body
    }};
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    type Tx = MemoryTransaction;

    async fn create(
        &self,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        let mut state = self.state.write().await;
        create_record(&mut state, &self.sequences, model, data)
            .map(|record| project(&record, projection))
    }

    async fn find_many(&self, model: &str, args: &FindManyArgs) -> StoreResult<Vec<Value>> {
        let state = self.state.read().await;
        find_records(&state, model, args)
    }

    async fn find_unique(
        &self,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        let state = self.state.read().await;
        find_by_id(&state, model, id, projection)
    }

    async fn find_first(
        &self,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        let state = self.state.read().await;
        find_first_record(&state, model, filter, projection)
    }

    async fn update(
        &self,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        let mut state = self.state.write().await;
        update_record(&mut state, model, id, data, projection)
    }

    async fn delete(&self, model: &str, id: &RecordId) -> StoreResult<Value> {
        let mut state = self.state.write().await;
        delete_record(&mut state, model, id)
    }

    async fn count(&self, model: &str, filter: &Filter) -> StoreResult<u64> {
        let state = self.state.read().await;
        count_records(&state, model, filter)
    }

    async fn group_by(&self, model: &str, args: &GroupBy) -> StoreResult<Vec<GroupRow>> {
        let state = self.state.read().await;
        group_records(&state, model, args)
    }

    async fn create_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        in_transaction!(self, tx, |working| {
            let record = create_record(&mut working.tables, &self.sequences, model, data)?;
            let projected = project(&record, projection);
            working.changes.push(Change::Insert {
                model: model.to_string(),
                record,
            });
            Ok(projected)
        })
    }

    async fn find_many_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        args: &FindManyArgs,
    ) -> StoreResult<Vec<Value>> {
        in_transaction!(self, tx, |working| find_records(&working.tables, model, args))
    }

    async fn find_unique_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        in_transaction!(self, tx, |working| find_by_id(&working.tables, model, id, projection))
    }

    async fn find_first_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        in_transaction!(self, tx, |working| find_first_record(
            &working.tables,
            model,
            filter,
            projection
        ))
    }

    async fn update_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        in_transaction!(self, tx, |working| {
            let updated = update_record(&mut working.tables, model, id, data.clone(), projection)?;
            working.changes.push(Change::Update {
                model: model.to_string(),
                id: *id,
                data,
            });
            Ok(updated)
        })
    }

    async fn delete_in(&self, tx: &Self::Tx, model: &str, id: &RecordId) -> StoreResult<Value> {
        in_transaction!(self, tx, |working| {
            let deleted = delete_record(&mut working.tables, model, id)?;
            working.changes.push(Change::Delete {
                model: model.to_string(),
                id: *id,
            });
            Ok(deleted)
        })
    }

    async fn count_in(&self, tx: &Self::Tx, model: &str, filter: &Filter) -> StoreResult<u64> {
        in_transaction!(self, tx, |working| count_records(&working.tables, model, filter))
    }

    async fn group_by_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        args: &GroupBy,
    ) -> StoreResult<Vec<GroupRow>> {
        in_transaction!(self, tx, |working| group_records(&working.tables, model, args))
    }

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let snapshot = self.state.read().await.clone();
        Ok(MemoryTransaction {
            id: Uuid::new_v4(),
            working: Arc::new(Mutex::new(Some(Working {
                tables: snapshot,
                changes: Vec::new(),
            }))),
        })
    }

    async fn commit(&self, tx: Self::Tx) -> StoreResult<()> {
        let working = tx
            .working
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionClosed)?;
        let mut state = self.state.write().await;
        let mut replayed = state.clone();
        for change in working.changes {
            replay(&mut replayed, change)?;
        }
        *state = replayed;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> StoreResult<()> {
        tx.working
            .lock()
            .await
            .take()
            .map(|_| ())
            .ok_or(StoreError::TransactionClosed)
    }
}

// ========================================
// Operations on a set of tables
// ========================================

fn rows<'a>(tables: &'a Tables, model: &str) -> StoreResult<&'a [Value]> {
    tables
        .models
        .get(model)
        .map(Vec::as_slice)
        .ok_or_else(|| StoreError::UnknownModel(model.to_string()))
}

fn rows_mut<'a>(tables: &'a mut Tables, model: &str) -> StoreResult<&'a mut Vec<Value>> {
    tables
        .models
        .get_mut(model)
        .ok_or_else(|| StoreError::UnknownModel(model.to_string()))
}

fn position(rows: &[Value], model: &str, id: &RecordId) -> StoreResult<usize> {
    rows.iter()
        .position(|row| row.get(ID_FIELD).is_some_and(|value| id.matches(value)))
        .ok_or_else(|| StoreError::NotFound(format!("{} {}", model, id)))
}

/// Insert and return the stored document
fn create_record(
    tables: &mut Tables,
    sequences: &Sequences,
    model: &str,
    data: Payload,
) -> StoreResult<Value> {
    let rows = rows_mut(tables, model)?;
    let mut record = data.into_map();
    if !record.contains_key(ID_FIELD) {
        let next_id = sequences.next(model, rows)?;
        record.insert(ID_FIELD.to_string(), Value::from(next_id));
    }
    insert_record(rows, model, Value::Object(record))
}

fn insert_record(rows: &mut Vec<Value>, model: &str, record: Value) -> StoreResult<Value> {
    if let Some(id) = record.get(ID_FIELD) {
        if rows.iter().any(|row| row.get(ID_FIELD) == Some(id)) {
            return Err(StoreError::Validation(format!(
                "{} with id {} already exists",
                model, id
            )));
        }
    }
    rows.push(record.clone());
    Ok(record)
}

/// Apply one transaction write to the live tables
fn replay(tables: &mut Tables, change: Change) -> StoreResult<()> {
    match change {
        Change::Insert { model, record } => {
            insert_record(rows_mut(tables, &model)?, &model, record).map(|_| ())
        }
        Change::Update { model, id, data } => {
            update_record(tables, &model, &id, data, &Projection::Full).map(|_| ())
        }
        Change::Delete { model, id } => delete_record(tables, &model, &id).map(|_| ()),
    }
}

fn find_records(tables: &Tables, model: &str, args: &FindManyArgs) -> StoreResult<Vec<Value>> {
    let mut matching: Vec<&Value> = rows(tables, model)?
        .iter()
        .filter(|row| matches(row, &args.filter))
        .collect();
    sort_rows(&mut matching, &args.order_by)?;
    let Window { skip, take } = args.window.unwrap_or(Window {
        skip: 0,
        take: u64::MAX,
    });
    Ok(matching
        .into_iter()
        .skip(skip as usize)
        .take(usize::try_from(take).unwrap_or(usize::MAX))
        .map(|row| project(row, &args.projection))
        .collect())
}

fn find_by_id(
    tables: &Tables,
    model: &str,
    id: &RecordId,
    projection: &Projection,
) -> StoreResult<Option<Value>> {
    Ok(rows(tables, model)?
        .iter()
        .find(|row| row.get(ID_FIELD).is_some_and(|value| id.matches(value)))
        .map(|row| project(row, projection)))
}

fn find_first_record(
    tables: &Tables,
    model: &str,
    filter: &Filter,
    projection: &Projection,
) -> StoreResult<Option<Value>> {
    Ok(rows(tables, model)?
        .iter()
        .find(|row| matches(row, filter))
        .map(|row| project(row, projection)))
}

fn update_record(
    tables: &mut Tables,
    model: &str,
    id: &RecordId,
    data: Payload,
    projection: &Projection,
) -> StoreResult<Value> {
    let rows = rows_mut(tables, model)?;
    let index = position(rows, model, id)?;
    if let Value::Object(record) = &mut rows[index] {
        record.extend(data.into_map());
    }
    Ok(project(&rows[index], projection))
}

fn delete_record(tables: &mut Tables, model: &str, id: &RecordId) -> StoreResult<Value> {
    let rows = rows_mut(tables, model)?;
    let index = position(rows, model, id)?;
    Ok(rows.remove(index))
}

fn count_records(tables: &Tables, model: &str, filter: &Filter) -> StoreResult<u64> {
    Ok(rows(tables, model)?
        .iter()
        .filter(|row| matches(row, filter))
        .count() as u64)
}

fn group_records(tables: &Tables, model: &str, args: &GroupBy) -> StoreResult<Vec<GroupRow>> {
    let mut groups: Vec<(Vec<Value>, u64)> = Vec::new();
    for row in rows(tables, model)?.iter().filter(|row| matches(row, &args.filter)) {
        let key: Vec<Value> = args
            .by
            .iter()
            .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
            .collect();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    let grouped: Vec<Value> = groups
        .into_iter()
        .map(|(key, count)| {
            let mut row: GroupRow = args.by.iter().cloned().zip(key).collect();
            let mut aggregate = Map::new();
            aggregate.insert("_all".to_string(), Value::from(count));
            row.insert("_count".to_string(), Value::Object(aggregate));
            Value::Object(row)
        })
        .collect();

    let mut ordered: Vec<&Value> = grouped.iter().collect();
    sort_rows(&mut ordered, &args.order_by)?;
    Ok(ordered
        .into_iter()
        .skip(args.skip as usize)
        .take(usize::try_from(args.take).unwrap_or(usize::MAX))
        .filter_map(|row| row.as_object().cloned())
        .collect())
}

// ========================================
// Predicate evaluation
// ========================================

fn matches(record: &Value, filter: &Filter) -> bool {
    let fields_match = filter.fields().all(|(field, constraint)| {
        let value = record.get(field).unwrap_or(&Value::Null);
        match constraint {
            FieldFilter::Condition(condition) => condition_matches(value, condition),
            FieldFilter::Relation(inner) => relation_matches(value, inner),
        }
    });
    fields_match
        && filter
            .or_branch()
            .map_or(true, |alternatives| alternatives.iter().any(|alt| matches(record, alt)))
}

fn relation_matches(value: &Value, filter: &Filter) -> bool {
    match value {
        Value::Object(_) => matches(value, filter),
        Value::Array(items) => items.iter().any(|item| matches(item, filter)),
        _ => false,
    }
}

fn condition_matches(value: &Value, condition: &Condition) -> bool {
    let mode = condition.mode;
    match condition.operator {
        QueryOperator::Equals => values_equal(value, &condition.value, mode),
        QueryOperator::Not => !values_equal(value, &condition.value, mode),
        QueryOperator::In => condition
            .value
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| values_equal(value, c, mode))),
        QueryOperator::NotIn => condition
            .value
            .as_array()
            .map_or(true, |candidates| !candidates.iter().any(|c| values_equal(value, c, mode))),
        QueryOperator::Lt => compare(value, &condition.value) == Some(Ordering::Less),
        QueryOperator::Lte => matches!(
            compare(value, &condition.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        QueryOperator::Gt => compare(value, &condition.value) == Some(Ordering::Greater),
        QueryOperator::Gte => matches!(
            compare(value, &condition.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        QueryOperator::Contains | QueryOperator::StartsWith | QueryOperator::EndsWith => {
            text_matches(value, condition)
        }
    }
}

fn text_matches(value: &Value, condition: &Condition) -> bool {
    let (Some(haystack), Some(needle)) = (value.as_str(), condition.value.as_str()) else {
        return false;
    };
    let (haystack, needle) = match condition.mode {
        QueryMode::Insensitive => (haystack.to_lowercase(), needle.to_lowercase()),
        QueryMode::Default => (haystack.to_string(), needle.to_string()),
    };
    match condition.operator {
        QueryOperator::StartsWith => haystack.starts_with(&needle),
        QueryOperator::EndsWith => haystack.ends_with(&needle),
        _ => haystack.contains(&needle),
    }
}

fn values_equal(left: &Value, right: &Value, mode: QueryMode) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => compare(left, right) == Some(Ordering::Equal),
        (Value::String(a), Value::String(b)) if mode == QueryMode::Insensitive => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// ========================================
// Ordering and projection
// ========================================

fn lookup<'a>(record: &'a Value, path: &[String]) -> &'a Value {
    path.iter()
        .try_fold(record, |current, key| current.get(key))
        .unwrap_or(&Value::Null)
}

/// Nulls compare greater than any value
fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
    }
}

fn sort_rows(rows: &mut [&Value], order_by: &[OrderBy]) -> StoreResult<()> {
    if let Some(invalid) = order_by
        .iter()
        .find(|directive| matches!(directive.direction, SortOrder::Other(_)))
    {
        return Err(StoreError::Validation(format!(
            "unsupported sort direction '{}'",
            invalid.direction.as_str()
        )));
    }

    rows.sort_by(|a, b| {
        order_by
            .iter()
            .map(|directive| {
                let ordering = compare_for_sort(lookup(a, &directive.path), lookup(b, &directive.path));
                match directive.direction {
                    SortOrder::Desc => ordering.reverse(),
                    _ => ordering,
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    Ok(())
}

fn project(record: &Value, projection: &Projection) -> Value {
    match (projection, record) {
        (Projection::Select(fields), Value::Object(map)) => Value::Object(
            fields
                .iter()
                .filter_map(|field| map.get(field).map(|value| (field.clone(), value.clone())))
                .collect(),
        ),
        _ => record.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> MemoryStore {
        MemoryStore::new().with_records(
            "product",
            vec![
                json!({ "id": 1, "name": "Phone X", "price": 900, "category": { "name": "Mobile" }, "deleted_at": null }),
                json!({ "id": 2, "name": "Laptop", "price": 1500, "category": { "name": "Computers" }, "deleted_at": null }),
                json!({ "id": 3, "name": "Phone case", "price": 20, "category": { "name": "Accessories" }, "deleted_at": "2024-01-01T00:00:00Z" }),
            ],
        )
    }

    #[tokio::test]
    async fn test_nested_relation_filter_and_or_branch() {
        let store = catalog();
        let filter = Filter::new().or(vec![
            Filter::at_path(&["category", "name"], Condition::contains("mob").insensitive())
                .unwrap(),
            Filter::new().condition("price", Condition::gt(json!(1000))),
        ]);

        let rows = store
            .find_many(
                "product",
                &FindManyArgs {
                    filter,
                    order_by: vec![OrderBy::desc("price")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn test_soft_delete_marker_conditions() {
        let store = catalog();
        let live = Filter::new().condition("deleted_at", Condition::is_null());
        let gone = Filter::new().condition("deleted_at", Condition::is_not_null());

        assert_eq!(store.count("product", &live).await.unwrap(), 2);
        assert_eq!(store.count("product", &gone).await.unwrap(), 1);
        assert_eq!(store.count("product", &Filter::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_window_and_select_projection() {
        let store = catalog();
        let rows = store
            .find_many(
                "product",
                &FindManyArgs {
                    order_by: vec![OrderBy::asc("id")],
                    projection: Projection::Select(vec!["name".to_string()]),
                    window: Some(Window { skip: 1, take: 1 }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(rows, vec![json!({ "name": "Laptop" })]);
    }

    #[tokio::test]
    async fn test_create_assigns_next_id_and_rejects_duplicates() {
        let store = catalog();
        let created = store
            .create("product", Payload::new().set("name", "Tablet"), &Projection::Full)
            .await
            .unwrap();
        assert_eq!(created["id"], json!(4));

        let err = store
            .create("product", Payload::new().set("id", 4), &Projection::Full)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_model_and_missing_record() {
        let store = catalog();
        assert!(matches!(
            store.count("order", &Filter::new()).await,
            Err(StoreError::UnknownModel(_))
        ));
        assert!(matches!(
            store.delete("product", &RecordId::Int(99)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = catalog();

        let tx = store.begin().await.unwrap();
        store
            .update_in(&tx, "product", &RecordId::Int(1), Payload::new().set("price", 800), &Projection::Full)
            .await
            .unwrap();
        let outside = store.find_unique("product", &RecordId::Int(1), &Projection::Full).await.unwrap();
        assert_eq!(outside.unwrap()["price"], json!(900));
        store.commit(tx.clone()).await.unwrap();
        let committed = store.find_unique("product", &RecordId::Int(1), &Projection::Full).await.unwrap();
        assert_eq!(committed.unwrap()["price"], json!(800));
        assert!(matches!(store.commit(tx).await, Err(StoreError::TransactionClosed)));

        let tx = store.begin().await.unwrap();
        store.delete_in(&tx, "product", &RecordId::Int(2)).await.unwrap();
        store.rollback(tx.clone()).await.unwrap();
        assert_eq!(store.count("product", &Filter::new()).await.unwrap(), 3);
        assert!(matches!(
            store.count_in(&tx, "product", &Filter::new()).await,
            Err(StoreError::TransactionClosed)
        ));
    }

    #[tokio::test]
    async fn test_commit_keeps_writes_made_while_open() {
        let store = MemoryStore::new().with_model("product");

        let tx = store.begin().await.unwrap();
        let direct = store
            .create("product", Payload::new().set("name", "direct"), &Projection::Full)
            .await
            .unwrap();
        let in_tx = store
            .create_in(&tx, "product", Payload::new().set("name", "in_tx"), &Projection::Full)
            .await
            .unwrap();
        assert_ne!(direct["id"], in_tx["id"]);

        store.commit(tx).await.unwrap();

        let rows = store.records("product").await.unwrap();
        let names: Vec<_> = rows.iter().map(|row| row["name"].clone()).collect();
        assert_eq!(names, vec![json!("direct"), json!("in_tx")]);
    }

    #[tokio::test]
    async fn test_commit_conflict_leaves_live_state_untouched() {
        let store = catalog();

        let tx = store.begin().await.unwrap();
        store
            .create_in(&tx, "product", Payload::new().set("name", "Tablet"), &Projection::Full)
            .await
            .unwrap();
        store
            .update_in(&tx, "product", &RecordId::Int(2), Payload::new().set("price", 1400), &Projection::Full)
            .await
            .unwrap();
        store.delete("product", &RecordId::Int(2)).await.unwrap();

        assert!(matches!(store.commit(tx).await, Err(StoreError::NotFound(_))));
        assert_eq!(store.count("product", &Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_group_by_counts_and_window() {
        let store = MemoryStore::new().with_records(
            "order",
            vec![
                json!({ "id": 1, "status": "paid" }),
                json!({ "id": 2, "status": "open" }),
                json!({ "id": 3, "status": "paid" }),
            ],
        );

        let rows = store
            .group_by("order", &GroupBy::new(["status"]).order_by(vec![OrderBy::asc("status")]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(Value::Object(rows[0].clone()), json!({ "status": "open", "_count": { "_all": 1 } }));
        assert_eq!(Value::Object(rows[1].clone()), json!({ "status": "paid", "_count": { "_all": 2 } }));

        let rows = store
            .group_by("order", &GroupBy::new(["status"]).window(Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_direction_is_rejected() {
        let store = catalog();
        let err = store
            .find_many(
                "product",
                &FindManyArgs {
                    order_by: vec![OrderBy::new("name", SortOrder::parse("up"))],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
