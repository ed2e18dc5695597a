use super::*;
use crate::adapter::{FindManyArgs, MemoryStore, StoreAdapter, StoreResult};
use crate::composer::QueryComposer;
use crate::errors::{CrudError, CrudOperation, StoreError};
use crate::id_type::RecordId;
use crate::query_builder::{
    Condition, Filter, FindOptions, GroupBy, GroupRow, OrderBy, PaginationParams, Payload,
    Projection,
};
use crate::traits::Entity;
use crate::transaction::TransactionContext;
use async_trait::async_trait;
use config::{PaginationConfig, TransactionPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    id: i64,
    name: String,
    #[serde(default)]
    deleted_at: Option<String>,
}

impl Entity for Product {
    const MODEL: &'static str = "product";
}

/// Same model, but demands a column the store never returns
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PricedProduct {
    id: i64,
    price: f64,
}

impl Entity for PricedProduct {
    const MODEL: &'static str = "product";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FakeTx(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Direct,
    Transaction(u32),
}

/// Adapter fake that records which path every call took
#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<(&'static str, Path)>>,
    fail: bool,
}

impl RecordingStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(&'static str, Path)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, path: Path) -> StoreResult<()> {
        self.calls.lock().unwrap().push((operation, path));
        if self.fail {
            return Err(StoreError::Database(
                "connection reset by peer at 10.0.0.7:5432".to_string(),
            ));
        }
        Ok(())
    }

    fn row(data: Option<Payload>) -> Value {
        let mut row = json!({ "id": 1, "name": "Recorded", "deleted_at": null });
        if let (Some(data), Value::Object(map)) = (data, &mut row) {
            map.extend(data.into_map());
        }
        row
    }
}

#[async_trait]
impl StoreAdapter for RecordingStore {
    type Tx = FakeTx;

    async fn create(&self, _: &str, data: Payload, _: &Projection) -> StoreResult<Value> {
        self.record("create", Path::Direct)?;
        Ok(Self::row(Some(data)))
    }

    async fn find_many(&self, _: &str, _: &FindManyArgs) -> StoreResult<Vec<Value>> {
        self.record("find_many", Path::Direct)?;
        Ok(vec![Self::row(None)])
    }

    async fn find_unique(&self, _: &str, _: &RecordId, _: &Projection) -> StoreResult<Option<Value>> {
        self.record("find_unique", Path::Direct)?;
        Ok(Some(Self::row(None)))
    }

    async fn find_first(&self, _: &str, _: &Filter, _: &Projection) -> StoreResult<Option<Value>> {
        self.record("find_first", Path::Direct)?;
        Ok(None)
    }

    async fn update(&self, _: &str, _: &RecordId, data: Payload, _: &Projection) -> StoreResult<Value> {
        self.record("update", Path::Direct)?;
        Ok(Self::row(Some(data)))
    }

    async fn delete(&self, _: &str, _: &RecordId) -> StoreResult<Value> {
        self.record("delete", Path::Direct)?;
        Ok(Self::row(None))
    }

    async fn count(&self, _: &str, _: &Filter) -> StoreResult<u64> {
        self.record("count", Path::Direct)?;
        Ok(1)
    }

    async fn group_by(&self, _: &str, _: &GroupBy) -> StoreResult<Vec<GroupRow>> {
        self.record("group_by", Path::Direct)?;
        Ok(Vec::new())
    }

    async fn create_in(&self, tx: &FakeTx, _: &str, data: Payload, _: &Projection) -> StoreResult<Value> {
        self.record("create", Path::Transaction(tx.0))?;
        Ok(Self::row(Some(data)))
    }

    async fn find_many_in(&self, tx: &FakeTx, _: &str, _: &FindManyArgs) -> StoreResult<Vec<Value>> {
        self.record("find_many", Path::Transaction(tx.0))?;
        Ok(vec![Self::row(None)])
    }

    async fn find_unique_in(
        &self,
        tx: &FakeTx,
        _: &str,
        _: &RecordId,
        _: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.record("find_unique", Path::Transaction(tx.0))?;
        Ok(Some(Self::row(None)))
    }

    async fn find_first_in(
        &self,
        tx: &FakeTx,
        _: &str,
        _: &Filter,
        _: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.record("find_first", Path::Transaction(tx.0))?;
        Ok(None)
    }

    async fn update_in(
        &self,
        tx: &FakeTx,
        _: &str,
        _: &RecordId,
        data: Payload,
        _: &Projection,
    ) -> StoreResult<Value> {
        self.record("update", Path::Transaction(tx.0))?;
        Ok(Self::row(Some(data)))
    }

    async fn delete_in(&self, tx: &FakeTx, _: &str, _: &RecordId) -> StoreResult<Value> {
        self.record("delete", Path::Transaction(tx.0))?;
        Ok(Self::row(None))
    }

    async fn count_in(&self, tx: &FakeTx, _: &str, _: &Filter) -> StoreResult<u64> {
        self.record("count", Path::Transaction(tx.0))?;
        Ok(1)
    }

    async fn group_by_in(&self, tx: &FakeTx, _: &str, _: &GroupBy) -> StoreResult<Vec<GroupRow>> {
        self.record("group_by", Path::Transaction(tx.0))?;
        Ok(Vec::new())
    }

    async fn begin(&self) -> StoreResult<FakeTx> {
        Ok(FakeTx(1))
    }

    async fn commit(&self, _: FakeTx) -> StoreResult<()> {
        Ok(())
    }

    async fn rollback(&self, _: FakeTx) -> StoreResult<()> {
        Ok(())
    }
}

fn composer() -> Arc<QueryComposer> {
    Arc::new(QueryComposer::new(PaginationConfig::default()))
}

fn recording_store(adapter: RecordingStore) -> (Arc<RecordingStore>, CrudStore<Product, RecordingStore>) {
    let adapter = Arc::new(adapter);
    let store = CrudStore::new(Arc::clone(&adapter), composer());
    (adapter, store)
}

async fn run_mutations(store: &CrudStore<Product, RecordingStore>) -> Result<(), CrudError> {
    let options = FindOptions::new();
    store
        .create(Payload::new().set("name", "Phone"), &options)
        .await?;
    store
        .update(1, Payload::new().set("name", "Phone 2"), &options)
        .await?;
    store
        .soft_delete(1, Payload::new().set("deleted_at", "2024-01-01T00:00:00Z"), &options)
        .await?;
    store
        .restore(1, Payload::new().unset("deleted_at"), &options)
        .await?;
    store.delete(1).await?;
    Ok(())
}

#[tokio::test]
async fn test_mutations_go_direct_without_transaction() {
    let (adapter, store) = recording_store(RecordingStore::default());

    run_mutations(&store).await.unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(|(_, path)| *path == Path::Direct));
    assert_eq!(
        calls.iter().map(|(op, _)| *op).collect::<Vec<_>>(),
        vec!["create", "update", "update", "update", "delete"]
    );
}

#[tokio::test]
async fn test_mutations_join_attached_transaction() {
    let (adapter, store) = recording_store(RecordingStore::default());

    TransactionContext::scope(FakeTx(7), run_mutations(&store))
        .await
        .unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(|(_, path)| *path == Path::Transaction(7)));
}

#[tokio::test]
async fn test_reads_stay_direct_inside_transaction() {
    let (adapter, store) = recording_store(RecordingStore::default());

    TransactionContext::scope(FakeTx(3), async {
        store.find_one(1, &FindOptions::new()).await.unwrap();
        store
            .find_one_by(&Filter::new().eq("name", json!("x")), &FindOptions::new())
            .await
            .unwrap();
        store.count(&Filter::new()).await.unwrap();
        store.group_by(&GroupBy::new(["name"])).await.unwrap();
    })
    .await;

    assert!(adapter.calls().iter().all(|(_, path)| *path == Path::Direct));
}

#[tokio::test]
async fn test_require_policy_rejects_mutation_without_transaction() {
    let (adapter, store) = recording_store(RecordingStore::default());
    let store = store.with_policy(TransactionPolicy::Require);

    let err = store
        .create(Payload::new().set("name", "Phone"), &FindOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CrudError::TransactionRequired {
            operation: CrudOperation::Create
        }
    );
    assert!(adapter.calls().is_empty());

    TransactionContext::scope(FakeTx(9), run_mutations(&store))
        .await
        .unwrap();
    assert_eq!(adapter.calls().len(), 5);
}

#[tokio::test]
async fn test_foreign_transaction_handle_is_ignored() {
    let (adapter, store) = recording_store(RecordingStore::default());

    TransactionContext::scope("not a FakeTx".to_string(), async {
        store
            .create(Payload::new().set("name", "Phone"), &FindOptions::new())
            .await
            .unwrap();
    })
    .await;

    assert_eq!(adapter.calls(), vec![("create", Path::Direct)]);
}

#[tokio::test]
async fn test_store_failures_are_normalized() {
    let (_, store) = recording_store(RecordingStore::failing());
    let options = FindOptions::new();

    let err = store
        .create(Payload::new().set("name", "Phone"), &options)
        .await
        .unwrap_err();
    assert_eq!(err, CrudError::backend(CrudOperation::Create));
    assert_eq!(err.to_string(), "Error creating record");
    assert!(!err.to_string().contains("10.0.0.7"));

    let err = store.update(1, Payload::new(), &options).await.unwrap_err();
    assert_eq!(err.to_string(), "Error updating record");

    let err = store
        .soft_delete(1, Payload::new(), &options)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error soft deleting record");

    let err = store.restore(1, Payload::new(), &options).await.unwrap_err();
    assert_eq!(err.to_string(), "Error restoring record");

    let err = store.delete(1).await.unwrap_err();
    assert_eq!(err.to_string(), "Error deleting record");

    let err = store.find_one(1, &options).await.unwrap_err();
    assert_eq!(err.to_string(), "Error fetching record");

    let err = store.count(&Filter::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "Error counting records");

    let err = store
        .group_by(&GroupBy::new(["name"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error grouping records");

    let err = store
        .find_all(Filter::new(), &options, &[], Vec::new(), &PaginationParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error fetching records");
}

#[tokio::test]
async fn test_rows_that_do_not_fit_the_entity() {
    let adapter = Arc::new(RecordingStore::default());
    let store: CrudStore<PricedProduct, _> = CrudStore::new(adapter, composer());

    let err = store.find_one(1, &FindOptions::new()).await.unwrap_err();

    assert_eq!(
        err,
        CrudError::Decode {
            operation: CrudOperation::FindOne
        }
    );
}

// End to end over the in-memory adapter

struct ProductService {
    store: CrudStore<Product, MemoryStore>,
}

#[async_trait]
impl CrudService for ProductService {
    type Entity = Product;
    type Adapter = MemoryStore;

    fn store(&self) -> &CrudStore<Product, MemoryStore> {
        &self.store
    }

    fn searchables(&self) -> &[&str] {
        &["name"]
    }

    fn base_filter(&self) -> Filter {
        Filter::new().condition("deleted_at", Condition::is_null())
    }

    fn default_order(&self) -> Vec<OrderBy> {
        vec![OrderBy::asc("name")]
    }

    // Names are stored trimmed; everything else is the generic behavior
    async fn create(&self, data: Payload, options: &FindOptions) -> Result<Product, CrudError> {
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .map(|name| name.trim().to_string());
        let data = match name {
            Some(name) => data.set("name", name),
            None => data,
        };
        self.store.create(data, options).await
    }
}

fn product_service() -> (MemoryStore, ProductService) {
    let adapter = MemoryStore::new().with_model("product");
    let store = CrudStore::new(Arc::new(adapter.clone()), composer());
    (adapter, ProductService { store })
}

#[tokio::test]
async fn test_service_hooks_over_memory_store() {
    let (_, service) = product_service();
    let options = FindOptions::new();

    for name in ["  Phone ", "Laptop", "Phone case"] {
        service
            .create(Payload::new().set("name", name), &options)
            .await
            .unwrap();
    }

    let phone = service
        .store()
        .find_one_by(&Filter::new().eq("name", json!("Phone")), &options)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phone.id, 1);

    let deleted = service.soft_delete(RecordId::Int(1), &options).await.unwrap();
    assert!(deleted.deleted_at.is_some());

    let page = service
        .find_all(&PaginationParams::new().search("phone"), &options)
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.result[0].name, "Phone case");

    let page = service
        .find_all(&PaginationParams::new().deleted_only(), &options)
        .await
        .unwrap();
    assert_eq!(page.result, vec![deleted.clone()]);

    let restored = service.restore(RecordId::Int(1), &options).await.unwrap();
    assert_eq!(restored.deleted_at, None);

    let page = service
        .find_all(&PaginationParams::new(), &options)
        .await
        .unwrap();
    let names: Vec<_> = page.result.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Laptop", "Phone", "Phone case"]);
}

#[tokio::test]
async fn test_find_one_missing_record_is_none() {
    let (_, service) = product_service();

    let found = service
        .find_one(RecordId::Int(42), &FindOptions::new())
        .await
        .unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn test_memory_transaction_scope_commit_and_rollback() {
    let (adapter, service) = product_service();
    let options = FindOptions::new();

    let tx = adapter.begin().await.unwrap();
    TransactionContext::scope(tx.clone(), async {
        service
            .create(Payload::new().set("name", "Draft"), &options)
            .await
            .unwrap();
    })
    .await;
    assert_eq!(service.store().count(&Filter::new()).await.unwrap(), 0);
    adapter.commit(tx).await.unwrap();
    assert_eq!(service.store().count(&Filter::new()).await.unwrap(), 1);

    let tx = adapter.begin().await.unwrap();
    TransactionContext::scope(tx.clone(), service.delete(RecordId::Int(1)))
        .await
        .unwrap();
    adapter.rollback(tx).await.unwrap();
    assert_eq!(service.store().count(&Filter::new()).await.unwrap(), 1);
}
