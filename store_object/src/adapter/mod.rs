//! Store adapter contract
//!
//! A [`StoreAdapter`] exposes the same eight operations twice: direct calls addressed
//! by model name, and `*_in` calls that run inside an open transaction handle
//! (`Self::Tx`). Records travel as JSON objects; typing them is the engine's job.
//!
//! [`ModelDelegate`] pre-binds the direct form to one model, which is how the engine
//! and the composer reach the store.

pub mod memory;
pub mod postgres;

use crate::errors::StoreError;
use crate::id_type::RecordId;
use crate::query_builder::{Filter, GroupBy, GroupRow, OrderBy, Payload, Projection, Window};
use async_trait::async_trait;
use serde_json::Value;

pub use memory::{MemoryStore, MemoryTransaction};
pub use postgres::{PgModel, PgRelation, PgStore, PgTransaction, RelationKind};

pub type StoreResult<T> = Result<T, StoreError>;

/// Arguments of a multi-row read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub projection: Projection,
    /// `None` reads every matching row
    pub window: Option<Window>,
}

#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Handle of an open transaction
    type Tx: Clone + Send + Sync + 'static;

    async fn create(&self, model: &str, data: Payload, projection: &Projection)
        -> StoreResult<Value>;

    async fn find_many(&self, model: &str, args: &FindManyArgs) -> StoreResult<Vec<Value>>;

    async fn find_unique(
        &self,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>>;

    async fn find_first(
        &self,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>>;

    async fn update(
        &self,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value>;

    async fn delete(&self, model: &str, id: &RecordId) -> StoreResult<Value>;

    async fn count(&self, model: &str, filter: &Filter) -> StoreResult<u64>;

    async fn group_by(&self, model: &str, args: &GroupBy) -> StoreResult<Vec<GroupRow>>;

    async fn create_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value>;

    async fn find_many_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        args: &FindManyArgs,
    ) -> StoreResult<Vec<Value>>;

    async fn find_unique_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>>;

    async fn find_first_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>>;

    async fn update_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value>;

    async fn delete_in(&self, tx: &Self::Tx, model: &str, id: &RecordId) -> StoreResult<Value>;

    async fn count_in(&self, tx: &Self::Tx, model: &str, filter: &Filter) -> StoreResult<u64>;

    async fn group_by_in(
        &self,
        tx: &Self::Tx,
        model: &str,
        args: &GroupBy,
    ) -> StoreResult<Vec<GroupRow>>;

    /// Open a transaction. Used by request-entry code, never by the engine.
    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> StoreResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> StoreResult<()>;
}

/// Direct operations pre-bound to one model
pub struct ModelDelegate<'a, A: StoreAdapter> {
    adapter: &'a A,
    model: &'static str,
}

impl<'a, A: StoreAdapter> ModelDelegate<'a, A> {
    pub fn new(adapter: &'a A, model: &'static str) -> Self {
        Self { adapter, model }
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    pub async fn create(&self, data: Payload, projection: &Projection) -> StoreResult<Value> {
        self.adapter.create(self.model, data, projection).await
    }

    pub async fn find_many(&self, args: &FindManyArgs) -> StoreResult<Vec<Value>> {
        self.adapter.find_many(self.model, args).await
    }

    pub async fn find_unique(
        &self,
        id: &RecordId,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.adapter.find_unique(self.model, id, projection).await
    }

    pub async fn find_first(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Option<Value>> {
        self.adapter.find_first(self.model, filter, projection).await
    }

    pub async fn update(
        &self,
        id: &RecordId,
        data: Payload,
        projection: &Projection,
    ) -> StoreResult<Value> {
        self.adapter.update(self.model, id, data, projection).await
    }

    pub async fn delete(&self, id: &RecordId) -> StoreResult<Value> {
        self.adapter.delete(self.model, id).await
    }

    pub async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.adapter.count(self.model, filter).await
    }

    pub async fn group_by(&self, args: &GroupBy) -> StoreResult<Vec<GroupRow>> {
        self.adapter.group_by(self.model, args).await
    }
}
