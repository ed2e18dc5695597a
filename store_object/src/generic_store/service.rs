//! Per-model services
//!
//! A concrete service implements [`CrudService`] by handing out its engine; every hook
//! has a default that calls the generic operation, so overriding one keeps the others
//! and the override can still call `self.store()` for the base behavior.

use super::core::CrudStore;
use crate::adapter::StoreAdapter;
use crate::errors::CrudError;
use crate::id_type::RecordId;
use crate::query_builder::{Filter, FindOptions, OrderBy, PaginatedResult, PaginationParams, Payload};
use crate::traits::Entity;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait CrudService: Send + Sync + 'static {
    type Entity: Entity;
    type Adapter: StoreAdapter;

    fn store(&self) -> &CrudStore<Self::Entity, Self::Adapter>;

    /// Dot paths `search` looks into
    fn searchables(&self) -> &[&str] {
        &[]
    }

    /// Filter every `find_all` starts from, e.g. excluding soft-deleted rows
    fn base_filter(&self) -> Filter {
        Filter::new()
    }

    fn default_order(&self) -> Vec<OrderBy> {
        Vec::new()
    }

    async fn create(&self, data: Payload, options: &FindOptions) -> Result<Self::Entity, CrudError> {
        self.store().create(data, options).await
    }

    async fn find_all(
        &self,
        params: &PaginationParams,
        options: &FindOptions,
    ) -> Result<PaginatedResult<Self::Entity>, CrudError> {
        self.store()
            .find_all(
                self.base_filter(),
                options,
                self.searchables(),
                self.default_order(),
                params,
            )
            .await
    }

    async fn find_one(
        &self,
        id: RecordId,
        options: &FindOptions,
    ) -> Result<Option<Self::Entity>, CrudError> {
        self.store().find_one(id, options).await
    }

    async fn update(
        &self,
        id: RecordId,
        data: Payload,
        options: &FindOptions,
    ) -> Result<Self::Entity, CrudError> {
        self.store().update(id, data, options).await
    }

    async fn delete(&self, id: RecordId) -> Result<Self::Entity, CrudError> {
        self.store().delete(id).await
    }

    /// Stamps the marker field with the current UTC time
    async fn soft_delete(
        &self,
        id: RecordId,
        options: &FindOptions,
    ) -> Result<Self::Entity, CrudError> {
        let store = self.store();
        let data = Payload::new().set(
            store.soft_delete_field(),
            chrono::Utc::now().to_rfc3339(),
        );
        store.soft_delete(id, data, options).await
    }

    /// Clears the marker field
    async fn restore(&self, id: RecordId, options: &FindOptions) -> Result<Self::Entity, CrudError> {
        let store = self.store();
        let data = Payload::new().set(store.soft_delete_field(), Value::Null);
        store.restore(id, data, options).await
    }
}
