//! CRUD operations
//!
//! Mutations (`create`, `update`, `delete`, `soft_delete`, `restore`) join the
//! transaction attached to the current task when there is one and otherwise follow the
//! engine's [`TransactionPolicy`]. Reads always go direct. Every store failure is logged
//! with its cause and surfaced as a [`CrudError`] carrying only a fixed message.

use super::core::CrudStore;
use crate::adapter::{FindManyArgs, StoreAdapter};
use crate::composer::PageRequest;
use crate::errors::{CrudError, CrudOperation, StoreError};
use crate::id_type::RecordId;
use crate::query_builder::{
    Filter, FindOptions, GroupBy, GroupRow, OrderBy, PaginatedResult, PaginationParams, Payload,
};
use crate::traits::Entity;
use crate::transaction::TransactionContext;
use config::TransactionPolicy;
use serde_json::Value;

/// Where a mutation runs
enum Route<Tx> {
    Direct,
    Transaction(Tx),
}

impl<Tx> Route<Tx> {
    fn label(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Transaction(_) => "transaction",
        }
    }
}

impl<T: Entity, A: StoreAdapter> CrudStore<T, A> {
    fn route(&self, operation: CrudOperation) -> Result<Route<A::Tx>, CrudError> {
        if let Some(tx) = TransactionContext::current::<A::Tx>() {
            return Ok(Route::Transaction(tx));
        }
        if TransactionContext::is_active() {
            tracing::warn!(
                model = T::MODEL,
                operation = operation.as_str(),
                "attached transaction belongs to a different store adapter, ignoring it"
            );
        }
        match self.policy {
            TransactionPolicy::Fallback => Ok(Route::Direct),
            TransactionPolicy::Require => {
                tracing::error!(
                    model = T::MODEL,
                    operation = operation.as_str(),
                    "no transaction attached to the current request"
                );
                Err(CrudError::TransactionRequired { operation })
            }
        }
    }

    fn fail(&self, operation: CrudOperation, err: StoreError) -> CrudError {
        tracing::error!(
            model = T::MODEL,
            operation = operation.as_str(),
            error = %err,
            "store operation failed"
        );
        CrudError::backend(operation)
    }

    fn decode(&self, operation: CrudOperation, row: Value) -> Result<T, CrudError> {
        serde_json::from_value(row).map_err(|err| {
            tracing::error!(
                model = T::MODEL,
                operation = operation.as_str(),
                error = %err,
                "store row does not match the entity"
            );
            CrudError::Decode { operation }
        })
    }

    pub async fn create(&self, data: Payload, options: &FindOptions) -> Result<T, CrudError> {
        let operation = CrudOperation::Create;
        let projection = options.projection();
        let route = self.route(operation)?;
        debug_log!("[CREATE] model: {}, route: {}", T::MODEL, route.label());

        let row = match route {
            Route::Direct => self.adapter.create(T::MODEL, data, &projection).await,
            Route::Transaction(tx) => {
                self.adapter
                    .create_in(&tx, T::MODEL, data, &projection)
                    .await
            }
        }
        .map_err(|err| self.fail(operation, err))?;

        self.decode(operation, row)
    }

    /// Paged read; see [`crate::composer`] for how `params` shape the query
    pub async fn find_all(
        &self,
        filter: Filter,
        options: &FindOptions,
        searchables: &[&str],
        order_by: Vec<OrderBy>,
        params: &PaginationParams,
    ) -> Result<PaginatedResult<T>, CrudError> {
        let request = PageRequest::new(params)
            .filter(filter)
            .order_by(order_by)
            .projection(options.projection())
            .searchables(searchables)
            .soft_delete_field(self.soft_delete_field());

        let page = self.composer.paginate(&self.delegate(), request).await?;
        page.try_map(|row| self.decode(CrudOperation::FindAll, row))
    }

    /// Every matching row, without pagination
    pub async fn find_many(
        &self,
        filter: Filter,
        order_by: Vec<OrderBy>,
        options: &FindOptions,
    ) -> Result<Vec<T>, CrudError> {
        let operation = CrudOperation::FindAll;
        let args = FindManyArgs {
            filter,
            order_by,
            projection: options.projection(),
            window: None,
        };
        let rows = self
            .delegate()
            .find_many(&args)
            .await
            .map_err(|err| self.fail(operation, err))?;

        rows.into_iter()
            .map(|row| self.decode(operation, row))
            .collect()
    }

    pub async fn find_one(
        &self,
        id: impl Into<RecordId>,
        options: &FindOptions,
    ) -> Result<Option<T>, CrudError> {
        let operation = CrudOperation::FindOne;
        let id = id.into();
        let row = self
            .delegate()
            .find_unique(&id, &options.projection())
            .await
            .map_err(|err| self.fail(operation, err))?;

        row.map(|row| self.decode(operation, row)).transpose()
    }

    /// First record matching `filter`
    pub async fn find_one_by(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<T>, CrudError> {
        let operation = CrudOperation::FindOneBy;
        let row = self
            .delegate()
            .find_first(filter, &options.projection())
            .await
            .map_err(|err| self.fail(operation, err))?;

        row.map(|row| self.decode(operation, row)).transpose()
    }

    pub async fn update(
        &self,
        id: impl Into<RecordId>,
        data: Payload,
        options: &FindOptions,
    ) -> Result<T, CrudError> {
        self.write(CrudOperation::Update, id.into(), data, options)
            .await
    }

    pub async fn delete(&self, id: impl Into<RecordId>) -> Result<T, CrudError> {
        let operation = CrudOperation::Delete;
        let id = id.into();
        let route = self.route(operation)?;
        debug_log!(
            "[DELETE] model: {}, id: {}, route: {}",
            T::MODEL,
            id,
            route.label()
        );

        let row = match route {
            Route::Direct => self.adapter.delete(T::MODEL, &id).await,
            Route::Transaction(tx) => self.adapter.delete_in(&tx, T::MODEL, &id).await,
        }
        .map_err(|err| self.fail(operation, err))?;

        self.decode(operation, row)
    }

    /// Field update carrying the caller's soft-delete marker in `data`
    pub async fn soft_delete(
        &self,
        id: impl Into<RecordId>,
        data: Payload,
        options: &FindOptions,
    ) -> Result<T, CrudError> {
        self.write(CrudOperation::SoftDelete, id.into(), data, options)
            .await
    }

    /// Field update carrying the caller's cleared marker in `data`
    pub async fn restore(
        &self,
        id: impl Into<RecordId>,
        data: Payload,
        options: &FindOptions,
    ) -> Result<T, CrudError> {
        self.write(CrudOperation::Restore, id.into(), data, options)
            .await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, CrudError> {
        self.delegate()
            .count(filter)
            .await
            .map_err(|err| self.fail(CrudOperation::Count, err))
    }

    pub async fn group_by(&self, args: &GroupBy) -> Result<Vec<GroupRow>, CrudError> {
        self.delegate()
            .group_by(args)
            .await
            .map_err(|err| self.fail(CrudOperation::GroupBy, err))
    }

    async fn write(
        &self,
        operation: CrudOperation,
        id: RecordId,
        data: Payload,
        options: &FindOptions,
    ) -> Result<T, CrudError> {
        let projection = options.projection();
        let route = self.route(operation)?;
        debug_log!(
            "[{}] model: {}, id: {}, route: {}",
            operation.as_str().to_uppercase(),
            T::MODEL,
            id,
            route.label()
        );

        let row = match route {
            Route::Direct => {
                self.adapter
                    .update(T::MODEL, &id, data, &projection)
                    .await
            }
            Route::Transaction(tx) => {
                self.adapter
                    .update_in(&tx, T::MODEL, &id, data, &projection)
                    .await
            }
        }
        .map_err(|err| self.fail(operation, err))?;

        self.decode(operation, row)
    }
}
