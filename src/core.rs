//! Core CrudHaus functionality
//!
//! This module contains the main CrudHaus coordinator: it owns the store adapter and the
//! query composer, hands out typed CRUD engines, keeps the per-model service registry
//! and runs closures inside a transaction.

use sqlx::PgPool;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use store_object::{CrudService, CrudStore, Entity, PgStore, QueryComposer, StoreAdapter, TransactionContext};

use crate::errors::CrudHausError;
use config::{AppConfig, DatabaseConfig, PaginationConfig, TransactionPolicy};

/// Main CrudHaus coordinator that manages the store adapter and registered services
pub struct CrudHaus<A: StoreAdapter = PgStore> {
    adapter: Arc<A>,
    composer: Arc<QueryComposer>,
    policy: TransactionPolicy,
    services: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl CrudHaus<PgStore> {
    /// Connect to Postgres with the pool settings, pagination defaults and
    /// transaction policy from `config`
    pub async fn connect(config: AppConfig) -> Result<Self, CrudHausError> {
        config.validate()?;
        let pool = connect_pool(&config.database).await?;

        let mut crudhaus = Self::with_adapter(PgStore::new(pool));
        crudhaus.composer = Arc::new(QueryComposer::new(config.pagination));
        crudhaus.policy = config.transactions.policy;
        Ok(crudhaus)
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        self.adapter.pool()
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), CrudHausError> {
        sqlx::query("SELECT 1").fetch_one(self.pool()).await?;
        Ok(())
    }
}

async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, CrudHausError> {
    let connection_string = config.connection_string();

    let mut pool_options = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

    // Set max lifetime if specified
    if config.max_lifetime_seconds > 0 {
        pool_options = pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
    }

    Ok(pool_options.connect(&connection_string).await?)
}

impl<A: StoreAdapter> CrudHaus<A> {
    /// Coordinator over any adapter with default pagination and the fallback policy
    pub fn with_adapter(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
            composer: Arc::new(QueryComposer::default()),
            policy: TransactionPolicy::default(),
            services: HashMap::new(),
        }
    }

    /// Replace the pagination defaults
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Result<Self, CrudHausError> {
        pagination.validate()?;
        self.composer = Arc::new(QueryComposer::new(pagination));
        Ok(self)
    }

    pub fn with_transaction_policy(mut self, policy: TransactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn composer(&self) -> &Arc<QueryComposer> {
        &self.composer
    }

    /// Typed CRUD engine for `T`, sharing this coordinator's adapter and composer
    pub fn store<T: Entity>(&self) -> CrudStore<T, A> {
        CrudStore::new(Arc::clone(&self.adapter), Arc::clone(&self.composer))
            .with_policy(self.policy)
    }

    /// Register the service of an entity; one service per model
    pub fn register<S>(&mut self, service: S) -> Result<(), CrudHausError>
    where
        S: CrudService<Adapter = A>,
    {
        let model = <S::Entity as Entity>::MODEL;
        if self.services.contains_key(model) {
            return Err(CrudHausError::ServiceAlreadyRegistered(model.to_string()));
        }

        self.services.insert(model, Box::new(service));
        Ok(())
    }

    /// Get the registered service of `S::Entity`
    pub fn get<S>(&self) -> Result<&S, CrudHausError>
    where
        S: CrudService<Adapter = A>,
    {
        let model = <S::Entity as Entity>::MODEL;
        self.services
            .get(model)
            .and_then(|service| service.downcast_ref::<S>())
            .ok_or_else(|| CrudHausError::ServiceNotFound(model.to_string()))
    }

    /// Remove a service by model name
    pub fn unregister(&mut self, model: &str) -> Result<(), CrudHausError> {
        self.services
            .remove(model)
            .map(|_| ())
            .ok_or_else(|| CrudHausError::ServiceNotFound(model.to_string()))
    }

    /// List all registered model names
    pub fn list(&self) -> Vec<&'static str> {
        let mut models: Vec<_> = self.services.keys().copied().collect();
        models.sort_unstable();
        models
    }

    /// Run `f` inside a new transaction: every mutation it makes through an engine of
    /// this adapter joins the transaction. Commits on `Ok`, rolls back on `Err`.
    pub async fn transaction<F, Fut, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<CrudHausError>,
    {
        let tx = self
            .adapter
            .begin()
            .await
            .map_err(|e| E::from(CrudHausError::Store(e)))?;
        debug_log!("[TRANSACTION] begin");

        match TransactionContext::scope(tx.clone(), f()).await {
            Ok(value) => {
                self.adapter
                    .commit(tx)
                    .await
                    .map_err(|e| E::from(CrudHausError::Store(e)))?;
                debug_log!("[TRANSACTION] commit");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.adapter.rollback(tx).await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                debug_log!("[TRANSACTION] rollback");
                Err(err)
            }
        }
    }
}
