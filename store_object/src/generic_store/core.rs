use crate::adapter::{ModelDelegate, StoreAdapter};
use crate::composer::QueryComposer;
use crate::traits::Entity;
use config::TransactionPolicy;
use std::marker::PhantomData;
use std::sync::Arc;

/// Generic CRUD engine for one entity type over one store adapter
pub struct CrudStore<T: Entity, A: StoreAdapter> {
    pub(crate) adapter: Arc<A>,
    pub(crate) composer: Arc<QueryComposer>,
    pub(crate) policy: TransactionPolicy,
    pub(crate) _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, A: StoreAdapter> Clone for CrudStore<T, A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            composer: Arc::clone(&self.composer),
            policy: self.policy,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity, A: StoreAdapter> std::fmt::Debug for CrudStore<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudStore")
            .field("model", &T::MODEL)
            .field("policy", &self.policy)
            .field("soft_delete_field", &self.soft_delete_field())
            .finish()
    }
}

impl<T: Entity, A: StoreAdapter> CrudStore<T, A> {
    /// Engine with the fallback transaction policy
    pub fn new(adapter: Arc<A>, composer: Arc<QueryComposer>) -> Self {
        Self {
            adapter,
            composer,
            policy: TransactionPolicy::default(),
            _entity: PhantomData,
        }
    }

    /// What mutating calls do when no transaction is attached
    pub fn with_policy(mut self, policy: TransactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransactionPolicy {
        self.policy
    }

    pub fn model(&self) -> &'static str {
        T::MODEL
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn composer(&self) -> &QueryComposer {
        &self.composer
    }

    /// Direct store operations bound to this entity's model
    pub fn delegate(&self) -> ModelDelegate<'_, A> {
        ModelDelegate::new(&self.adapter, T::MODEL)
    }

    /// The entity's own marker field, else the configured one
    pub fn soft_delete_field(&self) -> &str {
        match T::SOFT_DELETE_FIELD {
            Some(field) => field,
            None => self.composer.soft_delete_field(),
        }
    }
}
