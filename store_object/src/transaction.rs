//! Request-scoped transaction context
//!
//! The handle of an open transaction is attached to the current task with
//! [`TransactionContext::scope`]; every future polled inside that scope sees it through
//! [`TransactionContext::current`]. Concurrent requests each run in their own scope, so
//! there is no shared slot to race on. The context never begins, commits or rolls back a
//! transaction, it only carries the handle.
//!
//! ```ignore
//! let tx = adapter.begin().await?;
//! TransactionContext::scope(tx.clone(), async {
//!     orders.create(payload, FindOptions::new()).await?;   // joins `tx`
//!     stock.update(id, change, FindOptions::new()).await    // joins `tx`
//! })
//! .await?;
//! adapter.commit(tx).await?;
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

type Handle = Arc<dyn Any + Send + Sync>;

tokio::task_local! {
    static CURRENT_TRANSACTION: Option<Handle>;
}

pub struct TransactionContext;

impl TransactionContext {
    /// Run `fut` with `handle` as the active transaction. An inner scope shadows an outer one.
    pub async fn scope<Tx, F>(handle: Tx, fut: F) -> F::Output
    where
        Tx: Clone + Send + Sync + 'static,
        F: Future,
    {
        CURRENT_TRANSACTION
            .scope(Some(Arc::new(handle) as Handle), fut)
            .await
    }

    /// Run `fut` with no active transaction, even when called inside a scope
    pub async fn detached<F: Future>(fut: F) -> F::Output {
        CURRENT_TRANSACTION.scope(None, fut).await
    }

    /// Handle of the active transaction, when it is of type `Tx`
    pub fn current<Tx>() -> Option<Tx>
    where
        Tx: Clone + Send + Sync + 'static,
    {
        CURRENT_TRANSACTION
            .try_with(|handle| {
                handle
                    .as_ref()
                    .and_then(|handle| handle.downcast_ref::<Tx>())
                    .cloned()
            })
            .ok()
            .flatten()
    }

    /// Whether any transaction handle is attached to the current task
    pub fn is_active() -> bool {
        CURRENT_TRANSACTION
            .try_with(|handle| handle.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeTx(u32);

    #[tokio::test]
    async fn test_no_context_outside_scope() {
        assert!(!TransactionContext::is_active());
        assert_eq!(TransactionContext::current::<FakeTx>(), None);
    }

    #[tokio::test]
    async fn test_scope_exposes_handle() {
        let seen = TransactionContext::scope(FakeTx(7), async {
            tokio::task::yield_now().await;
            TransactionContext::current::<FakeTx>()
        })
        .await;

        assert_eq!(seen, Some(FakeTx(7)));
        assert!(!TransactionContext::is_active());
    }

    #[tokio::test]
    async fn test_wrong_handle_type_is_not_visible() {
        TransactionContext::scope(FakeTx(1), async {
            assert!(TransactionContext::is_active());
            assert_eq!(TransactionContext::current::<String>(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_nested_and_detached_scopes() {
        TransactionContext::scope(FakeTx(1), async {
            let inner =
                TransactionContext::scope(FakeTx(2), async { TransactionContext::current::<FakeTx>() })
                    .await;
            assert_eq!(inner, Some(FakeTx(2)));
            assert_eq!(TransactionContext::current::<FakeTx>(), Some(FakeTx(1)));

            let detached =
                TransactionContext::detached(async { TransactionContext::is_active() }).await;
            assert!(!detached);
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_are_isolated() {
        let mut handles = Vec::new();
        for id in 0..16u32 {
            handles.push(tokio::spawn(async move {
                if id % 2 == 0 {
                    TransactionContext::scope(FakeTx(id), async {
                        for _ in 0..10 {
                            tokio::task::yield_now().await;
                        }
                        TransactionContext::current::<FakeTx>()
                    })
                    .await
                } else {
                    tokio::task::yield_now().await;
                    TransactionContext::current::<FakeTx>()
                }
            }));
        }

        for (id, handle) in handles.into_iter().enumerate() {
            let seen = handle.await.unwrap();
            if id % 2 == 0 {
                assert_eq!(seen, Some(FakeTx(id as u32)));
            } else {
                assert_eq!(seen, None);
            }
        }
    }
}
