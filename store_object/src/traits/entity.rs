use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type bound to one model of the backing store.
///
/// The binding is resolved at compile time: every engine instance for `T` addresses
/// the adapter through `T::MODEL`. Usually derived:
///
/// ```ignore
/// use crudhaus::prelude::*;
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(model = "product")]
/// pub struct Product {
///     pub id: i64,
///     pub name: String,
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
///
/// Several types may share a model, e.g. a narrowed type used with `select`
/// projections.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Model name understood by the store adapter
    const MODEL: &'static str;

    /// Soft-delete marker field, when the model has one other than the configured default
    const SOFT_DELETE_FIELD: Option<&'static str> = None;
}
