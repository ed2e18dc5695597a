//! Query building blocks
//!
//! Structured values the engine and the composer hand to a store adapter: predicate
//! trees, ordering directives, payloads, projections, group-by arguments and the
//! pagination contract.

pub mod filter;
pub mod grouping;
pub mod ordering;
pub mod pagination;
pub mod payload;
pub mod projection;


pub use filter::{Condition, FieldFilter, Filter, QueryMode, QueryOperator, OR_KEY};
pub use grouping::{GroupBy, GroupRow};
pub use ordering::{OrderBy, SortOrder};
pub use pagination::{PaginatedResult, PaginationParams, Window};
pub use payload::Payload;
pub use projection::{FindOptions, Projection};
