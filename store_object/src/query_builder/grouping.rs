use super::filter::Filter;
use super::ordering::OrderBy;
use serde_json::{Map, Value};

pub const DEFAULT_GROUP_SKIP: u64 = 0;
pub const DEFAULT_GROUP_TAKE: u64 = 10;

/// One group: the grouping field values plus store-computed aggregates (`_count`)
pub type GroupRow = Map<String, Value>;

/// Arguments of a grouped count query
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    /// Fields to group by
    pub by: Vec<String>,
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub skip: u64,
    pub take: u64,
}

impl GroupBy {
    /// Group by the given fields with the default window (skip 0, take 10)
    pub fn new<I, S>(by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            by: by.into_iter().map(Into::into).collect(),
            filter: Filter::new(),
            order_by: Vec::new(),
            skip: DEFAULT_GROUP_SKIP,
            take: DEFAULT_GROUP_TAKE,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Omitted values fall back to the defaults; a zero `take` counts as omitted
    pub fn window(mut self, skip: Option<u64>, take: Option<u64>) -> Self {
        self.skip = skip.unwrap_or(DEFAULT_GROUP_SKIP);
        self.take = take.filter(|take| *take > 0).unwrap_or(DEFAULT_GROUP_TAKE);
        self
    }
}
