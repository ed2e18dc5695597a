//! Query composer
//!
//! Turns wire-level [`PaginationParams`] plus a caller's base filter and ordering into
//! a resolved filter, ordering and skip/take window, then runs the read through a
//! [`ModelDelegate`] and shapes the [`PaginatedResult`].
//!
//! Composition order: soft-delete adjustment, order parsing, search, windowing.


use crate::adapter::{FindManyArgs, ModelDelegate, StoreAdapter};
use crate::errors::{CompositionError, CrudError, CrudOperation, StoreError};
use crate::query_builder::{
    Condition, FieldFilter, Filter, OrderBy, PaginatedResult, PaginationParams, Projection,
    SortOrder, Window,
};
use config::PaginationConfig;
use serde_json::Value;

/// Everything one paged read needs besides the store
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub projection: Projection,
    /// Dot paths eligible for `search`
    pub searchables: &'a [&'a str],
    pub params: &'a PaginationParams,
    /// Marker field for this model; the configured one when `None`
    pub soft_delete_field: Option<&'a str>,
}

impl<'a> PageRequest<'a> {
    pub fn new(params: &'a PaginationParams) -> Self {
        Self {
            filter: Filter::new(),
            order_by: Vec::new(),
            projection: Projection::Full,
            searchables: &[],
            params,
            soft_delete_field: None,
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

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn searchables(mut self, searchables: &'a [&'a str]) -> Self {
        self.searchables = searchables;
        self
    }

    pub fn soft_delete_field(mut self, field: &'a str) -> Self {
        self.soft_delete_field = Some(field);
        self
    }
}

/// Resolved read, ready for the store
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub projection: Projection,
    pub page: u64,
    pub limit: u64,
    pub window: Window,
    /// Bypass the window and read every matching row
    pub all: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueryComposer {
    config: PaginationConfig,
}

impl QueryComposer {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    pub fn soft_delete_field(&self) -> &str {
        &self.config.soft_delete_field
    }

    /// Resolve filter, ordering and window without touching the store
    pub fn compose(&self, request: PageRequest<'_>) -> Result<ComposedQuery, CompositionError> {
        let params = request.params;
        let marker = request
            .soft_delete_field
            .unwrap_or(&self.config.soft_delete_field);

        let mut filter = request.filter;
        apply_soft_delete(&mut filter, marker, params);

        let mut order_by = request.order_by;
        if let Some(order) = params.order.as_deref().filter(|order| !order.is_empty()) {
            order_by.extend(parse_order(order)?);
        }

        if let Some(search) = params.search.as_deref().filter(|search| !search.is_empty()) {
            if !request.searchables.is_empty() {
                let alternatives = search_filters(search, request.searchables)?;
                merge_or(&mut filter, alternatives);
            }
        }

        let limit = self.resolve_limit(params.limit);
        let page = self.resolve_page(params.page);
        let window = resolve_window(page, limit, params.load_previous_pages);

        Ok(ComposedQuery {
            filter,
            order_by,
            projection: request.projection,
            page,
            limit,
            window,
            all: params.all,
        })
    }

    /// Compose and run a paged (or "all") read against one model
    pub async fn paginate<A: StoreAdapter>(
        &self,
        delegate: &ModelDelegate<'_, A>,
        request: PageRequest<'_>,
    ) -> Result<PaginatedResult<Value>, CrudError> {
        let composed = self.compose(request)?;
        let model = delegate.model();

        debug_log!(
            "[PAGINATE] model: {}, where: {}, order_by: {:?}, page: {}, limit: {}, skip: {}, take: {}, all: {}",
            model,
            composed.filter.to_value(),
            composed
                .order_by
                .iter()
                .map(OrderBy::to_value)
                .collect::<Vec<_>>(),
            composed.page,
            composed.limit,
            composed.window.skip,
            composed.window.take,
            composed.all
        );

        let ComposedQuery {
            filter,
            order_by,
            projection,
            page,
            limit,
            window,
            all,
        } = composed;

        if all {
            let args = FindManyArgs {
                filter,
                order_by,
                projection,
                window: None,
            };
            let rows = delegate
                .find_many(&args)
                .await
                .map_err(|err| read_failed(model, err))?;
            return Ok(PaginatedResult::all(rows));
        }

        let args = FindManyArgs {
            filter,
            order_by,
            projection,
            window: Some(window),
        };
        let rows = delegate
            .find_many(&args)
            .await
            .map_err(|err| read_failed(model, err))?;
        // Known race: the page and its total are two reads without a shared snapshot,
        // concurrent writes between them can make `total_count` disagree with the page.
        let total_count = delegate
            .count(&args.filter)
            .await
            .map_err(|err| read_failed(model, err))?;

        Ok(PaginatedResult::page(page, limit, window, rows, total_count))
    }

    fn resolve_limit(&self, requested: Option<u64>) -> u64 {
        let limit = requested
            .filter(|limit| *limit > 0)
            .unwrap_or(self.config.default_limit);
        let limit = if self.config.max_limit > 0 {
            limit.min(self.config.max_limit)
        } else {
            limit
        };
        limit.max(1)
    }

    fn resolve_page(&self, requested: Option<u64>) -> u64 {
        requested
            .filter(|page| *page > 0)
            .unwrap_or(self.config.default_page)
            .max(1)
    }
}

fn read_failed(model: &str, err: StoreError) -> CrudError {
    tracing::error!(
        model = model,
        operation = CrudOperation::FindAll.as_str(),
        error = %err,
        "paginated read failed"
    );
    CrudError::backend(CrudOperation::FindAll)
}

/// `is_deleted_too` drops any condition on the marker field; `is_deleted_only` then
/// requires the marker to be set. With both flags only deleted rows remain.
pub fn apply_soft_delete(filter: &mut Filter, marker: &str, params: &PaginationParams) {
    if params.is_deleted_too && filter.contains_field(marker) {
        filter.remove(marker);
    }
    if params.is_deleted_only {
        filter.set(
            marker,
            FieldFilter::Condition(Condition::is_not_null()),
        );
    }
}

/// Parse `path:direction` pairs separated by commas, e.g. `name:asc,category.name:desc`
pub fn parse_order(order: &str) -> Result<Vec<OrderBy>, CompositionError> {
    let mut directives = Vec::new();
    for item in order.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let mut parts = item.split(':');
        let (path, direction) = match (parts.next(), parts.next(), parts.next()) {
            (Some(path), Some(direction), None) if !direction.trim().is_empty() => {
                (path.trim(), direction.trim())
            }
            _ => return Err(CompositionError::MalformedOrderDirective(item.to_string())),
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(CompositionError::EmptyOrderPath(item.to_string()));
        }
        directives.push(OrderBy::nested(segments, SortOrder::parse(direction)));
    }
    Ok(directives)
}

/// One case-insensitive `contains` predicate per searchable dot path
pub fn search_filters(search: &str, searchables: &[&str]) -> Result<Vec<Filter>, CompositionError> {
    searchables
        .iter()
        .map(|searchable| {
            let segments: Vec<&str> = searchable.split('.').collect();
            if segments.iter().any(|segment| segment.is_empty()) {
                return Err(CompositionError::EmptySearchablePath(searchable.to_string()));
            }
            Filter::at_path(&segments, Condition::contains(search).insensitive())
                .ok_or_else(|| CompositionError::EmptySearchablePath(searchable.to_string()))
        })
        .collect()
}

/// Attach `alternatives` as the OR branch, or append them to an existing one.
///
/// Appending widens the caller's own alternatives instead of AND-ing the two sets.
pub fn merge_or(filter: &mut Filter, alternatives: Vec<Filter>) {
    match filter.take_or() {
        Some(mut existing) => {
            existing.extend(alternatives);
            filter.set_or(existing);
        }
        None => filter.set_or(alternatives),
    }
}

/// Skip/take for a page; `load_previous_pages` reads cumulatively from page 1
pub fn resolve_window(page: u64, limit: u64, load_previous_pages: bool) -> Window {
    if load_previous_pages {
        Window {
            skip: 0,
            take: page.saturating_mul(limit),
        }
    } else {
        Window {
            skip: page.saturating_sub(1).saturating_mul(limit),
            take: limit,
        }
    }
}
