//! Pagination parameters and results
//!
//! [`PaginationParams`] is the request-side contract (all fields optional, wire names
//! in snake_case, flags and numbers accepted as strings). [`PaginatedResult`] is the
//! response envelope, serialized with camelCase keys.

use serde::{Deserialize, Serialize};

/// Raw pagination input as consumed from a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationParams {
    #[serde(deserialize_with = "lenient::opt_u64")]
    pub page: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    pub limit: Option<u64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub all: bool,
    pub search: Option<String>,
    #[serde(alias = "isDeletedToo", deserialize_with = "lenient::flag")]
    pub is_deleted_too: bool,
    #[serde(alias = "isDeletedOnly", deserialize_with = "lenient::flag")]
    pub is_deleted_only: bool,
    /// Comma-separated `path:direction` pairs, e.g. `name:asc,category.name:desc`
    pub order: Option<String>,
    #[serde(alias = "loadPreviousPages", deserialize_with = "lenient::flag")]
    pub load_previous_pages: bool,
    /// Accepted and carried, not used for composition
    #[serde(alias = "specificPages", deserialize_with = "lenient::pages")]
    pub specific_pages: Option<Vec<u64>>,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }

    pub fn deleted_too(mut self) -> Self {
        self.is_deleted_too = true;
        self
    }

    pub fn deleted_only(mut self) -> Self {
        self.is_deleted_only = true;
        self
    }

    pub fn load_previous_pages(mut self) -> Self {
        self.load_previous_pages = true;
        self
    }
}

/// Skip/take window of a paged read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub current_page: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    pub count: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub result: Vec<T>,
}

impl<T> PaginatedResult<T> {
    /// "All" mode: every matching row reported as a single page
    pub fn all(rows: Vec<T>) -> Self {
        let count = rows.len() as u64;
        Self {
            current_page: 1,
            previous_page: None,
            next_page: None,
            count,
            total_count: count,
            total_pages: 1,
            result: rows,
        }
    }

    /// Paged mode metadata; `limit` must be non-zero
    pub fn page(page: u64, limit: u64, window: Window, rows: Vec<T>, total_count: u64) -> Self {
        let count = rows.len() as u64;
        Self {
            current_page: page,
            previous_page: if page > 1 { Some(page - 1) } else { None },
            next_page: if window.skip + count < total_count {
                Some(page + 1)
            } else {
                None
            },
            count,
            total_count,
            total_pages: total_count.div_ceil(limit),
            result: rows,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            current_page: self.current_page,
            previous_page: self.previous_page,
            next_page: self.next_page,
            count: self.count,
            total_count: self.total_count,
            total_pages: self.total_pages,
            result: self.result.into_iter().map(f).collect(),
        }
    }

    pub fn try_map<U, E, F: FnMut(T) -> Result<U, E>>(self, f: F) -> Result<PaginatedResult<U>, E> {
        let result = self.result.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(PaginatedResult {
            current_page: self.current_page,
            previous_page: self.previous_page,
            next_page: self.next_page,
            count: self.count,
            total_count: self.total_count,
            total_pages: self.total_pages,
            result,
        })
    }
}

/// Deserializers for request-boundary values that arrive as strings
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrStr {
        Bool(bool),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Pages {
        Seq(Vec<NumOrStr>),
        One(NumOrStr),
    }

    fn number<E: Error>(value: NumOrStr) -> Result<Option<u64>, E> {
        match value {
            NumOrStr::Num(n) => Ok(Some(n)),
            NumOrStr::Str(s) if s.trim().is_empty() => Ok(None),
            NumOrStr::Str(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("expected a non-negative integer, got '{}'", s))),
        }
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<NumOrStr>::deserialize(d)? {
            Some(value) => number(value),
            None => Ok(None),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Option::<BoolOrStr>::deserialize(d)? {
            None => Ok(false),
            Some(BoolOrStr::Bool(b)) => Ok(b),
            Some(BoolOrStr::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                other => Err(D::Error::custom(format!("expected a boolean, got '{}'", other))),
            },
        }
    }

    /// A list of integers, or a single comma-separated string
    pub fn pages<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u64>>, D::Error> {
        let values = match Option::<Pages>::deserialize(d)? {
            None => return Ok(None),
            Some(Pages::Seq(values)) => values,
            Some(Pages::One(NumOrStr::Str(s))) => s
                .split(',')
                .map(|part| NumOrStr::Str(part.to_string()))
                .collect(),
            Some(Pages::One(value)) => vec![value],
        };
        let mut pages = Vec::with_capacity(values.len());
        for value in values {
            if let Some(page) = number(value)? {
                pages.push(page);
            }
        }
        Ok(Some(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_from_wire_strings() {
        let params: PaginationParams = serde_json::from_value(json!({
            "page": "2",
            "limit": "25",
            "all": "false",
            "search": "phone",
            "is_deleted_too": "true",
            "order": "name:asc",
            "load_previous_pages": "1",
            "specific_pages": "1,3"
        }))
        .unwrap();

        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, Some(25));
        assert!(!params.all);
        assert!(params.is_deleted_too);
        assert!(!params.is_deleted_only);
        assert!(params.load_previous_pages);
        assert_eq!(params.order.as_deref(), Some("name:asc"));
        assert_eq!(params.specific_pages, Some(vec![1, 3]));
    }

    #[test]
    fn test_params_absent_fields_default() {
        let params: PaginationParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params, PaginationParams::default());

        let params: PaginationParams =
            serde_json::from_value(json!({ "page": 3, "all": true, "specific_pages": [4, 5] }))
                .unwrap();
        assert_eq!(params.page, Some(3));
        assert!(params.all);
        assert_eq!(params.specific_pages, Some(vec![4, 5]));
    }

    #[test]
    fn test_params_reject_garbage() {
        assert!(serde_json::from_value::<PaginationParams>(json!({ "page": "two" })).is_err());
        assert!(serde_json::from_value::<PaginationParams>(json!({ "all": "maybe" })).is_err());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = PaginatedResult::all(vec![json!({ "id": 1 })]);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["currentPage"], json!(1));
        assert_eq!(value["previousPage"], json!(null));
        assert_eq!(value["totalCount"], json!(1));
        assert_eq!(value["totalPages"], json!(1));
        assert_eq!(value["result"], json!([{ "id": 1 }]));
    }
}
