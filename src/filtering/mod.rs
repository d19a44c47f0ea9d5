//! # Filtering, Search & Sorting
//!
//! Translates list-request parameters into SQL without the caller writing any.
//!
//! ## Main Components
//!
//! - **[`Query`]**: SELECT/COUNT/INSERT/UPDATE/DELETE rendering with `:name` bindings
//! - **[`SearchBuilder`]**: forward/reverse free-text search plus exact filters
//! - **[`sort::order_by`]**: sort resolution against an entity schema
//! - **[`Filters`]**: the parsed list parameters handed to `Entity::get_by_params`
//!
//! ## Request Parameters
//!
//! ```rust,ignore
//! // Free text, matched in either word order
//! GET /projects?search=api project
//!
//! // Exact match on any declared column
//! GET /projects?colour=red&date=2024-01-01
//!
//! // Sorting, standard REST format
//! GET /projects?sort_by=name&order=ASC
//!
//! // Sorting, React Admin format
//! GET /projects?sort=["name","DESC"]
//! ```

pub mod query;
pub mod search;
pub mod sort;

pub use query::{Query, QueryKind, Where};
pub use search::{SearchBuilder, SearchResult};
pub use sort::{Direction, SortRequest};

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

const SEARCH_KEY: &str = "search";
const SORT_KEY: &str = "sort";
const SORT_BY_KEY: &str = "sort_by";
const ORDER_KEY: &str = "order";
const PAGINATION_KEYS: [&str; 2] = ["limit", "page"];

/// Search phrase, exact-match filters and ordering for one list request.
///
/// Filter values stay strings here; the entity layer coerces them by column kind and
/// drops names that are not declared columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub search: Option<String>,
    pub exact: BTreeMap<String, String>,
    pub sort: Option<SortRequest>,
}

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, phrase: impl Into<String>) -> Self {
        self.search = Some(phrase.into());
        self
    }

    #[must_use]
    pub fn exact(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.exact.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn sort(mut self, column: impl Into<String>, direction: Option<Direction>) -> Self {
        self.sort = Some(SortRequest::new(column, direction));
        self
    }

    /// Read filters from request parameters.
    ///
    /// `search` is the phrase; `sort_by` + `order` or `sort` (a column name or a
    /// `["column", "ORDER"]` array) give the ordering; `limit` and `page` are left to the
    /// caller; every other scalar becomes an exact filter.
    #[must_use]
    pub fn from_params(params: &BTreeMap<String, JsonValue>) -> Self {
        let mut filters = Self::new();

        for (key, value) in params {
            match key.as_str() {
                SEARCH_KEY => filters.search = scalar_text(value),
                SORT_KEY | SORT_BY_KEY | ORDER_KEY => {}
                key if PAGINATION_KEYS.contains(&key) => {}
                _ => {
                    if let Some(text) = scalar_text(value) {
                        filters.exact.insert(key.clone(), text);
                    }
                }
            }
        }

        let direction = params
            .get(ORDER_KEY)
            .and_then(JsonValue::as_str)
            .and_then(Direction::parse);
        filters.sort = match (params.get(SORT_BY_KEY), params.get(SORT_KEY)) {
            (Some(JsonValue::String(column)), _) => Some(SortRequest::new(column.clone(), direction)),
            (_, Some(sort)) => parse_sort(sort, direction),
            _ => None,
        };

        filters
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// `"name"`, `["name", "DESC"]` or the same array JSON-encoded in a string
fn parse_sort(sort: &JsonValue, direction: Option<Direction>) -> Option<SortRequest> {
    match sort {
        JsonValue::Array(parts) => {
            let column = parts.first().and_then(JsonValue::as_str)?;
            let direction = parts
                .get(1)
                .and_then(JsonValue::as_str)
                .and_then(Direction::parse)
                .or(direction);
            Some(SortRequest::new(column, direction))
        }
        JsonValue::String(text) if text.trim_start().starts_with('[') => {
            serde_json::from_str::<JsonValue>(text)
                .ok()
                .filter(JsonValue::is_array)
                .and_then(|parsed| parse_sort(&parsed, direction))
        }
        JsonValue::String(column) => Some(SortRequest::new(column.clone(), direction)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: JsonValue) -> BTreeMap<String, JsonValue> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_params_splits_search_filters_and_paging() {
        let filters = Filters::from_params(&params(json!({
            "search": "foo bar",
            "colour": "red",
            "position": 3,
            "limit": 10,
            "page": 2,
            "tags": ["ignored"],
        })));

        assert_eq!(filters.search.as_deref(), Some("foo bar"));
        assert_eq!(filters.exact.len(), 2);
        assert_eq!(filters.exact["colour"], "red");
        assert_eq!(filters.exact["position"], "3");
        assert!(filters.sort.is_none());
    }

    #[test]
    fn test_rest_sort_format() {
        let filters = Filters::from_params(&params(json!({"sort_by": "name", "order": "desc"})));
        assert_eq!(
            filters.sort,
            Some(SortRequest::new("name", Some(Direction::Desc)))
        );
    }

    #[test]
    fn test_react_admin_sort_format() {
        let filters = Filters::from_params(&params(json!({"sort": "[\"name\",\"DESC\"]"})));
        assert_eq!(
            filters.sort,
            Some(SortRequest::new("name", Some(Direction::Desc)))
        );

        let filters = Filters::from_params(&params(json!({"sort": ["date", "ASC"]})));
        assert_eq!(filters.sort, Some(SortRequest::new("date", Some(Direction::Asc))));

        let filters = Filters::from_params(&params(json!({"sort": "[not json"})));
        assert!(filters.sort.is_none());
    }

    #[test]
    fn test_builder() {
        let filters = Filters::new()
            .search("api")
            .exact("colour", "blue")
            .sort("name", None);
        assert_eq!(filters.search.as_deref(), Some("api"));
        assert_eq!(filters.exact["colour"], "blue");
        assert_eq!(filters.sort.map(|sort| sort.column), Some("name".to_string()));
    }
}
