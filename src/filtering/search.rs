use sea_orm::Value;

use super::query::Where;
use crate::database::Params;

const SEARCH_PARAM: &str = "search";
const SEARCH_REVERSED_PARAM: &str = "searchReversed";

/// WHERE clauses and bindings derived from one search request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// ANDed together by the query builder
    pub clauses: Vec<String>,
    pub params: Params,
}

impl SearchResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn into_where(self) -> (Where, Params) {
        (Where::All(self.clauses), self.params)
    }
}

/// Builds the free-text search group and the exact-match filters for a list query.
///
/// The phrase is split on single spaces and matched as a wildcarded substring in the
/// given word order and in reverse, against every searchable column:
///
/// ```text
/// (name LIKE :search OR name LIKE :searchReversed OR tags LIKE :search OR tags LIKE :searchReversed)
/// ```
///
/// Each exact filter is a separate `column = :column` clause. Without searchable columns
/// the builder produces nothing at all, filters included.
#[derive(Debug, Clone, Default)]
pub struct SearchBuilder {
    searchable: Vec<&'static str>,
    phrase: Option<String>,
    filters: Vec<(String, Value)>,
}

impl SearchBuilder {
    #[must_use]
    pub fn new(searchable: Vec<&'static str>) -> Self {
        Self {
            searchable,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn phrase(mut self, phrase: Option<&str>) -> Self {
        self.phrase = phrase.map(String::from);
        self
    }

    /// Add an exact match on `column`
    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> SearchResult {
        let mut result = SearchResult::default();
        if self.searchable.is_empty() {
            return result;
        }

        if let Some((forward, reversed)) = self.phrase.as_deref().and_then(patterns) {
            let alternatives: Vec<String> = self
                .searchable
                .iter()
                .map(|column| {
                    format!(
                        "{column} LIKE :{SEARCH_PARAM} OR {column} LIKE :{SEARCH_REVERSED_PARAM}"
                    )
                })
                .collect();
            result.clauses.push(format!("({})", alternatives.join(" OR ")));
            result
                .params
                .insert(SEARCH_PARAM.to_string(), Value::from(forward));
            result
                .params
                .insert(SEARCH_REVERSED_PARAM.to_string(), Value::from(reversed));
        }

        for (column, value) in self.filters {
            result.clauses.push(format!("{column} = :{column}"));
            result.params.insert(column, value);
        }

        result
    }
}

/// Forward and reversed `LIKE` patterns for a phrase, `None` when it is blank
fn patterns(phrase: &str) -> Option<(String, String)> {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return None;
    }

    let mut words: Vec<&str> = phrase.split(' ').collect();
    let forward = format!("%{}%", words.join("%"));
    words.reverse();
    let reversed = format!("%{}%", words.join("%"));
    Some((forward, reversed))
}
