use serde_json::{Map, Value as JsonValue};

use crate::entity::Entity;

/// One page of a list query.
///
/// `total_count` counts every matching row, independent of `limit`. A `limit` of 0 means
/// the result is unpaginated: it has no pages, so neither neighbour exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedResult<T> {
    items: Vec<T>,
    total_count: u64,
    limit: u64,
    page: u64,
}

impl<T> PaginatedResult<T> {
    /// Page numbers below 1 are treated as the first page. A `total_count` below the
    /// number of items is raised to it.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, limit: u64, page: u64) -> Self {
        let total_count = total_count.max(items.len() as u64);
        Self {
            items,
            total_count,
            limit,
            page: page.max(1),
        }
    }

    #[must_use]
    pub fn empty(limit: u64, page: u64) -> Self {
        Self::new(Vec::new(), 0, limit, page)
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// `ceil(total_count / limit)`, 0 when unpaginated
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.limit)
    }

    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page > 1 && self.total_pages() >= self.page - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Render with each item turned into JSON by `item_to_json`
    pub fn to_json_with<F>(&self, item_to_json: F) -> JsonValue
    where
        F: Fn(&T) -> JsonValue,
    {
        let mut map = Map::new();
        map.insert(
            "items".to_string(),
            JsonValue::Array(self.items.iter().map(item_to_json).collect()),
        );
        map.insert("total_count".to_string(), self.total_count.into());
        map.insert("limit".to_string(), self.limit.into());
        map.insert("page".to_string(), self.page.into());
        map.insert("total_pages".to_string(), self.total_pages().into());
        map.insert("has_next_page".to_string(), self.has_next_page().into());
        map.insert(
            "has_previous_page".to_string(),
            self.has_previous_page().into(),
        );
        JsonValue::Object(map)
    }
}

impl<T: Entity> PaginatedResult<T> {
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        self.to_json_with(T::to_json)
    }
}

impl<T> IntoIterator for PaginatedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PaginatedResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(total_count: u64, limit: u64, page: u64) -> PaginatedResult<u64> {
        PaginatedResult::new(Vec::new(), total_count, limit, page)
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        for (total, limit, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (5, 2, 3)] {
            assert_eq!(page(total, limit, 1).total_pages(), expected, "{total}/{limit}");
        }
    }

    #[test]
    fn test_first_of_three_pages() {
        let result = PaginatedResult::new(vec![1, 2], 5, 2, 1);
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next_page());
        assert!(!result.has_previous_page());
    }

    #[test]
    fn test_last_page_has_previous_only() {
        let result = page(5, 2, 3);
        assert!(!result.has_next_page());
        assert!(result.has_previous_page());
    }

    #[test]
    fn test_previous_page_beyond_the_end() {
        // Page 4 of 3: page 3 still exists
        assert!(page(5, 2, 4).has_previous_page());
        // Page 6 of 3: page 5 does not
        assert!(!page(5, 2, 6).has_previous_page());
    }

    #[test]
    fn test_unpaginated_has_no_neighbours() {
        let result = PaginatedResult::new(vec![1, 2, 3], 3, 0, 2);
        assert_eq!(result.total_pages(), 0);
        assert!(!result.has_next_page());
        assert!(!result.has_previous_page());
    }

    #[test]
    fn test_total_count_never_below_item_count() {
        let result = PaginatedResult::new(vec![1, 2, 3], 1, 10, 0);
        assert_eq!(result.total_count(), 3);
        assert_eq!(result.page(), 1);
    }

    #[test]
    fn test_json_shape() {
        let result = PaginatedResult::new(vec![7_u64], 3, 1, 2);
        assert_eq!(
            result.to_json_with(|item| json!(item)),
            json!({
                "items": [7],
                "total_count": 3,
                "limit": 1,
                "page": 2,
                "total_pages": 3,
                "has_next_page": true,
                "has_previous_page": true,
            })
        );
    }
}
