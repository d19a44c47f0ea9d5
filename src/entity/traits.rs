use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DbBackend, Value};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::column::Column;
use super::record::{Record, RecordState};
use super::schema::Schema;
use crate::database::{Executor, Params, Row};
use crate::filtering::sort::{SortRequest, order_by};
use crate::filtering::{Filters, Query, SearchBuilder, Where};
use crate::pagination::PaginatedResult;

/// What a `get` produced: a single lookup or a page
#[derive(Debug, Clone)]
pub enum Fetched<E> {
    One(Option<E>),
    Page(PaginatedResult<E>),
}

impl<E> Fetched<E> {
    /// The single entity, or the first item of a page
    #[must_use]
    pub fn into_one(self) -> Option<E> {
        match self {
            Self::One(entity) => entity,
            Self::Page(page) => page.into_items().into_iter().next(),
        }
    }

    #[must_use]
    pub fn into_items(self) -> Vec<E> {
        match self {
            Self::One(entity) => entity.into_iter().collect(),
            Self::Page(page) => page.into_items(),
        }
    }

    #[must_use]
    pub fn into_page(self) -> Option<PaginatedResult<E>> {
        match self {
            Self::One(_) => None,
            Self::Page(page) => Some(page),
        }
    }
}

/// Values accepted as an entity identifier. Anything that is not an integer is rejected.
pub trait IntoId {
    fn into_id(self) -> Option<i64>;
}

impl IntoId for i64 {
    fn into_id(self) -> Option<i64> {
        Some(self)
    }
}

impl IntoId for i32 {
    fn into_id(self) -> Option<i64> {
        Some(i64::from(self))
    }
}

impl IntoId for u32 {
    fn into_id(self) -> Option<i64> {
        Some(i64::from(self))
    }
}

impl IntoId for u64 {
    fn into_id(self) -> Option<i64> {
        i64::try_from(self).ok()
    }
}

impl IntoId for &str {
    fn into_id(self) -> Option<i64> {
        let trimmed = self.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        trimmed.parse().ok()
    }
}

impl IntoId for &String {
    fn into_id(self) -> Option<i64> {
        self.as_str().into_id()
    }
}

impl IntoId for String {
    fn into_id(self) -> Option<i64> {
        self.as_str().into_id()
    }
}

impl IntoId for &JsonValue {
    fn into_id(self) -> Option<i64> {
        match self {
            JsonValue::Number(number) => number.as_i64(),
            JsonValue::String(text) => text.as_str().into_id(),
            _ => None,
        }
    }
}

/// An active record over one table.
///
/// Implementors hold a [`Record`] and point at their static [`Schema`]; everything else
/// is provided. Reads and writes are fail-soft: a failed query reads as "not found" and
/// a failed write returns false. The executor's `last_error()` tells the two apart.
///
/// ```rust,ignore
/// let mut project = Project::from_values([("name", json!("Foo")), ("date", json!("2024-01-01"))]);
/// if project.save(&conn).await {
///     let loaded = Project::get_by_id(&conn, project.id().unwrap()).await;
/// }
/// ```
#[async_trait]
pub trait Entity: Sized + Send + Sync {
    type Column: Column;

    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    fn schema() -> &'static Schema<Self::Column>;

    fn from_record(record: Record<Self::Column>) -> Self;

    fn record(&self) -> &Record<Self::Column>;

    fn record_mut(&mut self) -> &mut Record<Self::Column>;

    /// An unsaved entity holding the schema defaults
    #[must_use]
    fn new() -> Self {
        Self::from_record(Record::new(Self::schema()))
    }

    /// An unsaved entity built from `(column name, value)` pairs; unknown names are ignored
    fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: AsRef<str>,
    {
        let mut entity = Self::new();
        entity.record_mut().fill(values);
        entity
    }

    fn hydrate(row: &Row) -> Self {
        Self::from_record(Record::hydrate(Self::schema(), row))
    }

    fn id(&self) -> Option<i64> {
        self.record().id()
    }

    fn state(&self) -> RecordState {
        self.record().state()
    }

    /// Flat column name to JSON value mapping, `id` included
    fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.record().to_json())
    }

    /// Run a read against the table.
    ///
    /// An id filter or a limit of 1 gives [`Fetched::One`]; anything else gives a page
    /// ordered by the schema default plus the `id` tiebreak.
    async fn get(
        db: &dyn Executor,
        filter: Where,
        params: Params,
        limit: Option<u64>,
        page: Option<u64>,
    ) -> Fetched<Self> {
        let query = select_query(Self::schema(), filter, params, None, limit, page);
        if query.is_single() {
            return Fetched::One(query.fetch_one(db).await.map(|row| Self::hydrate(&row)));
        }
        Fetched::Page(Self::fetch_page(db, query).await)
    }

    /// Rows and total count for a SELECT built by this entity
    async fn fetch_page(db: &dyn Executor, query: Query) -> PaginatedResult<Self> {
        let rows = query.fetch_all(db).await;
        let items: Vec<Self> = rows.iter().map(Self::hydrate).collect();
        let limit = query.effective_limit().unwrap_or(0);
        let total_count = if limit == 0 {
            items.len() as u64
        } else {
            query.fetch_count(db).await
        };
        PaginatedResult::new(items, total_count, limit, query.page_number())
    }

    /// Load by identifier. Non-numeric identifiers are rejected without querying.
    async fn get_by_id<I>(db: &dyn Executor, id: I) -> Option<Self>
    where
        I: IntoId + Send,
    {
        let Some(id) = id.into_id() else {
            warn!(
                resource = Self::RESOURCE_NAME_SINGULAR,
                "Rejected non-numeric identifier"
            );
            return None;
        };
        Self::get(db, Where::Id(id), Params::new(), Some(1), None)
            .await
            .into_one()
    }

    /// `column = :column`, with the value coerced to the column's kind
    async fn get_by_column(
        db: &dyn Executor,
        column: Self::Column,
        value: JsonValue,
        limit: Option<u64>,
        page: Option<u64>,
    ) -> Fetched<Self> {
        let schema = Self::schema();
        let name = column.name();
        let stored = schema
            .kind_of(column)
            .map_or(Value::String(None), |kind| {
                kind.coerce(value).to_storage(kind, db.backend())
            });

        let mut params = Params::new();
        params.insert(name.to_string(), stored);
        Self::get(db, Where::Clause(format!("{name} = :{name}")), params, limit, page).await
    }

    /// Paged list filtered by free-text search and exact column matches.
    ///
    /// Search and filters only apply when the schema declares searchable columns.
    async fn get_by_params(
        db: &dyn Executor,
        filters: &Filters,
        limit: Option<u64>,
        page: Option<u64>,
    ) -> PaginatedResult<Self> {
        let schema = Self::schema();
        let (filter, params) = if schema.searchable.is_empty() {
            (Where::None, Params::new())
        } else {
            let mut search =
                SearchBuilder::new(schema.searchable_names()).phrase(filters.search.as_deref());
            for (name, raw) in &filters.exact {
                if let Some((column, value)) = resolve_filter(schema, db.backend(), name, raw) {
                    search = search.filter(column, value);
                }
            }
            search.build().into_where()
        };

        let query = select_query(schema, filter, params, filters.sort.as_ref(), limit, page);
        Self::fetch_page(db, query).await
    }

    /// INSERT when never persisted, UPDATE otherwise. On failure the identifier is cleared.
    async fn save(&mut self, db: &dyn Executor) -> bool {
        let schema = Self::schema();
        let creating = self.id().is_none();
        self.record_mut().touch(Utc::now(), creating);

        let params = self.record().storage_params(db.backend());
        let saved = match self.id() {
            None => {
                let insert = Query::insert(schema.table)
                    .columns(schema.column_names())
                    .params(params);
                match insert.run_insert(db).await {
                    Some(id) => {
                        self.record_mut().mark_persisted(id);
                        true
                    }
                    None => false,
                }
            }
            Some(id) => {
                Query::update(schema.table)
                    .columns(schema.column_names())
                    .params(params)
                    .filter(id)
                    .run_update(db)
                    .await
            }
        };

        if !saved {
            warn!(
                resource = Self::RESOURCE_NAME_SINGULAR,
                error = ?db.last_error(),
                "Save failed"
            );
            self.record_mut().mark_save_failed();
        }
        saved
    }

    /// Remove the row. Only a persisted entity can be deleted.
    async fn delete(&mut self, db: &dyn Executor) -> bool {
        let Some(id) = self.id() else {
            debug!(
                resource = Self::RESOURCE_NAME_SINGULAR,
                "Delete skipped: entity was never persisted"
            );
            return false;
        };

        let removed = Query::delete(Self::schema().table)
            .filter(id)
            .run_delete(db)
            .await;
        if removed > 0 {
            self.record_mut().mark_deleted();
            true
        } else {
            false
        }
    }
}

/// A limit of 0 means unpaginated, the same as no limit
fn select_query<C: Column>(
    schema: &Schema<C>,
    filter: Where,
    params: Params,
    sort: Option<&SortRequest>,
    limit: Option<u64>,
    page: Option<u64>,
) -> Query {
    let mut query = Query::select(schema.table)
        .filter(filter)
        .params(params)
        .order_by(order_by(schema, sort));
    if let Some(limit) = limit.filter(|limit| *limit > 0) {
        query = query.limit(limit);
    }
    if let Some(page) = page {
        query = query.page(page);
    }
    query
}

/// Turn one raw filter into a typed binding. Empty values and undeclared names are
/// skipped, as are values that do not coerce to the column's kind.
fn resolve_filter<C: Column>(
    schema: &Schema<C>,
    backend: DbBackend,
    name: &str,
    raw: &str,
) -> Option<(&'static str, Value)> {
    if raw.trim().is_empty() {
        return None;
    }
    if name == "id" {
        return raw.into_id().map(|id| ("id", Value::from(id)));
    }

    let def = schema.find(name)?;
    let value = def.kind.coerce(JsonValue::String(raw.to_string()));
    if value.is_blank() {
        debug!(column = name, raw, "Ignoring filter that does not fit the column");
        return None;
    }
    Some((def.column.name(), value.to_storage(def.kind, backend)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ColumnDef, ColumnKind, DefaultValue, OrderKey};
    use crate::filtering::Direction;

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::IntoStaticStr, strum::EnumString,
    )]
    #[strum(serialize_all = "snake_case")]
    enum EventColumn {
        Title,
        Seats,
        Tags,
    }

    static EVENTS: Schema<EventColumn> = Schema {
        table: "events",
        columns: &[
            ColumnDef::new(EventColumn::Title, ColumnKind::Text, DefaultValue::Null),
            ColumnDef::new(EventColumn::Seats, ColumnKind::Integer, DefaultValue::Null),
            ColumnDef::new(EventColumn::Tags, ColumnKind::List(','), DefaultValue::EmptyList),
        ],
        searchable: &[EventColumn::Title],
        required: &[],
        default_sort: OrderKey::Column(EventColumn::Title),
        default_direction: Direction::Desc,
        default_limit: 10,
        created_at: None,
        updated_at: None,
    };

    #[test]
    fn test_into_id_rejects_non_numeric() {
        assert_eq!("42".into_id(), Some(42));
        assert_eq!(" 7 ".into_id(), Some(7));
        assert_eq!("4a".into_id(), None);
        assert_eq!("-1".into_id(), None);
        assert_eq!("".into_id(), None);
        assert_eq!("1.5".into_id(), None);
        assert_eq!((&serde_json::json!(9)).into_id(), Some(9));
        assert_eq!((&serde_json::json!(true)).into_id(), None);
        assert_eq!(u64::MAX.into_id(), None);
    }

    #[test]
    fn test_resolve_filter_types_values() {
        assert_eq!(
            resolve_filter(&EVENTS, DbBackend::Sqlite, "seats", "12"),
            Some(("seats", Value::from(12_i64)))
        );
        assert_eq!(
            resolve_filter(&EVENTS, DbBackend::Sqlite, "tags", "a, b"),
            Some(("tags", Value::from("a,b")))
        );
        assert_eq!(resolve_filter(&EVENTS, DbBackend::Sqlite, "id", "3"), Some(("id", Value::from(3_i64))));
    }

    #[test]
    fn test_resolve_filter_skips_unusable_values() {
        assert_eq!(resolve_filter(&EVENTS, DbBackend::Sqlite, "seats", "many"), None);
        assert_eq!(resolve_filter(&EVENTS, DbBackend::Sqlite, "title", "   "), None);
        assert_eq!(resolve_filter(&EVENTS, DbBackend::Sqlite, "venue", "hall"), None);
        assert_eq!(resolve_filter(&EVENTS, DbBackend::Sqlite, "id", "x"), None);
    }

    #[test]
    fn test_select_query_orders_and_pages() {
        let query = select_query(&EVENTS, Where::None, Params::new(), None, Some(5), Some(2));
        let (sql, _) = query.build().unwrap();
        assert_eq!(
            sql,
            "SELECT *\nFROM events\nORDER BY title DESC, id ASC\nLIMIT 5 OFFSET 5"
        );
    }

    #[test]
    fn test_zero_limit_is_unpaginated() {
        let query = select_query(&EVENTS, Where::None, Params::new(), None, Some(0), Some(3));
        assert_eq!(query.effective_limit(), None);
        assert!(!query.is_single());
        let (sql, _) = query.build().unwrap();
        assert_eq!(sql, "SELECT *\nFROM events\nORDER BY title DESC, id ASC");
    }

    #[test]
    fn test_fetched_accessors() {
        let one: Fetched<u8> = Fetched::One(Some(1));
        assert_eq!(one.clone().into_items(), vec![1]);
        assert!(one.into_page().is_none());

        let page = Fetched::Page(PaginatedResult::new(vec![4_u8, 5], 2, 2, 1));
        assert_eq!(page.into_one(), Some(4));
    }
}
