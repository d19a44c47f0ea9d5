//! Query Building
//!
//! [`Query`] describes one statement against one table and renders it to SQL with
//! `:name` placeholders plus the matching [`Params`]. The execution helpers run it through
//! an [`Executor`] with the layer's fail-soft policy: a statement that cannot be built or
//! fails at the driver yields the empty result and is remembered in `last_error()`.
//!
//! ```rust,ignore
//! let (sql, params) = Query::select("projects")
//!     .filter(vec!["name = :name".to_string(), "colour = :colour".to_string()])
//!     .order_by(["date DESC", "id ASC"])
//!     .limit(10)
//!     .page(3)
//!     .build()?;
//! // SELECT *
//! // FROM projects
//! // WHERE name = :name
//! // 	AND colour = :colour
//! // ORDER BY date DESC, id ASC
//! // LIMIT 10 OFFSET 20
//! ```

use sea_orm::Value;
use tracing::error;

use crate::database::{Executor, Params, Row, get_i64};
use crate::errors::Error;

const COUNT_ALIAS: &str = "total_count";
const ID_PARAM: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Count => "COUNT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// The WHERE part of a query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Where {
    #[default]
    None,
    /// `id = :id`; also forces a limit of 1
    Id(i64),
    /// A single clause, used as-is
    Clause(String),
    /// Clauses ANDed together in order
    All(Vec<String>),
}

impl Where {
    fn clauses(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Id(_) => vec![format!("{ID_PARAM} = :{ID_PARAM}")],
            Self::Clause(clause) => vec![clause.clone()],
            Self::All(clauses) => clauses.clone(),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Clause(clause) => clause.trim().is_empty(),
            Self::All(clauses) => clauses.is_empty(),
            Self::Id(_) => false,
        }
    }
}

impl From<i64> for Where {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for Where {
    fn from(clause: &str) -> Self {
        Self::Clause(clause.to_string())
    }
}

impl From<String> for Where {
    fn from(clause: String) -> Self {
        Self::Clause(clause)
    }
}

impl From<Vec<String>> for Where {
    fn from(clauses: Vec<String>) -> Self {
        Self::All(clauses)
    }
}

/// One statement against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: QueryKind,
    table: String,
    columns: Vec<String>,
    filter: Where,
    params: Params,
    order_by: Vec<String>,
    limit: Option<u64>,
    page: Option<u64>,
}

impl Query {
    fn new(kind: QueryKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            columns: Vec::new(),
            filter: Where::None,
            params: Params::new(),
            order_by: Vec::new(),
            limit: None,
            page: None,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Select, table)
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Count, table)
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Update, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Delete, table)
    }

    /// Projection for SELECT, written columns for INSERT/UPDATE
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<Where>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Merge bindings into the parameter map
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn order_by<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = terms.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn where_clause(&self) -> &Where {
        &self.filter
    }

    /// The limit that will be applied: an id filter always means 1
    #[must_use]
    pub const fn effective_limit(&self) -> Option<u64> {
        match self.filter {
            Where::Id(_) => Some(1),
            _ => self.limit,
        }
    }

    /// True when the query yields at most one row
    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self.effective_limit(), Some(1))
    }

    /// 1-based page, pages below 1 count as the first
    #[must_use]
    pub fn page_number(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// `limit * (page - 1)`, 0 without a limit or for an id lookup
    #[must_use]
    pub fn offset(&self) -> u64 {
        if matches!(self.filter, Where::Id(_)) {
            return 0;
        }
        self.effective_limit()
            .map_or(0, |limit| limit.saturating_mul(self.page_number() - 1))
    }

    /// The COUNT counterpart of a SELECT: same table, WHERE and bindings
    #[must_use]
    pub fn as_count(&self) -> Self {
        Self {
            kind: QueryKind::Count,
            table: self.table.clone(),
            columns: Vec::new(),
            filter: self.filter.clone(),
            params: self.params.clone(),
            order_by: Vec::new(),
            limit: None,
            page: None,
        }
    }

    fn render_where(&self, params: &mut Params) -> Option<String> {
        if let Where::Id(id) = self.filter {
            params.insert(ID_PARAM.to_string(), Value::from(id));
        }
        if self.filter.is_none() {
            return None;
        }
        Some(format!("WHERE {}", self.filter.clauses().join("\n\tAND ")))
    }

    /// Render the statement text and the bindings it references
    pub fn build(&self) -> Result<(String, Params), Error> {
        let mut params = self.params.clone();
        let where_sql = self.render_where(&mut params);
        let mut parts: Vec<String> = Vec::new();

        match self.kind {
            QueryKind::Select => {
                let projection = if self.columns.is_empty() {
                    "*".to_string()
                } else {
                    self.columns.join(", ")
                };
                parts.push(format!("SELECT {projection}"));
                parts.push(format!("FROM {}", self.table));
                parts.extend(where_sql);
                if !self.order_by.is_empty() {
                    parts.push(format!("ORDER BY {}", self.order_by.join(", ")));
                }
                if let Some(limit) = self.effective_limit() {
                    let offset = self.offset();
                    if offset > 0 {
                        parts.push(format!("LIMIT {limit} OFFSET {offset}"));
                    } else {
                        parts.push(format!("LIMIT {limit}"));
                    }
                }
            }
            QueryKind::Count => {
                parts.push(format!("SELECT COUNT(*) AS {COUNT_ALIAS}"));
                parts.push(format!("FROM {}", self.table));
                parts.extend(where_sql);
            }
            QueryKind::Insert => {
                if self.columns.is_empty() {
                    return Err(Error::EmptyColumnSet(self.kind.keyword()));
                }
                let placeholders: Vec<String> =
                    self.columns.iter().map(|column| format!(":{column}")).collect();
                parts.push(format!(
                    "INSERT INTO {} ({})",
                    self.table,
                    self.columns.join(", ")
                ));
                parts.push(format!("VALUES ({})", placeholders.join(", ")));
            }
            QueryKind::Update => {
                if self.columns.is_empty() {
                    return Err(Error::EmptyColumnSet(self.kind.keyword()));
                }
                let Some(where_sql) = where_sql else {
                    return Err(Error::UnboundedStatement(self.kind.keyword()));
                };
                let assignments: Vec<String> = self
                    .columns
                    .iter()
                    .map(|column| format!("{column} = :{column}"))
                    .collect();
                parts.push(format!("UPDATE {}", self.table));
                parts.push(format!("SET {}", assignments.join(", ")));
                parts.push(where_sql);
            }
            QueryKind::Delete => {
                let Some(where_sql) = where_sql else {
                    return Err(Error::UnboundedStatement(self.kind.keyword()));
                };
                parts.push(format!("DELETE FROM {}", self.table));
                parts.push(where_sql);
            }
        }

        Ok((parts.join("\n"), params))
    }

    fn build_or_record(&self, db: &dyn Executor) -> Option<(String, Params)> {
        match self.build() {
            Ok(built) => Some(built),
            Err(err) => {
                error!(table = %self.table, kind = ?self.kind, error = %err, "Could not build query");
                db.session().record_error(err.to_string());
                None
            }
        }
    }

    /// First matching row, if any
    pub async fn fetch_one(&self, db: &dyn Executor) -> Option<Row> {
        let (sql, params) = self.build_or_record(db)?;
        db.query_one(&sql, &params).await
    }

    pub async fn fetch_all(&self, db: &dyn Executor) -> Vec<Row> {
        let Some((sql, params)) = self.build_or_record(db) else {
            return Vec::new();
        };
        db.query_all(&sql, &params).await
    }

    /// Rows matching the WHERE of this query, ignoring limit and page. 0 on failure.
    pub async fn fetch_count(&self, db: &dyn Executor) -> u64 {
        let counting = if self.kind == QueryKind::Count {
            self.clone()
        } else {
            self.as_count()
        };
        counting
            .fetch_one(db)
            .await
            .and_then(|row| get_i64(&row, COUNT_ALIAS).ok().flatten())
            .and_then(|total| u64::try_from(total).ok())
            .unwrap_or(0)
    }

    /// Run an INSERT, returning the new identifier when a row was written
    pub async fn run_insert(&self, db: &dyn Executor) -> Option<i64> {
        let (sql, params) = self.build_or_record(db)?;
        db.insert(&sql, &params).await
    }

    /// Run an UPDATE; true when at least one row was affected
    pub async fn run_update(&self, db: &dyn Executor) -> bool {
        self.run_statement(db).await > 0
    }

    /// Run a DELETE, returning the affected row count
    pub async fn run_delete(&self, db: &dyn Executor) -> u64 {
        self.run_statement(db).await
    }

    async fn run_statement(&self, db: &dyn Executor) -> u64 {
        let Some((sql, params)) = self.build_or_record(db) else {
            return 0;
        };
        db.execute(&sql, &params).await
    }
}
