use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, ExecResult, QueryResult, Statement, TransactionTrait,
};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info};

use super::statement::{Params, bind_named};
use crate::config::DatabaseConfig;
use crate::errors::Error;

/// A row returned by the driver
pub type Row = QueryResult;

/// Read an integer column as `i64`, widening 32-bit columns (`SERIAL`, `INT`)
pub(crate) fn get_i64(row: &Row, column: &str) -> Result<Option<i64>, DbErr> {
    match row.try_get::<Option<i64>>("", column) {
        Ok(value) => Ok(value),
        Err(err) => row
            .try_get::<Option<i32>>("", column)
            .map(|value| value.map(i64::from))
            .map_err(|_| err),
    }
}

/// What a mutating statement reported back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Driver-reported insert id; never populated on `PostgreSQL`
    pub last_insert_id: Option<i64>,
}

/// Last failure and last inserted identifier seen by one executor.
#[derive(Debug, Default)]
pub struct SessionState {
    last_error: Mutex<Option<String>>,
    last_insert_id: Mutex<Option<i64>>,
}

impl SessionState {
    pub(crate) fn record_error(&self, message: String) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(message);
        }
    }

    fn clear_error(&self) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = None;
        }
    }

    fn set_last_insert_id(&self, id: Option<i64>) {
        if let Ok(mut slot) = self.last_insert_id.lock() {
            *slot = id;
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id.lock().ok().and_then(|slot| *slot)
    }
}

/// Runs parameterized SQL against the store.
///
/// Implemented by [`Connection`] and [`Transaction`], so everything above this layer
/// works the same inside and outside a unit of work.
///
/// Two families of methods are provided on top of the driver plumbing:
///
/// - **strict** (`try_*`): return [`Error`] for malformed statements and driver failures
/// - **fail-soft** (`execute`, `query_one`, `query_all`, `insert`): log the failure with
///   its statement and bindings, remember it in [`Executor::last_error`], and return the
///   empty result (0 rows, no row, no id)
///
/// The entity layer only calls the fail-soft family. Callers that need to tell
/// "nothing matched" from "the query failed" check `last_error()` afterwards.
#[async_trait]
pub trait Executor: Send + Sync {
    fn backend(&self) -> DbBackend;

    fn session(&self) -> &SessionState;

    async fn run_execute(&self, statement: Statement) -> Result<ExecResult, DbErr>;

    async fn run_query_one(&self, statement: Statement) -> Result<Option<Row>, DbErr>;

    async fn run_query_all(&self, statement: Statement) -> Result<Vec<Row>, DbErr>;

    /// Open a unit of work. Inside a transaction this opens a savepoint.
    async fn begin(&self) -> Result<Transaction, Error>;

    async fn try_execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome, Error> {
        let statement = bind_named(self.backend(), sql, params)?;
        debug!(statement = %sql, params = ?params, "Executing statement");
        let result = self.run_execute(statement).await?;

        let last_insert_id = if matches!(self.backend(), DbBackend::Postgres) {
            None
        } else {
            i64::try_from(result.last_insert_id())
                .ok()
                .filter(|id| *id > 0)
        };

        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }

    async fn try_query_one(&self, sql: &str, params: &Params) -> Result<Option<Row>, Error> {
        let statement = bind_named(self.backend(), sql, params)?;
        debug!(statement = %sql, params = ?params, "Querying one row");
        Ok(self.run_query_one(statement).await?)
    }

    async fn try_query_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>, Error> {
        let statement = bind_named(self.backend(), sql, params)?;
        debug!(statement = %sql, params = ?params, "Querying rows");
        Ok(self.run_query_all(statement).await?)
    }

    /// Run an INSERT and return the identifier the store assigned.
    ///
    /// `PostgreSQL` has no driver-level insert id, so the statement gets `RETURNING id`.
    async fn try_insert(&self, sql: &str, params: &Params) -> Result<Option<i64>, Error> {
        if matches!(self.backend(), DbBackend::Postgres) {
            let returning = format!("{sql}\nRETURNING id");
            return match self.try_query_one(&returning, params).await? {
                Some(row) => Ok(get_i64(&row, "id")?),
                None => Ok(None),
            };
        }

        let outcome = self.try_execute(sql, params).await?;
        Ok(if outcome.rows_affected > 0 {
            outcome.last_insert_id
        } else {
            None
        })
    }

    /// Run an INSERT/UPDATE/DELETE, returning the affected row count (0 on failure)
    async fn execute(&self, sql: &str, params: &Params) -> u64 {
        match self.try_execute(sql, params).await {
            Ok(outcome) => {
                self.session().clear_error();
                outcome.rows_affected
            }
            Err(err) => {
                self.report_failure(sql, params, &err);
                0
            }
        }
    }

    async fn query_one(&self, sql: &str, params: &Params) -> Option<Row> {
        match self.try_query_one(sql, params).await {
            Ok(row) => {
                self.session().clear_error();
                row
            }
            Err(err) => {
                self.report_failure(sql, params, &err);
                None
            }
        }
    }

    async fn query_all(&self, sql: &str, params: &Params) -> Vec<Row> {
        match self.try_query_all(sql, params).await {
            Ok(rows) => {
                self.session().clear_error();
                rows
            }
            Err(err) => {
                self.report_failure(sql, params, &err);
                Vec::new()
            }
        }
    }

    async fn insert(&self, sql: &str, params: &Params) -> Option<i64> {
        match self.try_insert(sql, params).await {
            Ok(id) => {
                self.session().clear_error();
                self.session().set_last_insert_id(id);
                id
            }
            Err(err) => {
                self.report_failure(sql, params, &err);
                None
            }
        }
    }

    /// Identifier assigned by the most recent successful [`Executor::insert`]
    fn last_inserted_id(&self) -> Option<i64> {
        self.session().last_insert_id()
    }

    /// Message of the most recent failed statement, cleared by the next success
    fn last_error(&self) -> Option<String> {
        self.session().last_error()
    }

    fn report_failure(&self, sql: &str, params: &Params, err: &Error) {
        error!(statement = %sql, params = ?params, error = %err, "Statement failed");
        self.session().record_error(err.to_string());
    }
}

/// The process-wide database handle, owned by the application and passed down.
///
/// Clones share the driver pool but each starts with its own session state, so
/// `last_error()` and `last_inserted_id()` only reflect statements run through that
/// clone. Hand every task or request its own clone.
pub struct Connection {
    db: DatabaseConnection,
    session: SessionState,
}

impl Connection {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, Error> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(config.sqlx_logging);

        let db = Database::connect(options).await?;

        info!(
            "Database connected (pool: {}-{})",
            config.min_connections, config.max_connections
        );

        Ok(Self::from(db))
    }

    #[must_use]
    pub const fn inner(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self::from(self.db.clone())
    }
}

impl From<DatabaseConnection> for Connection {
    fn from(db: DatabaseConnection) -> Self {
        Self {
            db,
            session: SessionState::default(),
        }
    }
}

#[async_trait]
impl Executor for Connection {
    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    fn session(&self) -> &SessionState {
        &self.session
    }

    async fn run_execute(&self, statement: Statement) -> Result<ExecResult, DbErr> {
        self.db.execute(statement).await
    }

    async fn run_query_one(&self, statement: Statement) -> Result<Option<Row>, DbErr> {
        self.db.query_one(statement).await
    }

    async fn run_query_all(&self, statement: Statement) -> Result<Vec<Row>, DbErr> {
        self.db.query_all(statement).await
    }

    async fn begin(&self) -> Result<Transaction, Error> {
        Ok(Transaction::new(self.db.begin().await?))
    }
}

/// A unit of work. Dropping it without [`Transaction::commit`] rolls back.
pub struct Transaction {
    tx: DatabaseTransaction,
    session: SessionState,
}

impl Transaction {
    fn new(tx: DatabaseTransaction) -> Self {
        Self {
            tx,
            session: SessionState::default(),
        }
    }

    pub async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Executor for Transaction {
    fn backend(&self) -> DbBackend {
        self.tx.get_database_backend()
    }

    fn session(&self) -> &SessionState {
        &self.session
    }

    async fn run_execute(&self, statement: Statement) -> Result<ExecResult, DbErr> {
        self.tx.execute(statement).await
    }

    async fn run_query_one(&self, statement: Statement) -> Result<Option<Row>, DbErr> {
        self.tx.query_one(statement).await
    }

    async fn run_query_all(&self, statement: Statement) -> Result<Vec<Row>, DbErr> {
        self.tx.query_all(statement).await
    }

    async fn begin(&self) -> Result<Transaction, Error> {
        Ok(Transaction::new(self.tx.begin().await?))
    }
}

/// Roll back a unit of work that can no longer succeed, logging why.
pub async fn abandon(tx: Transaction, reason: &str) {
    debug!(reason, "Rolling back transaction");
    if let Err(err) = tx.rollback().await {
        error!(error = %err, reason, "Rollback failed");
    }
}
