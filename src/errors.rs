//! # Error Handling
//!
//! The data-access layer is fail-soft: entities and services report "no row" or
//! "not saved" instead of raising. [`Error`] is what the strict (`try_*`) APIs return
//! underneath that policy, and it is what gets logged when a fail-soft call swallows a
//! failure.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowcrate::{Error, Executor};
//!
//! match conn.try_query_all("SELECT * FROM projects", &Params::new()).await {
//!     Ok(rows) => println!("{} rows", rows.len()),
//!     Err(Error::Database(err)) => eprintln!("driver failed: {err}"),
//!     Err(other) => eprintln!("statement was malformed: {other}"),
//! }
//! ```

use sea_orm::DbErr;

/// Errors produced by statement construction, the database driver, configuration
/// loading and the image store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The driver rejected the statement or the connection failed
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// A `:name` placeholder had no binding in the parameter map
    #[error("statement references :{name} but no value was bound for it")]
    MissingParameter { name: String },

    /// UPDATE or DELETE without a WHERE clause
    #[error("refusing to run {0} without a WHERE clause")]
    UnboundedStatement(&'static str),

    /// INSERT or UPDATE with no columns to write
    #[error("{0} requires at least one column")]
    EmptyColumnSet(&'static str),

    /// The configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored file name would resolve outside the image directory
    #[error("invalid stored file name '{0}'")]
    InvalidFileName(String),
}

impl Error {
    /// True when the failure came from the driver rather than from building the statement
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
