//! # rowcrate
//!
//! Active-record entities over plain SQL: typed columns declared in a static schema,
//! dynamically built queries, forward/reverse free-text search and paginated results,
//! running on a Sea-ORM connection.
//!
//! ## Layers
//!
//! - [`database`]: the [`Connection`] handle, transactions and `:name` parameter binding
//! - [`filtering`]: query building, search and sort resolution
//! - [`entity`]: column typing, schemas, records and the [`Entity`] trait
//! - [`pagination`]: [`PaginatedResult`] page arithmetic
//! - [`operations`]: the [`CrudService`] request flow
//! - [`models`]: the `Project` and `Image` entities
//!
//! ## Error policy
//!
//! Reads and writes are fail-soft. A failed statement is logged and reads as "no row" or
//! "not saved"; [`Executor::last_error`] tells a failure apart from an empty result.
//!
//! ```rust,ignore
//! use rowcrate::{Config, Connection, Entity, Filters, models::Project};
//!
//! let config = Config::load(Path::new("rowcrate.toml"))?;
//! let conn = Connection::connect(&config.database).await?;
//!
//! let page = Project::get_by_params(&conn, &Filters::new().search("api project"), Some(10), Some(1)).await;
//! for project in page.items() {
//!     println!("{:?}", project.name());
//! }
//! ```

pub mod config;
pub mod database;
pub mod entity;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod operations;
pub mod pagination;
pub mod storage;
pub mod validation;

pub use config::{Config, DatabaseConfig, ImageConfig};
pub use database::{Connection, Executor, Params, Transaction};
pub use entity::{Column, ColumnKind, ColumnValue, Entity, Fetched, Record, RecordState, Schema};
pub use errors::Error;
pub use filtering::{Direction, Filters, Query, SearchBuilder, Where};
pub use operations::{CrudService, DefaultCrudService, Outcome, Request};
pub use pagination::PaginatedResult;
pub use storage::ImageStore;
pub use validation::{ValidationError, ValidationErrors};
