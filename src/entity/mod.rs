//! # Entities
//!
//! The active-record layer: typed columns, per-entity schema descriptors, the record
//! store that holds one row's values, and the [`Entity`] trait that loads, saves and
//! deletes it.
//!
//! ## Declaring an entity
//!
//! ```rust,ignore
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntoStaticStr, EnumString)]
//! #[strum(serialize_all = "snake_case")]
//! pub enum NoteColumn { Title, Tags }
//!
//! static NOTE_SCHEMA: Schema<NoteColumn> = Schema {
//!     table: "notes",
//!     columns: &[
//!         ColumnDef::new(NoteColumn::Title, ColumnKind::Text, DefaultValue::Null),
//!         ColumnDef::new(NoteColumn::Tags, ColumnKind::List(','), DefaultValue::EmptyList),
//!     ],
//!     searchable: &[NoteColumn::Title, NoteColumn::Tags],
//!     required: &[NoteColumn::Title],
//!     default_sort: OrderKey::Id,
//!     default_direction: Direction::Desc,
//!     default_limit: 25,
//!     created_at: None,
//!     updated_at: None,
//! };
//!
//! pub struct Note { record: Record<NoteColumn> }
//!
//! impl Entity for Note {
//!     type Column = NoteColumn;
//!     const RESOURCE_NAME_SINGULAR: &'static str = "note";
//!     const RESOURCE_NAME_PLURAL: &'static str = "notes";
//!     fn schema() -> &'static Schema<NoteColumn> { &NOTE_SCHEMA }
//!     fn from_record(record: Record<NoteColumn>) -> Self { Self { record } }
//!     fn record(&self) -> &Record<NoteColumn> { &self.record }
//!     fn record_mut(&mut self) -> &mut Record<NoteColumn> { &mut self.record }
//! }
//! ```

pub mod column;
pub mod record;
pub mod schema;
pub mod traits;

pub use column::{Column, ColumnKind, ColumnValue, DATE_FORMAT, DATETIME_FORMAT};
pub use record::{Record, RecordState};
pub use schema::{ColumnDef, DefaultValue, OrderKey, Schema};
pub use traits::{Entity, Fetched, IntoId};
