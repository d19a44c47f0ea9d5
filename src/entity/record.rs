use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sea_orm::DbBackend;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use super::column::{Column, ColumnValue};
use super::schema::Schema;
use crate::database::{Params, Row, get_i64};
use crate::validation::{ValidationErrors, check_required};

static NULL: ColumnValue = ColumnValue::Null;

/// Where a record is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    /// Never persisted; defaults only or user-supplied values
    #[default]
    New,
    /// Identifier set: hydrated from a row or just saved
    Persisted,
    /// Row removed, identifier cleared
    Deleted,
    /// The last save failed, identifier cleared. Saving again starts over as an insert.
    SaveFailed,
}

/// Typed column values of one row, keyed by the entity's column enum.
///
/// Only columns the schema declares are ever stored. Every write goes through the
/// column's declared kind, so reads always see the coerced value.
#[derive(Debug, Clone)]
pub struct Record<C: Column> {
    schema: &'static Schema<C>,
    id: Option<i64>,
    values: BTreeMap<C, ColumnValue>,
    errors: ValidationErrors,
    state: RecordState,
}

impl<C: Column> Record<C> {
    /// An unsaved record holding the schema defaults
    #[must_use]
    pub fn new(schema: &'static Schema<C>) -> Self {
        let values = schema
            .columns
            .iter()
            .map(|def| (def.column, def.default.to_value()))
            .collect();
        Self {
            schema,
            id: None,
            values,
            errors: ValidationErrors::new(),
            state: RecordState::New,
        }
    }

    /// Build a record from a stored row. Columns missing from the row keep their defaults.
    #[must_use]
    pub fn hydrate(schema: &'static Schema<C>, row: &Row) -> Self {
        let mut record = Self::new(schema);
        for def in schema.columns {
            record
                .values
                .insert(def.column, def.kind.read(row, def.column.name()));
        }
        if let Ok(Some(id)) = get_i64(row, "id") {
            record.id = Some(id);
            record.state = RecordState::Persisted;
        }
        record
    }

    #[must_use]
    pub const fn schema(&self) -> &'static Schema<C> {
        self.schema
    }

    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> RecordState {
        self.state
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    #[must_use]
    pub fn get(&self, column: C) -> &ColumnValue {
        self.values.get(&column).unwrap_or(&NULL)
    }

    /// Coerce `value` to the column's kind and store it. Returns false for a column the
    /// schema does not declare.
    pub fn set(&mut self, column: C, value: impl Into<JsonValue>) -> bool {
        let Some(kind) = self.schema.kind_of(column) else {
            return false;
        };
        self.values.insert(column, kind.coerce(value.into()));
        true
    }

    /// Store an already typed value, still coerced to the declared kind
    pub fn set_value(&mut self, column: C, value: &ColumnValue) -> bool {
        self.set(column, value.to_json())
    }

    /// Assign by column name. Unknown names and `id` are ignored.
    pub fn assign(&mut self, name: &str, value: JsonValue) -> bool {
        if name == "id" {
            return false;
        }
        match C::from_name(name) {
            Some(column) => self.set(column, value),
            None => false,
        }
    }

    /// Assign every `(name, value)` pair, returning how many were accepted
    pub fn fill<I, K>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: AsRef<str>,
    {
        let mut accepted = 0;
        for (name, value) in values {
            if self.assign(name.as_ref(), value) {
                accepted += 1;
            }
        }
        accepted
    }

    #[must_use]
    pub fn text(&self, column: C) -> Option<&str> {
        self.get(column).as_text()
    }

    #[must_use]
    pub fn int(&self, column: C) -> Option<i64> {
        self.get(column).as_int()
    }

    #[must_use]
    pub fn list(&self, column: C) -> &[String] {
        self.get(column).as_list()
    }

    #[must_use]
    pub fn date(&self, column: C) -> Option<NaiveDate> {
        self.get(column).as_date()
    }

    #[must_use]
    pub fn datetime(&self, column: C) -> Option<DateTime<Utc>> {
        self.get(column).as_datetime()
    }

    /// Check the schema's required columns, replacing any earlier errors
    pub fn validate_required(&mut self) -> bool {
        let values: Vec<(&'static str, &ColumnValue)> = self
            .schema
            .required
            .iter()
            .map(|column| (column.name(), self.get(*column)))
            .collect();
        self.errors = check_required(values);
        self.errors.is_empty()
    }

    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Field name to message
    #[must_use]
    pub fn error_map(&self) -> BTreeMap<String, String> {
        self.errors.to_map()
    }

    /// Every declared column in its storage form for `backend`, keyed by column name
    #[must_use]
    pub fn storage_params(&self, backend: DbBackend) -> Params {
        self.schema
            .columns
            .iter()
            .map(|def| {
                (
                    def.column.name().to_string(),
                    self.get(def.column).to_storage(def.kind, backend),
                )
            })
            .collect()
    }

    /// `id` followed by every declared column in its JSON rendering
    #[must_use]
    pub fn to_json(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("id".to_string(), self.id.map_or(JsonValue::Null, JsonValue::from));
        for def in self.schema.columns {
            map.insert(def.column.name().to_string(), self.get(def.column).to_json());
        }
        map
    }

    /// Stamp the timestamp columns the schema declares
    pub fn touch(&mut self, now: DateTime<Utc>, creating: bool) {
        let now = ColumnValue::DateTime(now.trunc_subsecs(0));
        if creating && let Some(column) = self.schema.created_at {
            self.set_value(column, &now);
        }
        if let Some(column) = self.schema.updated_at {
            self.set_value(column, &now);
        }
    }

    pub(crate) fn mark_persisted(&mut self, id: i64) {
        self.id = Some(id);
        self.state = RecordState::Persisted;
    }

    pub(crate) fn mark_save_failed(&mut self) {
        self.id = None;
        self.state = RecordState::SaveFailed;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.id = None;
        self.state = RecordState::Deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ColumnDef, ColumnKind, DefaultValue, OrderKey};
    use crate::filtering::Direction;
    use chrono::TimeZone;
    use sea_orm::Value;
    use serde_json::json;

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::IntoStaticStr, strum::EnumString,
    )]
    #[strum(serialize_all = "snake_case")]
    enum TaskColumn {
        Title,
        Priority,
        Labels,
        DueOn,
        CreatedAt,
        UpdatedAt,
        Hidden,
    }

    static TASKS: Schema<TaskColumn> = Schema {
        table: "tasks",
        columns: &[
            ColumnDef::new(TaskColumn::Title, ColumnKind::Text, DefaultValue::Null),
            ColumnDef::new(TaskColumn::Priority, ColumnKind::Integer, DefaultValue::Int(3)),
            ColumnDef::new(TaskColumn::Labels, ColumnKind::List(','), DefaultValue::EmptyList),
            ColumnDef::new(TaskColumn::DueOn, ColumnKind::Date, DefaultValue::Null),
            ColumnDef::new(TaskColumn::CreatedAt, ColumnKind::DateTime, DefaultValue::Null),
            ColumnDef::new(TaskColumn::UpdatedAt, ColumnKind::DateTime, DefaultValue::Null),
        ],
        searchable: &[TaskColumn::Title],
        required: &[TaskColumn::Title, TaskColumn::DueOn],
        default_sort: OrderKey::Id,
        default_direction: Direction::Asc,
        default_limit: 10,
        created_at: Some(TaskColumn::CreatedAt),
        updated_at: Some(TaskColumn::UpdatedAt),
    };

    #[test]
    fn test_new_record_holds_defaults() {
        let record = Record::new(&TASKS);
        assert_eq!(record.state(), RecordState::New);
        assert_eq!(record.id(), None);
        assert_eq!(record.int(TaskColumn::Priority), Some(3));
        assert!(record.list(TaskColumn::Labels).is_empty());
        assert_eq!(record.get(TaskColumn::Title), &ColumnValue::Null);
    }

    #[test]
    fn test_writes_are_coerced() {
        let mut record = Record::new(&TASKS);
        assert!(record.set(TaskColumn::Priority, "7"));
        assert_eq!(record.int(TaskColumn::Priority), Some(7));

        assert!(record.assign("labels", json!("a,b")));
        assert_eq!(record.list(TaskColumn::Labels), ["a", "b"]);

        record.set_value(TaskColumn::Priority, &ColumnValue::Text("9".into()));
        assert_eq!(record.get(TaskColumn::Priority), &ColumnValue::Int(9));
    }

    #[test]
    fn test_undeclared_and_id_columns_are_ignored() {
        let mut record = Record::new(&TASKS);
        assert!(!record.set(TaskColumn::Hidden, "x"));
        assert!(!record.assign("id", json!(99)));
        assert!(!record.assign("nope", json!(1)));
        assert_eq!(record.get(TaskColumn::Hidden), &ColumnValue::Null);

        let accepted = record.fill([
            ("title", json!("Write docs")),
            ("id", json!(5)),
            ("bogus", json!(true)),
        ]);
        assert_eq!(accepted, 1);
        assert_eq!(record.id(), None);
        assert!(!record.to_json().contains_key("hidden"));
    }

    #[test]
    fn test_validate_required() {
        let mut record = Record::new(&TASKS);
        record.set(TaskColumn::Title, "  ");
        assert!(!record.validate_required());
        let errors = record.error_map();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("due_on"));

        record.set(TaskColumn::Title, "Ship");
        record.set(TaskColumn::DueOn, "2024-05-01");
        assert!(record.validate_required());
        assert!(!record.has_errors());
    }

    #[test]
    fn test_storage_and_json_forms() {
        let mut record = Record::new(&TASKS);
        record.set(TaskColumn::Labels, json!(["x", "y"]));
        record.set(TaskColumn::DueOn, "2024-05-01");

        let params = record.storage_params(DbBackend::Sqlite);
        assert_eq!(params["labels"], Value::from("x,y"));
        assert_eq!(params["due_on"], Value::from("2024-05-01"));
        assert_eq!(params["title"], Value::String(None));
        assert_eq!(params["priority"], Value::from(3_i64));
        assert!(!params.contains_key("id"));

        let json = JsonValue::Object(record.to_json());
        assert_eq!(json["id"], JsonValue::Null);
        assert_eq!(json["labels"], json!(["x", "y"]));
        assert_eq!(json["due_on"], json!("2024-05-01"));
    }

    #[test]
    fn test_touch_sets_timestamps() {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut record = Record::new(&TASKS);
        record.touch(created, true);
        assert_eq!(record.datetime(TaskColumn::CreatedAt), Some(created));
        assert_eq!(record.datetime(TaskColumn::UpdatedAt), Some(created));

        let later = Utc.with_ymd_and_hms(2024, 2, 2, 3, 4, 5).unwrap();
        record.touch(later, false);
        assert_eq!(record.datetime(TaskColumn::CreatedAt), Some(created));
        assert_eq!(record.datetime(TaskColumn::UpdatedAt), Some(later));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut record = Record::new(&TASKS);
        record.mark_persisted(4);
        assert_eq!(record.state(), RecordState::Persisted);
        assert!(record.is_persisted());

        record.mark_save_failed();
        assert_eq!(record.state(), RecordState::SaveFailed);
        assert_eq!(record.id(), None);

        record.mark_persisted(4);
        record.mark_deleted();
        assert_eq!(record.state(), RecordState::Deleted);
        assert_eq!(record.id(), None);
    }
}
