use super::column::{Column, ColumnKind, ColumnValue};
use crate::filtering::sort::Direction;

/// Value a column takes when a record is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Null,
    Int(i64),
    Text(&'static str),
    EmptyList,
}

impl DefaultValue {
    #[must_use]
    pub fn to_value(self) -> ColumnValue {
        match self {
            Self::Null => ColumnValue::Null,
            Self::Int(value) => ColumnValue::Int(value),
            Self::Text(text) => ColumnValue::Text(text.to_string()),
            Self::EmptyList => ColumnValue::List(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef<C> {
    pub column: C,
    pub kind: ColumnKind,
    pub default: DefaultValue,
}

impl<C> ColumnDef<C> {
    pub const fn new(column: C, kind: ColumnKind, default: DefaultValue) -> Self {
        Self {
            column,
            kind,
            default,
        }
    }
}

/// A sort key: the identifier or one of the declared columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey<C> {
    Id,
    Column(C),
}

impl<C: Column> OrderKey<C> {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Column(column) => column.name(),
        }
    }
}

/// Static description of one entity type: its table, typed columns, search and sort rules.
///
/// Declared once per entity as a `static` and handed to every record of that type.
/// The `id` column is implicit and never listed in `columns`.
#[derive(Debug)]
pub struct Schema<C: 'static> {
    pub table: &'static str,
    pub columns: &'static [ColumnDef<C>],
    /// Columns matched by free-text search
    pub searchable: &'static [C],
    /// Columns that must be present and non-empty on create/update
    pub required: &'static [C],
    pub default_sort: OrderKey<C>,
    pub default_direction: Direction,
    /// Page size used when none is requested; also the largest page a list request gets
    pub default_limit: u64,
    /// Set on insert
    pub created_at: Option<C>,
    /// Set on insert and on every update
    pub updated_at: Option<C>,
}

impl<C: Column> Schema<C> {
    #[must_use]
    pub fn column(&self, column: C) -> Option<&ColumnDef<C>> {
        self.columns.iter().find(|def| def.column == column)
    }

    #[must_use]
    pub fn kind_of(&self, column: C) -> Option<ColumnKind> {
        self.column(column).map(|def| def.kind)
    }

    /// Look a declared column up by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ColumnDef<C>> {
        C::from_name(name).and_then(|column| self.column(column))
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|def| def.column.name()).collect()
    }

    #[must_use]
    pub fn searchable_names(&self) -> Vec<&'static str> {
        self.searchable.iter().map(|column| column.name()).collect()
    }

    /// Resolve a requested sort column: `id` or any declared column
    #[must_use]
    pub fn order_key(&self, name: &str) -> Option<OrderKey<C>> {
        if name == "id" {
            return Some(OrderKey::Id);
        }
        self.find(name).map(|def| OrderKey::Column(def.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::IntoStaticStr, strum::EnumString,
    )]
    #[strum(serialize_all = "snake_case")]
    enum NoteColumn {
        Title,
        PageCount,
        Archived,
    }

    static NOTES: Schema<NoteColumn> = Schema {
        table: "notes",
        columns: &[
            ColumnDef::new(NoteColumn::Title, ColumnKind::Text, DefaultValue::Null),
            ColumnDef::new(NoteColumn::PageCount, ColumnKind::Integer, DefaultValue::Int(1)),
        ],
        searchable: &[NoteColumn::Title],
        required: &[NoteColumn::Title],
        default_sort: OrderKey::Column(NoteColumn::Title),
        default_direction: Direction::Asc,
        default_limit: 20,
        created_at: None,
        updated_at: None,
    };

    #[test]
    fn test_find_by_name_only_matches_declared_columns() {
        assert_eq!(NOTES.find("page_count").map(|def| def.kind), Some(ColumnKind::Integer));
        // Archived is a valid column name but this schema does not declare it
        assert!(NOTES.find("archived").is_none());
        assert!(NOTES.find("nope").is_none());
        assert_eq!(NoteColumn::Archived.name(), "archived");
    }

    #[test]
    fn test_order_key_resolution() {
        assert_eq!(NOTES.order_key("id"), Some(OrderKey::Id));
        assert_eq!(NOTES.order_key("title"), Some(OrderKey::Column(NoteColumn::Title)));
        assert_eq!(NOTES.order_key("drop table"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(NOTES.column_names(), vec!["title", "page_count"]);
        assert_eq!(NOTES.searchable_names(), vec!["title"]);
        assert_eq!(DefaultValue::Int(1).to_value(), ColumnValue::Int(1));
    }
}
