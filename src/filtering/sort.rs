use crate::entity::{Column, OrderKey, Schema};

const TIEBREAK_COLUMN: &str = "id";

/// Sort direction of an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse `ASC` / `DESC` in any case
    #[must_use]
    pub fn parse(order: &str) -> Option<Self> {
        match order.trim().to_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// A caller-requested ordering, still unvalidated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    pub column: String,
    pub direction: Option<Direction>,
}

impl SortRequest {
    pub fn new(column: impl Into<String>, direction: Option<Direction>) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// Resolve the ORDER BY terms for a list query on `schema`.
///
/// An unknown requested column falls back to the schema's default sort. A missing
/// direction takes the default direction when the default column is used and `ASC`
/// otherwise. `id ASC` is appended whenever the sort key is not `id`, so pages stay
/// disjoint when the sort key has duplicates.
#[must_use]
pub fn order_by<C: Column>(schema: &Schema<C>, requested: Option<&SortRequest>) -> Vec<String> {
    let (key, direction) = requested
        .and_then(|sort| {
            schema.order_key(&sort.column).map(|key| {
                let direction = sort.direction.unwrap_or(if key == schema.default_sort {
                    schema.default_direction
                } else {
                    Direction::Asc
                });
                (key, direction)
            })
        })
        .unwrap_or((schema.default_sort, schema.default_direction));

    let mut terms = vec![format!("{} {}", key.name(), direction.as_sql())];
    if key != OrderKey::Id {
        terms.push(format!("{TIEBREAK_COLUMN} {}", Direction::Asc.as_sql()));
    }
    terms
}
