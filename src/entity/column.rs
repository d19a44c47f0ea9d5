//! Column names, declared column kinds and the coercions applied on every write.
//!
//! Values enter a record through [`ColumnKind::coerce`] and leave it in one of two
//! shapes: [`ColumnValue::to_storage`] for the driver and [`ColumnValue::to_json`] for
//! the response layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use sea_orm::{DbBackend, Value};
use serde_json::Value as JsonValue;
use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;
use tracing::warn;

use crate::database::{Row, get_i64};

/// Storage and rendering format of date columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format of datetime columns (always UTC)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_ZONE: &str = "UTC";

/// Separator used by list columns unless a schema picks another
pub const DEFAULT_LIST_SEPARATOR: char = ',';

/// A compile-time checked column name.
///
/// Implemented automatically for enums deriving `strum::IntoStaticStr` and
/// `strum::EnumString`:
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntoStaticStr, EnumString)]
/// #[strum(serialize_all = "snake_case")]
/// pub enum ProjectColumn { Name, ShortDescription, Tags }
/// ```
pub trait Column: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self>;
}

impl<T> Column for T
where
    T: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static + Into<&'static str> + FromStr,
{
    fn name(self) -> &'static str {
        self.into()
    }

    fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// How a column is typed in memory and at the storage boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    DateTime,
    /// A list of strings stored joined by the separator
    List(char),
}

/// A typed column value held by a record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnValue {
    #[default]
    Null,
    Int(i64),
    Text(String),
    List(Vec<String>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl ColumnValue {
    /// Null, whitespace-only text or an empty list
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Int(_) | Self::Date(_) | Self::DateTime(_) => false,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The list items, empty for anything that is not a list
    #[must_use]
    pub fn as_list(&self) -> &[String] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(at) => Some(*at),
            _ => None,
        }
    }

    /// The value handed to the driver for a column of `kind`.
    ///
    /// `SQLite` has no date types, so dates and datetimes go in as text in the fixed
    /// formats. The other backends get typed chrono values.
    #[must_use]
    pub fn to_storage(&self, kind: ColumnKind, backend: DbBackend) -> Value {
        let textual = matches!(backend, DbBackend::Sqlite);
        match self {
            Self::Null => match kind {
                ColumnKind::Integer => Value::BigInt(None),
                ColumnKind::Date if !textual => Value::ChronoDate(None),
                ColumnKind::DateTime if !textual => Value::ChronoDateTimeUtc(None),
                _ => Value::String(None),
            },
            Self::Int(value) => Value::from(*value),
            Self::Text(text) => Value::from(text.clone()),
            Self::List(items) => {
                let separator = match kind {
                    ColumnKind::List(separator) => separator,
                    _ => DEFAULT_LIST_SEPARATOR,
                };
                Value::from(items.join(&separator.to_string()))
            }
            Self::Date(date) if textual => Value::from(date.format(DATE_FORMAT).to_string()),
            Self::Date(date) => Value::from(*date),
            Self::DateTime(at) if textual => Value::from(at.format(DATETIME_FORMAT).to_string()),
            Self::DateTime(at) => Value::from(*at),
        }
    }

    /// JSON-compatible rendering: lists as arrays, dates and datetimes as fixed-format strings
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Int(value) => JsonValue::from(*value),
            Self::Text(text) => JsonValue::from(text.clone()),
            Self::List(items) => JsonValue::from(items.clone()),
            Self::Date(date) => JsonValue::from(date.format(DATE_FORMAT).to_string()),
            Self::DateTime(at) => {
                JsonValue::from(format!("{} {DATETIME_ZONE}", at.format(DATETIME_FORMAT)))
            }
        }
    }
}

impl ColumnKind {
    /// Coerce an incoming value to this kind. Values that cannot be coerced become NULL.
    #[must_use]
    pub fn coerce(self, input: JsonValue) -> ColumnValue {
        if input.is_null() {
            return ColumnValue::Null;
        }

        match self {
            Self::Text => match input {
                JsonValue::String(text) => ColumnValue::Text(text),
                other => ColumnValue::Text(other.to_string()),
            },
            Self::Integer => coerce_int(&input).map_or(ColumnValue::Null, ColumnValue::Int),
            Self::List(separator) => match input {
                JsonValue::Array(items) => ColumnValue::List(normalize_items(
                    items.iter().filter_map(scalar_to_string),
                )),
                JsonValue::String(text) => ColumnValue::List(split_list(&text, separator)),
                other => ColumnValue::List(normalize_items(scalar_to_string(&other))),
            },
            Self::Date => input
                .as_str()
                .and_then(parse_date)
                .map_or(ColumnValue::Null, ColumnValue::Date),
            Self::DateTime => match &input {
                JsonValue::String(text) => {
                    parse_datetime(text).map_or(ColumnValue::Null, ColumnValue::DateTime)
                }
                JsonValue::Number(number) => number
                    .as_i64()
                    .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                    .map_or(ColumnValue::Null, ColumnValue::DateTime),
                _ => ColumnValue::Null,
            },
        }
    }

    /// Parse the textual storage form of this kind
    #[must_use]
    pub fn from_stored(self, stored: &str) -> ColumnValue {
        match self {
            Self::Text => ColumnValue::Text(stored.to_string()),
            _ => self.coerce(JsonValue::String(stored.to_string())),
        }
    }

    /// Read `column` from a driver row, decoding by kind.
    ///
    /// Native integer and chrono decodings are tried first; text is the fallback and
    /// goes through the same parsing as incoming values.
    pub(crate) fn read(self, row: &Row, column: &str) -> ColumnValue {
        if let Some(value) = self.read_native(row, column) {
            return value;
        }

        match row.try_get::<Option<String>>("", column) {
            Ok(Some(stored)) => self.from_stored(&stored),
            Ok(None) => ColumnValue::Null,
            Err(text_err) => match get_i64(row, column) {
                Ok(Some(number)) => self.from_stored(&number.to_string()),
                Ok(None) => ColumnValue::Null,
                Err(_) => {
                    warn!(column, error = %text_err, "Could not decode column, treating as NULL");
                    ColumnValue::Null
                }
            },
        }
    }

    fn read_native(self, row: &Row, column: &str) -> Option<ColumnValue> {
        match self {
            Self::Integer => get_i64(row, column)
                .ok()
                .map(|value| value.map_or(ColumnValue::Null, ColumnValue::Int)),
            Self::Date => row
                .try_get::<Option<NaiveDate>>("", column)
                .ok()
                .map(|value| value.map_or(ColumnValue::Null, ColumnValue::Date)),
            Self::DateTime => row
                .try_get::<Option<DateTime<Utc>>>("", column)
                .ok()
                .or_else(|| {
                    row.try_get::<Option<NaiveDateTime>>("", column)
                        .ok()
                        .map(|value| value.map(|naive| naive.and_utc()))
                })
                .map(|value| {
                    value.map_or(ColumnValue::Null, |at| ColumnValue::DateTime(at.trunc_subsecs(0)))
                }),
            Self::Text | Self::List(_) => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_float(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

fn coerce_int(input: &JsonValue) -> Option<i64> {
    match input {
        JsonValue::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(truncate_float)),
        JsonValue::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate_float))
        }
        JsonValue::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    }
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Trimmed, non-empty items: the shape a list has after a storage round trip
fn normalize_items<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn split_list(stored: &str, separator: char) -> Vec<String> {
    normalize_items(stored.split(separator).map(String::from))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(text).map(|at| at.date_naive()))
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let text = text.strip_suffix(DATETIME_ZONE).map_or(text, str::trim_end);

    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|at| at.with_timezone(&Utc)))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .map(|at| at.trunc_subsecs(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_coercion_reads_back_as_int() {
        let kind = ColumnKind::Integer;
        assert_eq!(kind.coerce(json!(42)), ColumnValue::Int(42));
        assert_eq!(kind.coerce(json!("42")), ColumnValue::Int(42));
        assert_eq!(kind.coerce(json!(" 17 ")), ColumnValue::Int(17));
        assert_eq!(kind.coerce(json!(3.9)), ColumnValue::Int(3));
        assert_eq!(kind.coerce(json!("-2.5")), ColumnValue::Int(-2));
        assert_eq!(kind.coerce(json!(true)), ColumnValue::Int(1));
    }

    #[test]
    fn test_uncoercible_integers_become_null() {
        let kind = ColumnKind::Integer;
        assert_eq!(kind.coerce(json!("abc")), ColumnValue::Null);
        assert_eq!(kind.coerce(json!("")), ColumnValue::Null);
        assert_eq!(kind.coerce(json!([1, 2])), ColumnValue::Null);
        assert_eq!(kind.coerce(JsonValue::Null), ColumnValue::Null);
    }

    #[test]
    fn test_list_coercion_from_array_and_string() {
        let kind = ColumnKind::List(',');
        assert_eq!(
            kind.coerce(json!(["x", "y"])),
            ColumnValue::List(vec!["x".into(), "y".into()])
        );
        assert_eq!(
            kind.coerce(json!("rust, sql,,api")),
            ColumnValue::List(vec!["rust".into(), "sql".into(), "api".into()])
        );
        assert_eq!(kind.coerce(json!("")), ColumnValue::List(vec![]));
    }

    #[test]
    fn test_array_items_are_normalized_like_stored_text() {
        let kind = ColumnKind::List(',');
        let from_array = kind.coerce(json!([" x", "", "y ", 3]));
        assert_eq!(
            from_array,
            ColumnValue::List(vec!["x".into(), "y".into(), "3".into()])
        );

        let stored = from_array.to_storage(kind, DbBackend::Sqlite);
        let Value::String(Some(text)) = stored else {
            panic!("list columns are stored as text");
        };
        assert_eq!(kind.from_stored(&text), from_array);
    }

    #[test]
    fn test_typed_backends_get_chrono_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let at = date.and_hms_opt(14, 5, 0).unwrap().and_utc();

        for backend in [DbBackend::Postgres, DbBackend::MySql] {
            assert_eq!(
                ColumnValue::Date(date).to_storage(ColumnKind::Date, backend),
                Value::from(date)
            );
            assert_eq!(
                ColumnValue::DateTime(at).to_storage(ColumnKind::DateTime, backend),
                Value::from(at)
            );
            assert_eq!(
                ColumnValue::Null.to_storage(ColumnKind::Date, backend),
                Value::ChronoDate(None)
            );
            assert_eq!(
                ColumnValue::Null.to_storage(ColumnKind::DateTime, backend),
                Value::ChronoDateTimeUtc(None)
            );
            // Lists stay text everywhere
            assert_eq!(
                ColumnValue::List(vec!["a".into()]).to_storage(ColumnKind::List(','), backend),
                Value::from("a")
            );
        }

        assert_eq!(
            ColumnValue::Date(date).to_storage(ColumnKind::Date, DbBackend::Sqlite),
            Value::from("2024-03-09")
        );
    }

    #[test]
    fn test_list_storage_joins_on_separator() {
        let value = ColumnValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(value.to_storage(ColumnKind::List('|'), DbBackend::Sqlite), Value::from("a|b"));
        assert_eq!(value.to_json(), json!(["a", "b"]));
        assert_eq!(
            ColumnKind::List('|').from_stored("a|b"),
            ColumnValue::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_date_formats() {
        let value = ColumnKind::Date.coerce(json!("2024-03-09"));
        assert_eq!(value.to_json(), json!("2024-03-09"));
        assert_eq!(value.to_storage(ColumnKind::Date, DbBackend::Sqlite), Value::from("2024-03-09"));
        assert_eq!(ColumnKind::Date.coerce(json!("09/03/2024")), ColumnValue::Null);
    }

    #[test]
    fn test_datetime_formats() {
        let value = ColumnKind::DateTime.coerce(json!("2024-03-09 14:05:00"));
        assert_eq!(value.to_json(), json!("2024-03-09 14:05:00 UTC"));
        assert_eq!(
            value.to_storage(ColumnKind::DateTime, DbBackend::Sqlite),
            Value::from("2024-03-09 14:05:00")
        );

        // The rendered form is accepted back
        assert_eq!(ColumnKind::DateTime.coerce(value.to_json()), value);
        assert_eq!(
            ColumnKind::DateTime.coerce(json!("2024-03-09T14:05:00Z")),
            value
        );
    }

    #[test]
    fn test_null_storage_is_typed_by_kind() {
        assert_eq!(
            ColumnValue::Null.to_storage(ColumnKind::Integer, DbBackend::Sqlite),
            Value::BigInt(None)
        );
        assert_eq!(
            ColumnValue::Null.to_storage(ColumnKind::Text, DbBackend::Sqlite),
            Value::String(None)
        );
    }

    #[test]
    fn test_blank_values() {
        assert!(ColumnValue::Null.is_blank());
        assert!(ColumnValue::Text("  ".into()).is_blank());
        assert!(ColumnValue::List(vec![]).is_blank());
        assert!(!ColumnValue::Int(0).is_blank());
        assert!(!ColumnValue::Text("x".into()).is_blank());
    }
}
