use sea_orm::{DbBackend, Statement, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::errors::Error;

/// Named statement parameters, keyed without the leading colon
pub type Params = BTreeMap<String, Value>;

/// Turn a statement written with `:name` placeholders into a driver statement.
///
/// Each placeholder occurrence becomes a positional parameter (`?` on `SQLite`/`MySQL`,
/// `$n` on `PostgreSQL`) bound to the value stored under its name, so a name can be used
/// more than once. Quoted literals and `::` casts pass through untouched.
pub fn bind_named(backend: DbBackend, sql: &str, params: &Params) -> Result<Statement, Error> {
    let (text, values) = rewrite_placeholders(backend, sql, params)?;
    Ok(Statement::from_sql_and_values(backend, text, values))
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn rewrite_placeholders(
    backend: DbBackend,
    sql: &str,
    params: &Params,
) -> Result<(String, Vec<Value>), Error> {
    let chars: Vec<char> = sql.chars().collect();
    let mut text = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(open) = quote {
            text.push(c);
            if c == open {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                text.push(c);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                text.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).copied().is_some_and(is_name_start) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params
                    .get(&name)
                    .ok_or_else(|| Error::MissingParameter { name: name.clone() })?;
                values.push(value.clone());

                if matches!(backend, DbBackend::Postgres) {
                    let _ = write!(text, "${}", values.len());
                } else {
                    text.push('?');
                }
                i = end;
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    Ok((text, values))
}
