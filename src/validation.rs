//! Required-field validation
//!
//! Field-level validation errors attached to a record when a create or update is
//! rejected. The service layer reports these distinctly from "not found".
//!
//! ```rust,ignore
//! use rowcrate::validation::{ValidationError, ValidationErrors};
//!
//! let mut errors = ValidationErrors::new();
//! errors.add(ValidationError::new("name", "This field is required"));
//! assert_eq!(errors.to_map()["name"], "This field is required");
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::entity::ColumnValue;

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Column name as the caller sent it
    pub field: String,
    /// Message shown next to the field
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Every field rejected by one validation pass, in check order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Field name to message; the first message wins when a field failed twice
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_insert_with(|| error.message.clone());
        }
        map
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) rejected:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Helper validators for column values
pub mod validators {
    use super::ValidationError;
    use crate::entity::ColumnValue;

    /// Validate value is present and not empty
    pub fn validate_required(field: &str, value: &ColumnValue) -> Result<(), ValidationError> {
        if value.is_blank() {
            return Err(ValidationError::new(field, "This field is required"));
        }
        Ok(())
    }
}

/// Run the required-column check over `(name, value)` pairs
pub fn check_required<'a, I>(values: I) -> ValidationErrors
where
    I: IntoIterator<Item = (&'a str, &'a ColumnValue)>,
{
    let mut errors = ValidationErrors::new();
    for (field, value) in values {
        if let Err(error) = validators::validate_required(field, value) {
            errors.add(error);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_renders_field_and_message() {
        let err = ValidationError::new("name", "This field is required");
        assert_eq!(err.field, "name");
        assert_eq!(err.to_string(), "name: This field is required");
    }

    #[test]
    fn test_to_map_keeps_first_message_per_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add(ValidationError::new("field1", "error1"));
        errors.add(ValidationError::new("field2", "error2"));
        errors.add(ValidationError::new("field1", "again"));
        assert_eq!(errors.len(), 3);

        let map = errors.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["field1"], "error1");

        errors.clear();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_blank_values_are_required_failures() {
        use validators::validate_required;

        assert!(validate_required("name", &ColumnValue::Null).is_err());
        assert!(validate_required("name", &ColumnValue::Text("   ".into())).is_err());
        assert!(validate_required("tags", &ColumnValue::List(vec![])).is_err());
        assert!(validate_required("name", &ColumnValue::Text("John".into())).is_ok());
        assert!(validate_required("count", &ColumnValue::Int(0)).is_ok());
    }

    #[test]
    fn test_check_required_collects_every_blank_field() {
        let name = ColumnValue::Null;
        let date = ColumnValue::Text(String::new());
        let link = ColumnValue::Text("https://example.com".into());
        let errors = check_required([("name", &name), ("date", &date), ("link", &link)]);
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "date"]);
    }
}
