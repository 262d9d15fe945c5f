//! Field-addressable input validation.

use serde::Serialize;
use std::collections::BTreeMap;

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn required(&mut self, field: &str, value: Option<&str>) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.add(field, "this field is required");
                false
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_email(value) {
            self.add(field, format!("{value:?} is not a valid email"));
        }
    }

    /// Character-count bounds, inclusive.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: Option<usize>) {
        let len = value.chars().count();
        if len < min {
            self.add(field, format!("{field} must be greater than {min}"));
        }
        if let Some(max) = max {
            if len > max {
                self.add(field, format!("{field} must be less than {max}"));
            }
        }
    }

    pub fn at_least(&mut self, field: &str, value: i64, min: i64) {
        if value < min {
            self.add(field, format!("{field} must be greater than {min}"));
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_email("ada@example.com"));
        assert!(is_email("a.b+c@mail.example.org"));
        assert!(!is_email("ada"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("ada@localhost"));
        assert!(!is_email("ada@example..com"));
        assert!(!is_email("a da@example.com"));
    }

    #[test]
    fn messages_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.required("email", Some("  "));
        errors.length("password", "short", 8, Some(72));
        errors.length("password", &"x".repeat(80), 8, Some(72));
        errors.at_least("age", 0, 1);

        assert_eq!(errors.get("email").unwrap(), ["this field is required"]);
        assert_eq!(
            errors.get("password").unwrap(),
            ["password must be greater than 8", "password must be less than 72"]
        );
        assert_eq!(errors.get("age").unwrap(), ["age must be greater than 1"]);
        assert!(errors.into_result().is_err());
    }
}
