use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use shared_models::error::{AppError, FieldError};

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

/// Accepts an id sent as a JSON number or a numeric string (form values arrive as strings).
/// Anything else reads as absent so the validator reports it with the field's message.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Collects every field problem in a request body so the client sees them all at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Positive database id.
    pub fn require_id(&mut self, field: &str, value: Option<i64>, message: &str) -> Option<i64> {
        match value {
            Some(id) if id >= 1 => Some(id),
            _ => {
                self.push(field, message);
                None
            }
        }
    }

    /// Trimmed text of at least `min_chars` characters.
    pub fn require_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min_chars: usize,
        message: &str,
    ) -> Option<String> {
        let trimmed = value.map(str::trim).unwrap_or_default();
        if trimmed.chars().count() >= min_chars {
            Some(trimmed.to_string())
        } else {
            self.push(field, message);
            None
        }
    }

    /// Blank counts as absent; anything else must look like an address and is lowercased.
    pub fn optional_email(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
        if email_pattern().is_match(trimmed) {
            Some(trimmed.to_lowercase())
        } else {
            self.push(field, message);
            None
        }
    }

    pub fn require_email(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let email = self.optional_email(field, value, message);
        if email.is_none() && value.map(str::trim).filter(|v| !v.is_empty()).is_none() {
            self.push(field, message);
        }
        email
    }

    /// Runs `parse` on a present value; absent values are accepted as `None`.
    pub fn optional_parse<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        parse: impl FnOnce(&str) -> Option<T>,
        message: &str,
    ) -> Option<T> {
        let raw = value?;
        let parsed = parse(raw);
        if parsed.is_none() {
            self.push(field, message);
        }
        parsed
    }

    pub fn require_parse<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        parse: impl FnOnce(&str) -> Option<T>,
        message: &str,
    ) -> Option<T> {
        if value.is_none() {
            self.push(field, message);
            return None;
        }
        self.optional_parse(field, value, parse, message)
    }
}
