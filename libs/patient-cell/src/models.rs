use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use chrono::{DateTime, Utc};

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::person::Gender;
use shared_utils::validation::Validator;

pub const MAX_AGE: i32 = 150;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body for create and update. `age` may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub age: Option<Value>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientDetails {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
}

fn parse_age(value: &Value) -> Option<Option<i32>> {
    let age = match value {
        Value::Null => return Some(None),
        Value::String(s) if s.trim().is_empty() => return Some(None),
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };

    (0..=MAX_AGE as i64).contains(&age).then_some(Some(age as i32))
}

impl PatientRequest {
    pub fn validate(self) -> Result<PatientDetails, AppError> {
        let mut v = Validator::new();
        let name = v.require_text("name", self.name.as_deref(), 2, "Name must be at least 2 characters");
        let phone = v.require_text("phone", self.phone.as_deref(), 10, "Valid phone number required");
        let email = v.optional_email("email", self.email.as_deref(), "Valid email required");

        let age = match self.age.as_ref().map(parse_age) {
            None => None,
            Some(Some(age)) => age,
            Some(None) => {
                v.push("age", "Age must be between 0 and 150");
                None
            }
        };

        let gender = v.optional_parse(
            "gender",
            self.gender.as_deref().filter(|g| !g.trim().is_empty()),
            Gender::parse,
            "Valid gender required",
        );

        match (name, phone) {
            (Some(name), Some(phone)) if v.is_valid() => Ok(PatientDetails { name, phone, email, age, gender }),
            _ => Err(v.into_error()),
        }
    }
}

impl PatientDetails {
    /// Name, phone and email are always written (a blank email clears it);
    /// age and gender only when given.
    pub fn to_json(&self) -> Value {
        let mut row = Map::new();
        row.insert("name".to_string(), json!(self.name));
        row.insert("phone".to_string(), json!(self.phone));
        row.insert("email".to_string(), json!(self.email));
        if let Some(age) = self.age {
            row.insert("age".to_string(), json!(age));
        }
        if let Some(gender) = self.gender {
            row.insert("gender".to_string(), json!(gender));
        }
        Value::Object(row)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PatientError> for AppError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::Database(e) => e.into(),
        }
    }
}
