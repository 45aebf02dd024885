use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::person::Gender;
use shared_utils::validation::Validator;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
    pub gender: Option<Gender>,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Substring filters for the doctor directory; blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialization: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
}

impl DoctorSearchFilters {
    pub fn to_query(&self) -> Vec<String> {
        [
            ("specialization", &self.specialization),
            ("location", &self.location),
            ("availability", &self.availability),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            let term = value.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
            Some(format!("{}=ilike.*{}*", column, urlencoding::encode(term)))
        })
        .collect()
    }
}

/// Body for both create and full replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorRequest {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoctorProfile {
    pub name: String,
    pub specialization: String,
    pub gender: Gender,
    pub location: String,
    pub availability: String,
}

impl DoctorRequest {
    pub fn validate(self) -> Result<DoctorProfile, AppError> {
        let mut v = Validator::new();
        let name = v.require_text("name", self.name.as_deref(), 2, "Name must be at least 2 characters");
        let specialization = v.require_text(
            "specialization",
            self.specialization.as_deref(),
            2,
            "Specialization required",
        );
        let gender = v.require_parse("gender", self.gender.as_deref(), Gender::parse, "Valid gender required");
        let location = v.require_text("location", self.location.as_deref(), 2, "Location required");
        let availability = v.require_text(
            "availability",
            self.availability.as_deref(),
            2,
            "Availability required",
        );

        match (name, specialization, gender, location, availability) {
            (Some(name), Some(specialization), Some(gender), Some(location), Some(availability)) => {
                Ok(DoctorProfile { name, specialization, gender, location, availability })
            }
            _ => Err(v.into_error()),
        }
    }
}

impl DoctorProfile {
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "specialization": self.specialization,
            "gender": self.gender,
            "location": self.location,
            "availability": self.availability,
        })
    }
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Cannot delete doctor with active appointments")]
    HasActiveAppointments,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<DoctorError> for AppError {
    fn from(error: DoctorError) -> Self {
        let message = error.to_string();
        match error {
            DoctorError::NotFound => AppError::NotFound(message),
            DoctorError::HasActiveAppointments => AppError::BadRequest(message),
            DoctorError::Database(e) => e.into(),
        }
    }
}
