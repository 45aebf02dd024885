// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{lenient_id, Validator};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Booked" => Some(AppointmentStatus::Booked),
            "Completed" => Some(AppointmentStatus::Completed),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "Booked",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Only booked appointments hold their doctor's time slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Booked)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub name: String,
    pub specialization: String,
}

/// An appointment row read with its embedded `patient` and `doctor` resources.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRow {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
}

/// The flat view returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_specialization: Option<String>,
}

impl From<AppointmentRow> for AppointmentDetails {
    fn from(row: AppointmentRow) -> Self {
        let (patient_name, patient_phone, patient_email) = match row.patient {
            Some(p) => (Some(p.name), p.phone, p.email),
            None => (None, None, None),
        };
        let (doctor_name, doctor_specialization) = match row.doctor {
            Some(d) => (Some(d.name), Some(d.specialization)),
            None => (None, None),
        };

        Self {
            appointment: row.appointment,
            patient_name,
            patient_phone,
            patient_email,
            doctor_name,
            doctor_specialization,
        }
    }
}

// ==============================================================================
// TIME HANDLING
// ==============================================================================

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 appointment time. Values without an offset are taken as UTC.
pub fn parse_appointment_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Calendar day of a date or date-time string.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_appointment_time(raw).map(|time| time.date_naive()))
}

/// Canonical text form used in store filters and payloads.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub patient_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub doctor_id: Option<i64>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_time: DateTime<Utc>,
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn validate(self) -> Result<NewAppointment, AppError> {
        let mut v = Validator::new();
        let patient_id = v.require_id("patient_id", self.patient_id, "Valid patient ID required");
        let doctor_id = v.require_id("doctor_id", self.doctor_id, "Valid doctor ID required");
        let appointment_time = v.require_parse(
            "appointment_time",
            self.appointment_time.as_deref(),
            parse_appointment_time,
            "Valid datetime required",
        );

        match (patient_id, doctor_id, appointment_time) {
            (Some(patient_id), Some(doctor_id), Some(appointment_time)) if v.is_valid() => Ok(NewAppointment {
                patient_id,
                doctor_id,
                appointment_time,
                notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            }),
            _ => Err(v.into_error()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentChanges {
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(self) -> Result<AppointmentChanges, AppError> {
        let mut v = Validator::new();
        let appointment_time = v.optional_parse(
            "appointment_time",
            self.appointment_time.as_deref().filter(|t| !t.trim().is_empty()),
            parse_appointment_time,
            "Valid datetime required",
        );
        let status = v.optional_parse(
            "status",
            self.status.as_deref().filter(|s| !s.is_empty()),
            AppointmentStatus::parse,
            "Valid status required",
        );
        v.finish()?;

        let changes = AppointmentChanges {
            appointment_time,
            status,
            notes: self.notes.map(|n| n.trim().to_string()),
        };

        if changes.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".to_string()));
        }

        Ok(changes)
    }
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        self.appointment_time.is_none() && self.status.is_none() && self.notes.is_none()
    }

    pub fn to_json(&self) -> Value {
        let mut update = Map::new();
        if let Some(time) = &self.appointment_time {
            update.insert("appointment_time".to_string(), json!(format_time(time)));
        }
        if let Some(status) = self.status {
            update.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(notes) = &self.notes {
            update.insert("notes".to_string(), json!(notes));
        }
        Value::Object(update)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQueryParams {
    pub status: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

impl AppointmentQueryParams {
    pub fn validate(self) -> Result<AppointmentFilter, AppError> {
        let mut v = Validator::new();
        let status = v.optional_parse("status", self.status.as_deref(), AppointmentStatus::parse, "Invalid value");
        let doctor_id = v.optional_parse(
            "doctor_id",
            self.doctor_id.as_deref(),
            |raw| raw.trim().parse::<i64>().ok(),
            "Invalid value",
        );
        let date = v.optional_parse("date", self.date.as_deref(), parse_day, "Invalid value");
        v.finish()?;

        Ok(AppointmentFilter { status, doctor_id, date })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Option<String>,
    pub appointment_time: Option<String>,
    pub exclude_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictCheckRequest {
    pub doctor_id: i64,
    pub appointment_time: DateTime<Utc>,
    pub exclude_id: Option<i64>,
}

impl ConflictCheckQuery {
    pub fn validate(self) -> Result<ConflictCheckRequest, AppError> {
        let mut v = Validator::new();
        let parse_id = |raw: &str| raw.trim().parse::<i64>().ok().filter(|id| *id >= 1);
        let doctor_id = v.require_parse("doctor_id", self.doctor_id.as_deref(), parse_id, "Valid doctor ID required");
        let appointment_time = v.require_parse(
            "appointment_time",
            self.appointment_time.as_deref(),
            parse_appointment_time,
            "Valid datetime required",
        );
        let exclude_id = v.optional_parse("exclude_id", self.exclude_id.as_deref(), parse_id, "Invalid value");

        match (doctor_id, appointment_time) {
            (Some(doctor_id), Some(appointment_time)) if v.is_valid() => Ok(ConflictCheckRequest {
                doctor_id,
                appointment_time,
                exclude_id,
            }),
            _ => Err(v.into_error()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub doctor_id: i64,
    pub appointment_time: DateTime<Utc>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor already has an appointment at this time")]
    SlotTaken,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        let message = error.to_string();
        match error {
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::SlotTaken => AppError::BadRequest(message),
            AppointmentError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn parses_offset_and_naive_times_to_the_same_instant() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        assert_eq!(parse_appointment_time("2024-01-15T10:00:00Z"), Some(expected));
        assert_eq!(parse_appointment_time("2024-01-15T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_appointment_time("2024-01-15T10:00"), Some(expected));
        assert_eq!(parse_appointment_time("2024-01-15 10:00:00"), Some(expected));
        assert_eq!(parse_appointment_time("tomorrow at ten"), None);
    }

    #[test]
    fn day_accepts_dates_and_date_times() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_day("2024-01-15"), Some(day));
        assert_eq!(parse_day("2024-01-15T09:30:00Z"), Some(day));
        assert_eq!(parse_day("15/01/2024"), None);
    }

    #[test]
    fn create_request_reports_each_missing_field() {
        let result = CreateAppointmentRequest::default().validate();

        assert_matches!(result, Err(AppError::Validation(errors)) if errors.len() == 3);
    }

    #[test]
    fn create_request_validates() {
        let request = CreateAppointmentRequest {
            patient_id: Some(1),
            doctor_id: Some(2),
            appointment_time: Some("2024-01-15T10:00".to_string()),
            notes: Some("   ".to_string()),
        };

        let new = request.validate().unwrap();
        assert_eq!(new.doctor_id, 2);
        assert_eq!(new.notes, None);
        assert_eq!(format_time(&new.appointment_time), "2024-01-15T10:00:00Z");
    }

    #[test]
    fn update_without_fields_is_rejected() {
        assert_matches!(
            UpdateAppointmentRequest::default().validate(),
            Err(AppError::BadRequest(msg)) if msg == "No valid fields to update"
        );
    }

    #[test]
    fn update_rejects_unknown_status() {
        let request = UpdateAppointmentRequest {
            status: Some("scheduled".to_string()),
            ..Default::default()
        };

        assert_matches!(request.validate(), Err(AppError::Validation(_)));
    }

    #[test]
    fn changes_serialize_only_present_fields() {
        let changes = UpdateAppointmentRequest {
            status: Some("Cancelled".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(changes.to_json(), json!({ "status": "Cancelled" }));
    }

    #[test]
    fn slot_taken_is_a_client_error() {
        let error: AppError = AppointmentError::SlotTaken.into();
        assert_matches!(error, AppError::BadRequest(msg) if msg == "Doctor already has an appointment at this time");
    }
}
