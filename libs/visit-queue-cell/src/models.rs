use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_models::error::AppError;
use shared_utils::validation::{lenient_id, Validator};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub queue_number: i32,
    pub queue_date: NaiveDate,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
}

impl AsRef<QueueEntry> for QueueEntry {
    fn as_ref(&self) -> &QueueEntry {
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueuePriority {
    #[default]
    Normal,
    Urgent,
}

impl QueuePriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Normal" => Some(Self::Normal),
            "Urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Urgent => "Urgent",
        }
    }

    /// Lower is served first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::Normal => 1,
        }
    }
}

impl fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueueStatus {
    #[default]
    Waiting,
    #[serde(rename = "With Doctor")]
    WithDoctor,
    Completed,
}

impl QueueStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Waiting" => Some(Self::Waiting),
            "With Doctor" => Some(Self::WithDoctor),
            "Completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::WithDoctor => "With Doctor",
            Self::Completed => "Completed",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePatient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A queue row read with its embedded `patient` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueEntryRow {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub patient: Option<QueuePatient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryDetails {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
}

impl AsRef<QueueEntry> for QueueEntryDetails {
    fn as_ref(&self) -> &QueueEntry {
        &self.entry
    }
}

impl From<QueueEntryRow> for QueueEntryDetails {
    fn from(row: QueueEntryRow) -> Self {
        let (patient_name, patient_phone, patient_email) = match row.patient {
            Some(p) => (Some(p.name), p.phone, p.email),
            None => (None, None, None),
        };

        Self {
            entry: row.entry,
            patient_name,
            patient_phone,
            patient_email,
        }
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddToQueueRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub patient_id: Option<i64>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub appointment_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQueueEntry {
    pub patient_id: i64,
    pub priority: QueuePriority,
    pub appointment_id: Option<i64>,
}

impl AddToQueueRequest {
    pub fn validate(self) -> Result<NewQueueEntry, AppError> {
        let mut v = Validator::new();
        let patient_id = v.require_id("patient_id", self.patient_id, "Valid patient ID required");
        let priority = v.optional_parse(
            "priority",
            self.priority.as_deref().filter(|p| !p.is_empty()),
            QueuePriority::parse,
            "Valid priority required",
        );
        let appointment_id = match self.appointment_id {
            Some(id) => v.require_id("appointment_id", Some(id), "Valid appointment ID required"),
            None => None,
        };

        match patient_id {
            Some(patient_id) if v.is_valid() => Ok(NewQueueEntry {
                patient_id,
                priority: priority.unwrap_or_default(),
                appointment_id,
            }),
            _ => Err(v.into_error()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQueueRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueChanges {
    pub status: Option<QueueStatus>,
    pub priority: Option<QueuePriority>,
}

impl UpdateQueueRequest {
    pub fn validate(self) -> Result<QueueChanges, AppError> {
        let mut v = Validator::new();
        let status = v.optional_parse(
            "status",
            self.status.as_deref().filter(|s| !s.is_empty()),
            QueueStatus::parse,
            "Valid status required",
        );
        let priority = v.optional_parse(
            "priority",
            self.priority.as_deref().filter(|p| !p.is_empty()),
            QueuePriority::parse,
            "Valid priority required",
        );
        v.finish()?;

        let changes = QueueChanges { status, priority };
        if changes.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".to_string()));
        }

        Ok(changes)
    }
}

impl QueueChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }

    pub fn to_json(&self) -> Value {
        let mut update = Map::new();
        if let Some(status) = self.status {
            update.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(priority) = self.priority {
            update.insert("priority".to_string(), json!(priority.as_str()));
        }
        Value::Object(update)
    }
}
