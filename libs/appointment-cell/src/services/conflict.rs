use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{format_time, Appointment};

/// Partial unique index on `(doctor_id, appointment_time) where status = 'Booked'`.
pub const BOOKED_SLOT_CONSTRAINT: &str = "appointments_booked_slot_key";

/// Whether `candidate` occupies the doctor's slot at `time`.
/// The appointment being edited never conflicts with itself.
pub fn blocks_slot(
    candidate: &Appointment,
    doctor_id: i64,
    time: DateTime<Utc>,
    exclude_id: Option<i64>,
) -> bool {
    candidate.doctor_id == doctor_id
        && candidate.appointment_time == time
        && candidate.status.holds_slot()
        && exclude_id != Some(candidate.id)
}

pub fn find_conflict<'a>(
    candidates: &'a [Appointment],
    doctor_id: i64,
    time: DateTime<Utc>,
    exclude_id: Option<i64>,
) -> Option<&'a Appointment> {
    candidates
        .iter()
        .find(|candidate| blocks_slot(candidate, doctor_id, time, exclude_id))
}

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// True iff another booked appointment holds `doctor_id`'s slot at `time`.
    pub async fn has_conflict(
        &self,
        doctor_id: i64,
        time: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<bool, DatabaseError> {
        debug!("Checking conflicts for doctor {} at {}", doctor_id, time);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_time=eq.{}&status=eq.Booked",
            doctor_id,
            urlencoding::encode(&format_time(&time)),
        );
        let candidates: Vec<Appointment> = self.supabase.select(&path).await?;

        match find_conflict(&candidates, doctor_id, time, exclude_id) {
            Some(existing) => {
                warn!("Conflict detected for doctor {} at {}: appointment {} already booked",
                      doctor_id, time, existing.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
