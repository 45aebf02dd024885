use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::{DatabaseError, SupabaseClient};
use shared_utils::AppState;

use crate::models::{
    format_time, Appointment, AppointmentChanges, AppointmentDetails, AppointmentError,
    AppointmentFilter, AppointmentRow, AppointmentStatus, NewAppointment,
};
use crate::services::conflict::{ConflictDetectionService, BOOKED_SLOT_CONSTRAINT};

/// Embeds the joined display fields.
const DETAILS_SELECT: &str = "*,patient:patients(name,phone,email),doctor:doctors(name,specialization)";

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    conflicts: ConflictDetectionService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
            conflicts: ConflictDetectionService::new(state.db.clone()),
        }
    }

    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        debug!("Listing appointments with filter: {:?}", filter);

        let mut query_parts = vec![format!("select={}", DETAILS_SELECT)];

        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(day) = filter.date {
            let start = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
            let end = day.checked_add_days(Days::new(1))
                .and_then(|next| next.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc());
            if let (Some(start), Some(end)) = (start, end) {
                query_parts.push(format!("appointment_time=gte.{}", urlencoding::encode(&format_time(&start))));
                query_parts.push(format!("appointment_time=lt.{}", urlencoding::encode(&format_time(&end))));
            }
        }
        query_parts.push("order=appointment_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<AppointmentRow> = self.supabase.select(&path).await?;

        Ok(rows.into_iter().map(AppointmentDetails::from).collect())
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?select={}&id=eq.{}", DETAILS_SELECT, appointment_id);
        let row: Option<AppointmentRow> = self.supabase.select_one(&path).await?;

        row.map(AppointmentDetails::from).ok_or(AppointmentError::NotFound)
    }

    pub async fn check_conflict(
        &self,
        doctor_id: i64,
        time: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppointmentError> {
        Ok(self.conflicts.has_conflict(doctor_id, time, exclude_id).await?)
    }

    pub async fn book_appointment(&self, request: NewAppointment) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Booking appointment for patient {} with doctor {} at {}",
               request.patient_id, request.doctor_id, request.appointment_time);

        if !self.exists("patients", request.patient_id).await? {
            return Err(AppointmentError::PatientNotFound);
        }
        if !self.exists("doctors", request.doctor_id).await? {
            return Err(AppointmentError::DoctorNotFound);
        }

        if self.conflicts.has_conflict(request.doctor_id, request.appointment_time, None).await? {
            return Err(AppointmentError::SlotTaken);
        }

        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_time": format_time(&request.appointment_time),
            "status": AppointmentStatus::Booked,
            "notes": request.notes,
        });

        let created: Appointment = self.supabase
            .insert("appointments", row)
            .await
            .map_err(map_write_error)?;

        info!("Appointment {} booked for doctor {} at {}",
              created.id, created.doctor_id, created.appointment_time);

        self.get_appointment(created.id).await
    }

    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        changes: AppointmentChanges,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Updating appointment {}: {:?}", appointment_id, changes);

        let current = self.find_appointment(appointment_id).await?
            .ok_or(AppointmentError::NotFound)?;

        let time = changes.appointment_time.unwrap_or(current.appointment_time);
        let status = changes.status.unwrap_or(current.status);

        // A move into another slot is checked whatever the status; so is reactivation.
        let moves_slot = time != current.appointment_time;
        let reactivates = status.holds_slot() && !current.status.holds_slot();

        if (moves_slot || reactivates)
            && self.conflicts.has_conflict(current.doctor_id, time, Some(appointment_id)).await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Option<Appointment> = self.supabase
            .update(&path, changes.to_json())
            .await
            .map_err(map_write_error)?;

        let updated = updated.ok_or(AppointmentError::NotFound)?;
        info!("Appointment {} updated (status {}, time {})",
              updated.id, updated.status, updated.appointment_time);

        self.get_appointment(updated.id).await
    }

    pub async fn delete_appointment(&self, appointment_id: i64) -> Result<(), AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let deleted: Option<Appointment> = self.supabase.delete(&path).await?;

        match deleted {
            Some(_) => {
                info!("Appointment {} deleted", appointment_id);
                Ok(())
            }
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn find_appointment(&self, appointment_id: i64) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.supabase.select_one(&path).await?)
    }

    async fn exists(&self, table: &str, id: i64) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/{}?select=id&id=eq.{}", table, id);
        let row: Option<Value> = self.supabase.select_one(&path).await?;
        Ok(row.is_some())
    }
}

/// A write that lost a race for the slot reads the same as a detected conflict.
fn map_write_error(error: DatabaseError) -> AppointmentError {
    if error.violates(BOOKED_SLOT_CONSTRAINT) {
        warn!("Booked slot taken concurrently");
        return AppointmentError::SlotTaken;
    }

    match error {
        DatabaseError::ForeignKeyViolation(details) if details.contains("patient") => {
            AppointmentError::PatientNotFound
        }
        DatabaseError::ForeignKeyViolation(details) if details.contains("doctor") => {
            AppointmentError::DoctorNotFound
        }
        other => AppointmentError::Database(other),
    }
}
