use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::{DatabaseError, SupabaseClient};
use shared_utils::AppState;

use crate::error::QueueError;
use crate::models::{
    NewQueueEntry, QueueChanges, QueueEntry, QueueEntryDetails, QueueEntryRow, QueueStatus,
};
use crate::services::sequencer::{
    active_order, QueueSequencer, ACTIVE_PATIENT_CONSTRAINT, QUEUE_NUMBER_CONSTRAINT,
};

const DETAILS_SELECT: &str = "*,patient:patients(name,phone,email)";

pub struct VisitQueueService {
    supabase: Arc<SupabaseClient>,
    sequencer: QueueSequencer,
    insert_attempts: u32,
}

impl VisitQueueService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
            sequencer: QueueSequencer::new(state.db.clone()),
            insert_attempts: state.config.queue_insert_attempts.max(1),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<QueueEntryDetails>, QueueError> {
        debug!("Fetching active queue");

        let path = format!(
            "/rest/v1/queue?select={}&status=neq.{}&order=queue_number.asc",
            DETAILS_SELECT,
            QueueStatus::Completed
        );
        let rows: Vec<QueueEntryRow> = self.supabase.select(&path).await?;

        let entries = rows.into_iter().map(QueueEntryDetails::from).collect();
        Ok(active_order(entries))
    }

    pub async fn get_entry(&self, entry_id: i64) -> Result<QueueEntryDetails, QueueError> {
        let path = format!("/rest/v1/queue?select={}&id=eq.{}", DETAILS_SELECT, entry_id);
        let row: Option<QueueEntryRow> = self.supabase.select_one(&path).await?;

        row.map(QueueEntryDetails::from).ok_or(QueueError::NotFound)
    }

    pub async fn add_patient(&self, request: NewQueueEntry) -> Result<QueueEntryDetails, QueueError> {
        debug!("Adding patient {} to queue with priority {}", request.patient_id, request.priority);

        if !self.exists("patients", request.patient_id).await? {
            return Err(QueueError::PatientNotFound);
        }

        if let Some(existing) = self.active_entry_for(request.patient_id).await? {
            warn!("Patient {} already queued as entry {}", request.patient_id, existing.id);
            return Err(QueueError::AlreadyQueued);
        }

        if let Some(appointment_id) = request.appointment_id {
            if !self.exists("appointments", appointment_id).await? {
                return Err(QueueError::AppointmentNotFound);
            }
        }

        let day = Utc::now().date_naive();
        let created = self.insert_numbered(&request, day).await?;

        info!("Patient {} queued as number {} on {}",
              created.patient_id, created.queue_number, created.queue_date);

        self.get_entry(created.id).await
    }

    pub async fn update_entry(
        &self,
        entry_id: i64,
        changes: QueueChanges,
    ) -> Result<QueueEntryDetails, QueueError> {
        debug!("Updating queue entry {}: {:?}", entry_id, changes);

        let path = format!("/rest/v1/queue?id=eq.{}", entry_id);
        let updated: Option<QueueEntry> = self.supabase
            .update(&path, changes.to_json())
            .await
            .map_err(map_write_error)?;

        let updated = updated.ok_or(QueueError::NotFound)?;
        info!("Queue entry {} now {} / {}", updated.id, updated.status, updated.priority);

        self.get_entry(updated.id).await
    }

    pub async fn remove_entry(&self, entry_id: i64) -> Result<(), QueueError> {
        debug!("Removing queue entry {}", entry_id);

        let path = format!("/rest/v1/queue?id=eq.{}", entry_id);
        let deleted: Option<QueueEntry> = self.supabase.delete(&path).await?;

        match deleted {
            Some(entry) => {
                info!("Patient {} removed from queue (entry {})", entry.patient_id, entry.id);
                Ok(())
            }
            None => Err(QueueError::NotFound),
        }
    }

    /// Losing the `(queue_date, queue_number)` race means another request took
    /// the number first; recompute and try again.
    async fn insert_numbered(&self, request: &NewQueueEntry, day: NaiveDate) -> Result<QueueEntry, QueueError> {
        for attempt in 1..=self.insert_attempts {
            let queue_number = self.sequencer.next_queue_number(day).await?;

            let row = json!({
                "patient_id": request.patient_id,
                "appointment_id": request.appointment_id,
                "queue_number": queue_number,
                "queue_date": day.format("%Y-%m-%d").to_string(),
                "priority": request.priority,
                "status": QueueStatus::Waiting,
            });

            match self.supabase.insert::<QueueEntry>("queue", row).await {
                Ok(entry) => return Ok(entry),
                Err(e) if e.violates(QUEUE_NUMBER_CONSTRAINT) => {
                    warn!("Queue number {} on {} taken concurrently (attempt {}/{})",
                          queue_number, day, attempt, self.insert_attempts);
                }
                Err(e) => return Err(map_write_error(e)),
            }
        }

        Err(QueueError::NumberingContention { attempts: self.insert_attempts })
    }

    async fn active_entry_for(&self, patient_id: i64) -> Result<Option<QueueEntry>, QueueError> {
        let path = format!(
            "/rest/v1/queue?patient_id=eq.{}&status=neq.{}&limit=1",
            patient_id,
            QueueStatus::Completed
        );
        Ok(self.supabase.select_one(&path).await?)
    }

    async fn exists(&self, table: &str, id: i64) -> Result<bool, QueueError> {
        let path = format!("/rest/v1/{}?select=id&id=eq.{}", table, id);
        let row: Option<Value> = self.supabase.select_one(&path).await?;
        Ok(row.is_some())
    }
}

fn map_write_error(error: DatabaseError) -> QueueError {
    if error.violates(ACTIVE_PATIENT_CONSTRAINT) {
        warn!("Duplicate active queue entry rejected by store");
        return QueueError::AlreadyQueued;
    }

    match error {
        DatabaseError::ForeignKeyViolation(details) if details.contains("appointment") => {
            QueueError::AppointmentNotFound
        }
        DatabaseError::ForeignKeyViolation(details) if details.contains("patient") => {
            QueueError::PatientNotFound
        }
        other => QueueError::Database(other),
    }
}
