use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::QueueEntry;

/// Unique `(queue_date, queue_number)`.
pub const QUEUE_NUMBER_CONSTRAINT: &str = "queue_day_number_key";

/// Partial unique index on `patient_id` for Waiting / With Doctor entries.
pub const ACTIVE_PATIENT_CONSTRAINT: &str = "queue_active_patient_key";

pub fn next_after(max_today: Option<i32>) -> i32 {
    max_today.unwrap_or(0) + 1
}

/// Urgent before Normal; within a priority, older days first, then by number.
/// Completed entries are dropped.
pub fn active_order<T: AsRef<QueueEntry>>(entries: Vec<T>) -> Vec<T> {
    let mut active: Vec<T> = entries
        .into_iter()
        .filter(|e| e.as_ref().status.is_active())
        .collect();

    active.sort_by_key(|e| {
        let entry = e.as_ref();
        (entry.priority.rank(), entry.queue_date, entry.queue_number)
    });

    active
}

#[derive(Debug, Deserialize)]
struct NumberRow {
    queue_number: i32,
}

pub struct QueueSequencer {
    supabase: Arc<SupabaseClient>,
}

impl QueueSequencer {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn next_queue_number(&self, day: NaiveDate) -> Result<i32, DatabaseError> {
        let path = format!(
            "/rest/v1/queue?select=queue_number&queue_date=eq.{}&order=queue_number.desc&limit=1",
            day.format("%Y-%m-%d")
        );
        let last: Option<NumberRow> = self.supabase.select_one(&path).await?;

        let next = next_after(last.map(|row| row.queue_number));
        debug!("Next queue number for {} is {}", day, next);

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueuePriority, QueueStatus};
    use chrono::Utc;

    fn entry(id: i64, priority: QueuePriority, queue_number: i32, day: u32) -> QueueEntry {
        QueueEntry {
            id,
            patient_id: 100 + id,
            appointment_id: None,
            queue_number,
            queue_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            priority,
            status: QueueStatus::Waiting,
            created_at: Utc::now(),
        }
    }

    fn numbers(entries: &[QueueEntry]) -> Vec<(QueuePriority, i32)> {
        entries.iter().map(|e| (e.priority, e.queue_number)).collect()
    }

    #[test]
    fn first_number_of_the_day_is_one() {
        assert_eq!(next_after(None), 1);
        assert_eq!(next_after(Some(7)), 8);
    }

    #[test]
    fn urgent_entries_jump_the_line() {
        let queue = vec![
            entry(1, QueuePriority::Normal, 2, 15),
            entry(2, QueuePriority::Urgent, 5, 15),
            entry(3, QueuePriority::Normal, 1, 15),
        ];

        assert_eq!(
            numbers(&active_order(queue)),
            vec![
                (QueuePriority::Urgent, 5),
                (QueuePriority::Normal, 1),
                (QueuePriority::Normal, 2),
            ]
        );
    }

    #[test]
    fn completed_entries_are_not_shown() {
        let mut done = entry(1, QueuePriority::Urgent, 1, 15);
        done.status = QueueStatus::Completed;
        let mut seeing = entry(2, QueuePriority::Normal, 2, 15);
        seeing.status = QueueStatus::WithDoctor;

        let ordered = active_order(vec![done, seeing]);

        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, 2);
    }

    #[test]
    fn leftover_entries_from_yesterday_come_first() {
        let queue = vec![
            entry(1, QueuePriority::Normal, 1, 16),
            entry(2, QueuePriority::Normal, 9, 15),
        ];

        let ordered = active_order(queue);

        assert_eq!(ordered.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 1]);
    }
}
