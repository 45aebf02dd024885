use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use shared_database::SupabaseClient;
use shared_models::person::Gender;
use shared_utils::AppState;

use crate::models::{Doctor, DoctorError, DoctorProfile, DoctorSearchFilters};

const DEMO_DOCTORS: [(&str, &str, Gender, &str, &str); 4] = [
    ("Dr. Sarah Johnson", "Cardiology", Gender::Female, "Building A, Floor 2", "Mon-Fri 9AM-5PM"),
    ("Dr. Michael Chen", "Pediatrics", Gender::Male, "Building B, Floor 1", "Mon-Wed 8AM-4PM"),
    ("Dr. Emily Rodriguez", "Dermatology", Gender::Female, "Building A, Floor 3", "Tue-Thu 10AM-6PM"),
    ("Dr. David Kumar", "Orthopedics", Gender::Male, "Building C, Floor 2", "Mon-Fri 7AM-3PM"),
];

pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
        }
    }

    /// Doctors matching every given filter, ordered by name.
    pub async fn list_doctors(&self, filters: &DoctorSearchFilters) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors with filters: {:?}", filters);

        let mut query_parts = filters.to_query();
        query_parts.push("order=name.asc".to_string());

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        Ok(self.supabase.select(&path).await?)
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let doctor: Option<Doctor> = self.supabase.select_one(&path).await?;

        doctor.ok_or(DoctorError::NotFound)
    }

    pub async fn create_doctor(&self, profile: DoctorProfile) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor {}", profile.name);

        let doctor: Doctor = self.supabase.insert("doctors", profile.to_json()).await?;
        info!("Doctor {} created ({})", doctor.id, doctor.specialization);

        Ok(doctor)
    }

    pub async fn update_doctor(&self, doctor_id: i64, profile: DoctorProfile) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let doctor: Option<Doctor> = self.supabase.update(&path, profile.to_json()).await?;

        let doctor = doctor.ok_or(DoctorError::NotFound)?;
        info!("Doctor {} updated", doctor.id);

        Ok(doctor)
    }

    /// Fills an empty `doctors` table with the demo roster. Returns how many were created.
    pub async fn seed_demo_doctors(&self) -> Result<usize, DoctorError> {
        let existing: Option<Value> = self.supabase.select_one("/rest/v1/doctors?select=id&limit=1").await?;
        if existing.is_some() {
            debug!("Doctors already present, skipping demo data");
            return Ok(0);
        }

        for (name, specialization, gender, location, availability) in DEMO_DOCTORS {
            self.create_doctor(DoctorProfile {
                name: name.to_string(),
                specialization: specialization.to_string(),
                gender,
                location: location.to_string(),
                availability: availability.to_string(),
            })
            .await?;
        }

        info!("Seeded {} demo doctors", DEMO_DOCTORS.len());
        Ok(DEMO_DOCTORS.len())
    }

    /// Refused while the doctor still holds any Booked appointment.
    pub async fn delete_doctor(&self, doctor_id: i64) -> Result<(), DoctorError> {
        debug!("Deleting doctor {}", doctor_id);

        let booked_path = format!(
            "/rest/v1/appointments?select=id&doctor_id=eq.{}&status=eq.Booked&limit=1",
            doctor_id
        );
        let booked: Vec<Value> = self.supabase.select(&booked_path).await?;
        if !booked.is_empty() {
            warn!("Refusing to delete doctor {} with booked appointments", doctor_id);
            return Err(DoctorError::HasActiveAppointments);
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let deleted: Option<Doctor> = self.supabase.delete(&path).await?;

        match deleted {
            Some(doctor) => {
                info!("Doctor {} deleted", doctor.id);
                Ok(())
            }
            None => Err(DoctorError::NotFound),
        }
    }
}
