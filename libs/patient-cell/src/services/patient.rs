use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use shared_database::supabase::SupabaseClient;
use shared_models::person::Gender;
use shared_utils::AppState;

use crate::models::{Patient, PatientDetails, PatientError};

const DEMO_PATIENTS: [(&str, i32, Gender, &str, &str); 4] = [
    ("John Smith", 45, Gender::Male, "555-010-0101", "john.smith@email.com"),
    ("Maria Garcia", 32, Gender::Female, "555-010-0102", "maria.garcia@email.com"),
    ("Robert Johnson", 67, Gender::Male, "555-010-0103", "robert.johnson@email.com"),
    ("Lisa Wang", 28, Gender::Female, "555-010-0104", "lisa.wang@email.com"),
];

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        debug!("Listing patients");

        Ok(self.supabase.select("/rest/v1/patients?order=name.asc").await?)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let patient: Option<Patient> = self.supabase.select_one(&path).await?;

        patient.ok_or(PatientError::NotFound)
    }

    pub async fn create_patient(&self, details: PatientDetails) -> Result<Patient, PatientError> {
        debug!("Creating patient record for {}", details.name);

        let patient: Patient = self.supabase.insert("patients", details.to_json()).await?;
        info!("Patient {} registered", patient.id);

        Ok(patient)
    }

    /// Fills an empty `patients` table with demo records. Returns how many were created.
    pub async fn seed_demo_patients(&self) -> Result<usize, PatientError> {
        let existing: Option<Value> = self.supabase.select_one("/rest/v1/patients?select=id&limit=1").await?;
        if existing.is_some() {
            debug!("Patients already present, skipping demo data");
            return Ok(0);
        }

        for (name, age, gender, phone, email) in DEMO_PATIENTS {
            self.create_patient(PatientDetails {
                name: name.to_string(),
                phone: phone.to_string(),
                email: Some(email.to_string()),
                age: Some(age),
                gender: Some(gender),
            })
            .await?;
        }

        info!("Seeded {} demo patients", DEMO_PATIENTS.len());
        Ok(DEMO_PATIENTS.len())
    }

    pub async fn update_patient(&self, patient_id: i64, details: PatientDetails) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let patient: Option<Patient> = self.supabase.update(&path, details.to_json()).await?;

        let patient = patient.ok_or(PatientError::NotFound)?;
        info!("Patient {} updated", patient.id);

        Ok(patient)
    }
}
