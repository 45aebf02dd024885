use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, User, UserRole};

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the store at a wiremock server.
    pub fn with_store(store_url: &str) -> Self {
        Self {
            supabase_url: store_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            seed_default_users: false,
            ..AppConfig::default()
        }
    }

    pub fn to_state(&self) -> AppState {
        AppState::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::front_desk()
    }
}

impl TestUser {
    pub fn admin() -> Self {
        Self {
            id: 1,
            name: "Admin User".to_string(),
            email: "admin@clinic.com".to_string(),
            role: UserRole::Admin,
        }
    }

    pub fn front_desk() -> Self {
        Self {
            id: 2,
            name: "Front Desk User".to_string(),
            email: "frontdesk@clinic.com".to_string(),
            role: UserRole::FrontDesk,
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            issued_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.to_string(),
            iat: now.timestamp() as u64,
            exp: exp.timestamp() as u64,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("HS256 signing with an HMAC key cannot fail")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-2))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes as PostgREST returns them.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn user_row(id: i64, email: &str, password_hash: &str, role: &str) -> Value {
        json!({
            "id": id,
            "name": "Test User",
            "email": email,
            "password_hash": password_hash,
            "role": role,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(id: i64, name: &str, specialization: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialization": specialization,
            "gender": "Female",
            "location": "Building A, Floor 2",
            "availability": "Mon-Fri 9AM-5PM",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "age": 45,
            "gender": "Male",
            "phone": "555-010-1010",
            "email": "john.smith@email.com",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(id: i64, patient_id: i64, doctor_id: i64, time: &str, status: &str) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_time": time,
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    /// Appointment row with the embedded patient and doctor resources.
    pub fn appointment_details_row(id: i64, patient_id: i64, doctor_id: i64, time: &str, status: &str) -> Value {
        let mut row = Self::appointment_row(id, patient_id, doctor_id, time, status);
        row["patient"] = json!({
            "name": "John Smith",
            "phone": "555-010-1010",
            "email": "john.smith@email.com"
        });
        row["doctor"] = json!({
            "name": "Dr. Sarah Johnson",
            "specialization": "Cardiology"
        });
        row
    }

    pub fn queue_row(id: i64, patient_id: i64, queue_number: i32, priority: &str, status: &str) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "appointment_id": null,
            "queue_number": queue_number,
            "queue_date": Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            "priority": priority,
            "status": status,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn queue_details_row(id: i64, patient_id: i64, queue_number: i32, priority: &str, status: &str) -> Value {
        let mut row = Self::queue_row(id, patient_id, queue_number, priority, status);
        row["patient"] = json!({
            "name": "John Smith",
            "phone": "555-010-1010",
            "email": "john.smith@email.com"
        });
        row
    }

    pub fn unique_violation(constraint: &str) -> Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": format!("duplicate key value violates unique constraint \"{}\"", constraint)
        })
    }
}
