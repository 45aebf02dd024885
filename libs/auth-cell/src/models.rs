use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::validation::Validator;

/// A row of the `users` table. Never serialized to clients.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

impl UserProfile {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            issued_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AppError> {
        let mut v = Validator::new();
        let email = v.require_email("email", self.email.as_deref(), "Valid email required");
        let password = self.password.filter(|p| !p.is_empty());
        if password.is_none() {
            v.push("password", "Password required");
        }

        match (email, password) {
            (Some(email), Some(password)) if v.is_valid() => Ok(Credentials { email, password }),
            _ => Err(v.into_error()),
        }
    }
}

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

fn parse_role(value: &str) -> Option<UserRole> {
    match value.trim() {
        "admin" => Some(UserRole::Admin),
        "front_desk" => Some(UserRole::FrontDesk),
        _ => None,
    }
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, AppError> {
        let mut v = Validator::new();
        let name = v.require_text("name", self.name.as_deref(), 2, "Name must be at least 2 characters");
        let email = v.require_email("email", self.email.as_deref(), "Valid email required");
        let password = self.password.filter(|p| p.chars().count() >= MIN_PASSWORD_CHARS);
        if password.is_none() {
            v.push("password", "Password must be at least 6 characters");
        }
        let role = v.optional_parse(
            "role",
            self.role.as_deref().filter(|r| !r.is_empty()),
            parse_role,
            "Valid role required",
        );

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if v.is_valid() => Ok(NewUser {
                name,
                email,
                password,
                role: role.unwrap_or(UserRole::FrontDesk),
            }),
            _ => Err(v.into_error()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists with this email")]
    EmailTaken,

    #[error("User not found")]
    NotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        let message = error.to_string();
        match error {
            AuthError::InvalidCredentials => AppError::Auth(message),
            AuthError::EmailTaken => AppError::BadRequest(message),
            AuthError::NotFound => AppError::NotFound(message),
            AuthError::Hashing(_) | AuthError::Token(_) => AppError::Internal(message),
            AuthError::Database(e) => e.into(),
        }
    }
}
