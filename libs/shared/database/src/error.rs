use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

/// PostgreSQL error codes surfaced through PostgREST.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid data store configuration: {0}")]
    Configuration(String),

    #[error("Request to data store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unique constraint violated: {}", .constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Data store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode data store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Data store returned no rows")]
    EmptyResult,
}

impl DatabaseError {
    /// True when this is a unique violation of the named constraint.
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(
            self,
            DatabaseError::UniqueViolation { constraint: Some(name) } if name == constraint
        )
    }

    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(body).ok();

        let Some(error) = parsed else {
            return DatabaseError::Api {
                status,
                message: body.to_string(),
            };
        };

        let message = error.message.unwrap_or_default();
        match error.code.as_deref() {
            Some(UNIQUE_VIOLATION) => DatabaseError::UniqueViolation {
                constraint: quoted_name(&message),
            },
            Some(FOREIGN_KEY_VIOLATION) => {
                DatabaseError::ForeignKeyViolation(error.details.unwrap_or(message))
            }
            _ => DatabaseError::Api { status, message },
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        AppError::Database(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

// `duplicate key value violates unique constraint "queue_day_number_key"`
fn quoted_name(message: &str) -> Option<String> {
    let start = message.find('"')? + 1;
    let len = message[start..].find('"')?;
    Some(message[start..start + len].to_string())
}
