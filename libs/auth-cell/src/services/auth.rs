use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::UserRole;
use shared_utils::jwt::issue_token;
use shared_utils::AppState;

use crate::models::{AuthError, Credentials, LoginResponse, NewUser, UserProfile, UserRecord};
use crate::services::password::PasswordService;

pub const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

const DEFAULT_USERS: [(&str, &str, &str, UserRole); 2] = [
    ("Admin User", "admin@clinic.com", "admin123", UserRole::Admin),
    ("Front Desk User", "frontdesk@clinic.com", "frontdesk123", UserRole::FrontDesk),
];

pub struct AuthService {
    supabase: Arc<SupabaseClient>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn login(&self, credentials: Credentials) -> Result<LoginResponse, AuthError> {
        debug!("Login attempt for {}", credentials.email);

        let Some(record) = self.find_by_email(&credentials.email).await? else {
            warn!("Login failed: unknown email {}", credentials.email);
            return Err(AuthError::InvalidCredentials);
        };

        if !PasswordService::verify_password(&credentials.password, &record.password_hash)? {
            warn!("Login failed: wrong password for user {}", record.id);
            return Err(AuthError::InvalidCredentials);
        }

        let user = UserProfile::from(record);
        let token = issue_token(&user.to_user(), &self.config.jwt_secret, self.config.jwt_ttl_hours)
            .map_err(AuthError::Token)?;

        info!("User {} logged in", user.id);

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user,
        })
    }

    pub async fn register(&self, new_user: NewUser) -> Result<UserProfile, AuthError> {
        debug!("Registering user {}", new_user.email);

        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let profile = self.create_user(&new_user).await?;
        info!("User {} registered with role {}", profile.id, profile.role);

        Ok(profile)
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AuthError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let record: Option<UserRecord> = self.supabase.select_one(&path).await?;

        record.map(UserProfile::from).ok_or(AuthError::NotFound)
    }

    /// Creates the stock admin and front-desk accounts on an empty install.
    pub async fn ensure_default_users(&self) -> Result<(), AuthError> {
        if !self.config.seed_default_users {
            return Ok(());
        }

        let (_, admin_email, _, _) = DEFAULT_USERS[0];
        if self.find_by_email(admin_email).await?.is_some() {
            debug!("Default users already present");
            return Ok(());
        }

        for (name, email, password, role) in DEFAULT_USERS {
            if self.find_by_email(email).await?.is_some() {
                continue;
            }
            let new_user = NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role,
            };
            self.create_user(&new_user).await?;
            info!("Created default {} account {}", role, email);
        }

        Ok(())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<UserProfile, AuthError> {
        let password_hash = PasswordService::hash_password(&new_user.password)?;

        let row = json!({
            "name": new_user.name,
            "email": new_user.email,
            "password_hash": password_hash,
            "role": new_user.role,
        });

        let record: UserRecord = self.supabase.insert("users", row).await.map_err(|e| {
            if e.violates(USERS_EMAIL_CONSTRAINT) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(UserProfile::from(record))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let path = format!("/rest/v1/users?email=eq.{}", urlencoding::encode(email));
        Ok(self.supabase.select_one(&path).await?)
    }
}
