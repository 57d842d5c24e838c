//! User service
//!
//! Implements business logic for accounts and profiles:
//! - Registration (first user becomes admin)
//! - Password login, logout and session validation
//! - One-time email codes exchanged for short recovery sessions
//! - Password changes, profile edits and admin role/status management

use crate::config::AuthConfig;
use crate::db::repositories::{AuthCodeRepository, SessionRepository, UserRepository};
use crate::models::{
    PageParams, PagedResult, Session, UpdateProfileInput, User, UserFilter, UserRole, UserStatus,
};
use crate::services::email::{generate_code, EmailError, EmailService};
use crate::services::error::is_valid_email;
use crate::services::password::{check_password_policy, hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Wrong guesses an outstanding sign-in code survives
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// The account is banned
    #[error("Your account has been banned. Please contact the administrator.")]
    UserBanned,

    /// Code unknown, expired or already used
    #[error("Invalid or expired code")]
    InvalidCode,

    /// User not found
    #[error("User not found: {0}")]
    NotFound(i64),

    /// Operation not allowed for the caller
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

impl RegisterInput {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: full_name.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    code_repo: Arc<dyn AuthCodeRepository>,
    email: Arc<EmailService>,
    auth: AuthConfig,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        code_repo: Arc<dyn AuthCodeRepository>,
        email: Arc<EmailService>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            code_repo,
            email,
            auth,
        }
    }

    /// Session lifetime in seconds, for the cookie `Max-Age`
    pub fn session_max_age(&self, session: &Session) -> i64 {
        (session.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// Register a new user
    ///
    /// The first account in the system is created as `admin`; everyone else
    /// starts as `user`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a blank name, malformed email or weak password
    /// - `UserExists` if the email is already registered
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        let full_name = input.full_name.trim().to_string();

        if full_name.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Full name cannot be empty".to_string(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(email));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(email, full_name, password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!("Registered user {} as {}", created.id, created.role);
        Ok(created)
    }

    /// Login with email and password
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if the credentials are invalid
    /// - `UserBanned` if the password matched a banned account
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&normalize_email(&input.email))
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        if user.is_banned() {
            return Err(UserServiceError::UserBanned);
        }

        let session = self
            .create_session(user.id, false, Duration::days(self.auth.session_days))
            .await?;
        Ok((user, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its session and user
    ///
    /// Returns `None` for unknown tokens. Expired sessions are deleted and
    /// also yield `None`.
    pub async fn validate_session(
        &self,
        token: &str,
    ) -> Result<Option<(Session, User)>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.map(|u| (session, u)))
    }

    /// Email a one-time code for `email`
    ///
    /// Unknown addresses are accepted silently so the endpoint does not
    /// reveal which emails are registered. When mail is disabled the code
    /// is still stored and a warning is logged.
    pub async fn request_code(&self, email: &str) -> Result<(), UserServiceError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }

        let code = match self.issue_code(&email).await? {
            Some(code) => code,
            None => {
                tracing::debug!("Code requested for unknown email");
                return Ok(());
            }
        };

        match self
            .email
            .send_code(&email, &code, self.auth.code_ttl_minutes)
            .await
        {
            Ok(()) => Ok(()),
            Err(EmailError::MailDisabled) => {
                tracing::warn!("Mail is disabled; sign-in code for {} was not delivered", email);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to send sign-in code: {}", e);
                Err(UserServiceError::InternalError(anyhow::anyhow!(e)))
            }
        }
    }

    /// Store a fresh code for a registered email, invalidating older ones.
    /// Returns the plain code, or `None` for unknown addresses.
    async fn issue_code(&self, email: &str) -> Result<Option<String>, UserServiceError> {
        if self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?
            .is_none()
        {
            return Ok(None);
        }

        self.code_repo
            .consume_all(email)
            .await
            .context("Failed to invalidate old codes")?;

        let code = generate_code()?;
        let expires_at = Utc::now() + Duration::minutes(self.auth.code_ttl_minutes);
        self.code_repo
            .create(email, &hash_code(&code), expires_at)
            .await
            .context("Failed to store code")?;

        Ok(Some(code))
    }

    /// Exchange a one-time code for a recovery session
    ///
    /// Recovery sessions are short lived and allow setting a new password
    /// without the current one. Every wrong guess counts against the
    /// outstanding code, which is revoked after [`MAX_CODE_ATTEMPTS`].
    pub async fn exchange_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = normalize_email(email);
        let stored = match self
            .code_repo
            .find_usable(&email, &hash_code(code.trim()))
            .await
            .context("Failed to look up code")?
        {
            Some(stored) => stored,
            None => {
                let burned = self
                    .code_repo
                    .record_miss(&email, MAX_CODE_ATTEMPTS)
                    .await
                    .context("Failed to record code attempt")?;
                if burned > 0 {
                    tracing::warn!("Sign-in code for {} revoked after repeated wrong guesses", email);
                }
                return Err(UserServiceError::InvalidCode);
            }
        };

        if !self
            .code_repo
            .consume(stored.id)
            .await
            .context("Failed to consume code")?
        {
            return Err(UserServiceError::InvalidCode);
        }

        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to get user by email")?
            .ok_or(UserServiceError::InvalidCode)?;
        if user.is_banned() {
            return Err(UserServiceError::UserBanned);
        }

        let session = self
            .create_session(
                user.id,
                true,
                Duration::minutes(self.auth.recovery_session_minutes),
            )
            .await?;
        Ok((user, session))
    }

    /// Change the password of the session's user
    ///
    /// Normal sessions must supply the current password; recovery sessions
    /// may skip it. Every other session of the user is revoked.
    pub async fn update_password(
        &self,
        user: &User,
        session: &Session,
        current_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if !session.is_recovery {
            let current = current_password.unwrap_or_default();
            let valid = verify_password(current, &user.password_hash)
                .context("Failed to verify password")?;
            if !valid {
                return Err(UserServiceError::AuthenticationError(
                    "Current password is incorrect".to_string(),
                ));
            }
        }

        check_password_policy(new_password).map_err(UserServiceError::ValidationError)?;

        let password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user.id, &password_hash)
            .await
            .context("Failed to update password")?;
        self.session_repo
            .delete_others(user.id, &session.id)
            .await
            .context("Failed to revoke sessions")?;

        tracing::info!("Password changed for user {}", user.id);
        Ok(())
    }

    /// Update name, avatar and phone. Empty optional fields are cleared.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        if let Some(name) = input.full_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(UserServiceError::ValidationError(
                    "Full name cannot be empty".to_string(),
                ));
            }
            user.full_name = name.to_string();
        }
        if let Some(avatar) = input.avatar_url {
            user.avatar_url = non_empty(avatar);
        }
        if let Some(phone) = input.phone {
            user.phone = non_empty(phone);
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(updated)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }

    /// Admin listing filtered by name/email and role
    pub async fn list_users(
        &self,
        q: Option<String>,
        role: Option<UserRole>,
        params: PageParams,
    ) -> Result<PagedResult<User>, UserServiceError> {
        let filter = UserFilter {
            q: q.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            role,
            limit: params.limit(),
            offset: params.offset(),
        };
        let (users, total) = self
            .user_repo
            .list(&filter)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change a user's role. Admins cannot demote themselves.
    pub async fn set_role(
        &self,
        actor: &User,
        user_id: i64,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        if actor.id == user_id && actor.is_admin() && role != UserRole::Admin {
            return Err(UserServiceError::Forbidden(
                "You cannot remove your own admin role".to_string(),
            ));
        }

        let mut user = self.require_user(user_id).await?;
        user.role = role;
        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update role")?;

        tracing::info!("User {} set role of {} to {}", actor.id, user_id, role);
        Ok(updated)
    }

    /// Ban or reactivate a user. Banning revokes every session.
    pub async fn set_status(
        &self,
        actor: &User,
        user_id: i64,
        status: UserStatus,
    ) -> Result<User, UserServiceError> {
        if actor.id == user_id && status == UserStatus::Banned {
            return Err(UserServiceError::Forbidden(
                "You cannot ban yourself".to_string(),
            ));
        }

        let mut user = self.require_user(user_id).await?;
        user.status = status;
        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update status")?;

        if status == UserStatus::Banned {
            self.session_repo
                .delete_by_user(user_id)
                .await
                .context("Failed to revoke sessions")?;
        }
        Ok(updated)
    }

    /// Link a profile to a mentor record, or unlink with `None`.
    /// Linking promotes plain users to the `mentor` role.
    pub async fn link_mentor(
        &self,
        user_id: i64,
        mentor_id: Option<i64>,
    ) -> Result<User, UserServiceError> {
        let mut user = self.require_user(user_id).await?;
        user.mentor_id = mentor_id;
        if mentor_id.is_some() && user.role == UserRole::User {
            user.role = UserRole::Mentor;
        }
        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to link mentor")?;
        Ok(updated)
    }

    /// Check if this is the first user (for auto-admin)
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    /// Delete expired sessions and spent codes
    ///
    /// Returns the number of sessions and codes removed.
    pub async fn cleanup_expired(&self) -> Result<(i64, i64), UserServiceError> {
        let sessions = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        let codes = self
            .code_repo
            .delete_expired()
            .await
            .context("Failed to delete expired codes")?;
        Ok((sessions, codes))
    }

    async fn require_user(&self, user_id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound(user_id))
    }

    async fn create_session(
        &self,
        user_id: i64,
        is_recovery: bool,
        lifetime: Duration,
    ) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            is_recovery,
            expires_at: now + lifetime,
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// SHA-256 of a one-time code, hex encoded
pub(crate) fn hash_code(code: &str) -> String {
    format!("{:x}", Sha256::digest(code.as_bytes()))
}
