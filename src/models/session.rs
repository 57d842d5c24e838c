//! Session and one-time code models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    pub user_id: i64,
    /// Created by code exchange; allows setting a password without the old one
    pub is_recovery: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// One-time code sent by email and exchanged for a recovery session
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthCode {
    pub id: i64,
    pub email: String,
    /// SHA-256 of the code, hex encoded
    pub code_hash: String,
    /// Wrong guesses recorded against this code
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthCode {
    pub fn is_usable(&self) -> bool {
        self.consumed_at.is_none() && self.expires_at > Utc::now()
    }
}
