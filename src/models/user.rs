//! User model
//!
//! A user row doubles as the account profile. Profiles may be linked to a
//! mentor record once a mentor registration is approved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::string_enum;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Email address (unique, login identifier)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    /// Mentor record this profile manages, if any
    pub mentor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user. The password must already be hashed.
    pub fn new(email: String, full_name: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            email,
            password_hash,
            full_name,
            avatar_url: None,
            phone: None,
            role,
            status: UserStatus::Active,
            mentor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Mentor role with a linked mentor record
    pub fn manages_mentor(&self, mentor_id: i64) -> bool {
        self.role == UserRole::Mentor && self.mentor_id == Some(mentor_id)
    }

    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }
}

/// User role for authorization.
///
/// - User: browses, books mentors, leaves reviews and comments
/// - Mentor: additionally manages bookings for the linked mentor record
/// - Admin: full back-office access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Mentor,
    Admin,
}

string_enum!(UserRole, "user role", {
    User => "user",
    Mentor => "mentor",
    Admin => "admin",
});

/// Account state; banned users cannot log in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Banned,
}

string_enum!(UserStatus, "user status", {
    Active => "active",
    Banned => "banned",
});

/// Self-service profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

/// Admin user listing filter
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Matches name or email
    pub q: Option<String>,
    pub role: Option<UserRole>,
    pub limit: i64,
    pub offset: i64,
}
