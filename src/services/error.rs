//! Error type shared by the content services

/// Error types for mentor, post, comment, content, submission, booking and
/// review operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Entity not found
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error (missing or malformed input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate key or an operation that no longer applies
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller lacks permission
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

/// Returns a validation error naming the first blank field
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), ServiceError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ServiceError::validation(format!("{} is required", name)));
        }
    }
    Ok(())
}

/// Minimal `local@domain.tld` shape check
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}
