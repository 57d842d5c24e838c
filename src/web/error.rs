//! Page rendering errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    /// Embedded template is missing or not valid UTF-8
    #[error("Template not loadable: {0}")]
    Load(String),

    /// Tera parse or render failure, with its cause chain
    #[error("Template error: {0}")]
    Template(String),
}
