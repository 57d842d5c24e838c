//! File storage
//!
//! Uploads land in `{storage.path}/{bucket}/{uuid}.{ext}` and are served
//! publicly from `/storage/{bucket}/{file}`.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Uploads to {0} are limited to admins")]
    Forbidden(String),

    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("File too large. Maximum size: {max} bytes")]
    TooLarge { max: u64 },

    #[error("Empty file")]
    Empty,

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata for a stored file
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub bucket: String,
    /// File name within the bucket
    pub path: String,
    /// Absolute public URL
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

pub struct StorageService {
    config: StorageConfig,
    public_url: String,
}

impl StorageService {
    pub fn new(config: StorageConfig, public_url: impl Into<String>) -> Self {
        Self {
            config,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.config.path
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Store an upload; `by_admin` lifts the `user_buckets` restriction.
    pub async fn upload(
        &self,
        bucket: &str,
        content_type: &str,
        data: &[u8],
        by_admin: bool,
    ) -> Result<StoredObject, StorageError> {
        self.check_bucket(bucket)?;
        if !by_admin && !self.config.is_user_bucket(bucket) {
            return Err(StorageError::Forbidden(bucket.to_string()));
        }
        if !self.config.is_type_allowed(content_type) {
            return Err(StorageError::InvalidType(content_type.to_string()));
        }
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() as u64 > self.config.max_file_size {
            return Err(StorageError::TooLarge {
                max: self.config.max_file_size,
            });
        }

        let dir = self.config.path.join(bucket);
        fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), self.config.get_extension(content_type));
        fs::write(dir.join(&name), data).await?;
        tracing::info!("Stored {} bytes as {}/{}", data.len(), bucket, name);

        Ok(StoredObject {
            bucket: bucket.to_string(),
            url: self.public_url(bucket, &name),
            path: name,
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    /// Public URL for a stored file. Does not check that the file exists.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/{}/{}",
            self.public_url,
            urlencoding::encode(bucket),
            urlencoding::encode(path)
        )
    }

    pub async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        self.check_bucket(bucket)?;
        if !is_plain_file_name(path) {
            return Err(StorageError::InvalidName(path.to_string()));
        }
        let file = self.config.path.join(bucket).join(path);
        match fs::remove_file(&file).await {
            Ok(()) => {
                tracing::info!("Removed {}/{}", bucket, path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{}/{}", bucket, path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn check_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.config.has_bucket(bucket) {
            Ok(())
        } else {
            Err(StorageError::UnknownBucket(bucket.to_string()))
        }
    }
}

/// A single path segment without traversal or hidden-file tricks
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
