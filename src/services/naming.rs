use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, Result};

const MAX_FILE_NAME_BYTES: usize = 255;
const MAX_EXTENSION_CHARS: usize = 16;

/// How on-disk blob names are derived from uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// `{unix_seconds}_{uuid}{.ext}`, unique per upload
    #[default]
    Unique,
    /// `{unix_seconds}_{original_name}`. Two uploads of the same name within
    /// one second share a blob, and the last writer's bytes win. If one of
    /// them then fails its metadata write, removing its blob also removes the
    /// bytes behind the other upload's committed record.
    Timestamp,
}

impl FromStr for NamingScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unique" => Ok(Self::Unique),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(format!("unknown naming scheme '{}'", other)),
        }
    }
}

impl NamingScheme {
    /// Derive the storage name for `original_name` uploaded at `now`
    pub fn storage_name(&self, original_name: &str, now: DateTime<Utc>) -> String {
        match self {
            NamingScheme::Timestamp => format!("{}_{}", now.timestamp(), original_name),
            NamingScheme::Unique => format!(
                "{}_{}{}",
                now.timestamp(),
                Uuid::new_v4().simple(),
                extension_suffix(original_name)
            ),
        }
    }
}

fn extension_suffix(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Reject names that could escape the blob root or cannot be stored
pub fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.len() > MAX_FILE_NAME_BYTES;

    if invalid {
        return Err(AppError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Reject derived storage names the file system cannot hold
pub fn validate_storage_name(original_name: &str, storage_name: &str) -> Result<()> {
    if storage_name.len() > MAX_FILE_NAME_BYTES {
        return Err(AppError::InvalidFileName(original_name.to_string()));
    }
    Ok(())
}
