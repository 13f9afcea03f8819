use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;

/// Failure reported by the metadata store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("metadata store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if !matches!(db_err.kind(), ErrorKind::Other) => {
                StoreError::ConstraintViolation(db_err.message().to_string())
            }
            other => StoreError::Unavailable(other),
        }
    }
}

fn mebibytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("file is too large (limit {} MB)", mebibytes(.limit))]
    PayloadTooLarge { limit: u64 },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("failed to write file to disk: {0}")]
    DiskWriteFailed(#[source] std::io::Error),

    #[error("failed to record file metadata: {0}")]
    MetadataWriteFailed(#[source] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("file {id} is missing from disk (storage name {storage_name})")]
    BlobMissing { id: i64, storage_name: String },

    #[error("Metadata store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("Conflict: {0}")]
    ConstraintViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("File not found".to_string()),
            StoreError::Unavailable(e) => AppError::StoreUnavailable(e),
            StoreError::ConstraintViolation(msg) => AppError::ConstraintViolation(msg),
            StoreError::Malformed(msg) => AppError::Internal(format!("Malformed record: {}", msg)),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidFileName(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DiskWriteFailed(_)
            | AppError::MetadataWriteFailed(_)
            | AppError::BlobMissing { .. }
            | AppError::Internal(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message(data, "success")
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            code: 0,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: &str) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::DiskWriteFailed(e) => {
                tracing::error!("Disk write failed: {:?}", e);
                "Failed to save file content".to_string()
            }
            AppError::MetadataWriteFailed(e) => {
                tracing::error!("Metadata write failed: {:?}", e);
                "Failed to save file metadata".to_string()
            }
            AppError::BlobMissing { .. } => {
                tracing::error!("{}", self);
                "File missing from disk".to_string()
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                msg.clone()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                "IO error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ConstraintViolation(msg) => msg.clone(),
            AppError::PayloadTooLarge { .. } | AppError::InvalidFileName(_) => self.to_string(),
        };

        let body = Json(ApiResponse::<()>::error(status.as_u16() as i32, &message));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
