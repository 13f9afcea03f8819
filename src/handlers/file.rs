use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{FileListResponse, FileRecord, FileResponse};
use crate::AppState;

/// Upload a file
/// POST /api/upload (multipart: `document`, optional `description`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>)> {
    let limit = state.files.max_upload_bytes();
    let mut spooled: Option<(PathBuf, u64)> = None;
    let mut file_name: Option<String> = None;
    let mut description: Option<String> = None;

    let result: Result<FileRecord> = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "document" if spooled.is_none() => {
                    file_name = field.file_name().map(|s| s.to_string());

                    // Spool to a temp file so the declared size is known up front
                    let temp_path =
                        std::env::temp_dir().join(format!("filedepot_upload_{}", Uuid::new_v4()));
                    let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| {
                        AppError::Internal(format!("Failed to create temp file: {}", e))
                    })?;
                    spooled = Some((temp_path, 0));

                    while let Some(chunk) =
                        field.chunk().await.map_err(|e| multipart_error(e, limit))?
                    {
                        file.write_all(&chunk).await.map_err(|e| {
                            AppError::Internal(format!("Failed to write to temp file: {}", e))
                        })?;
                        if let Some((_, len)) = spooled.as_mut() {
                            *len += chunk.len() as u64;
                        }
                    }

                    file.flush().await.map_err(|e| {
                        AppError::Internal(format!("Failed to flush temp file: {}", e))
                    })?;
                }
                "description" => {
                    let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                    if !text.is_empty() {
                        description = Some(text);
                    }
                }
                _ => {}
            }
        }

        let (temp_path, declared_size) = spooled
            .clone()
            .ok_or_else(|| AppError::BadRequest("Invalid file".to_string()))?;
        let file_name = file_name
            .take()
            .ok_or_else(|| AppError::BadRequest("No file name provided".to_string()))?;

        let reader = tokio::fs::File::open(&temp_path).await?;
        state
            .files
            .create_file(reader, declared_size, &file_name, description.take())
            .await
    }
    .await;

    // Cleanup temp file
    if let Some((temp_path, _)) = &spooled {
        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            tracing::error!("Failed to remove temp file {:?}: {}", temp_path, e);
        }
    }

    let record = result?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            FileResponse::from(record),
            "File uploaded successfully",
        )),
    ))
}

/// List all files
/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FileListResponse>>> {
    let listing = state.files.list_files().await?;
    Ok(Json(ApiResponse::with_message(
        FileListResponse::from(listing),
        "Files retrieved",
    )))
}

/// Get a file's metadata
/// GET /api/files/:id
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>> {
    let stored = state.files.get_file(id).await?;
    Ok(Json(ApiResponse::success(FileResponse::from(stored.record))))
}

/// Download a file
/// GET /api/download/:id
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let stored = state.files.get_file(id).await?;

    let file = stored.blob.open().await?;
    let length = file.metadata().await?.len();
    tracing::debug!("Streaming file {} from {:?}", id, stored.blob.path());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&stored.record.display_name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(display_name: &str) -> String {
    let fallback_name = display_name.replace(
        |c: char| c == '"' || c == '\\' || !c.is_ascii() || c.is_ascii_control(),
        "_",
    );
    let encoded_name = urlencoding::encode(display_name);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_name, encoded_name
    )
}

fn multipart_error(err: MultipartError, limit: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::BadRequest(format!("Failed to process multipart: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::NamingScheme;
    use crate::test_support::{blob_names, TestEnv};
    use axum::{body::to_bytes, http::Request, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XfiledepotX";

    fn app(env: TestEnv) -> (Router, TestEnv) {
        let state = AppState {
            config: Arc::new(Config::default()),
            files: env.service.clone(),
        };
        (crate::create_router(state), env)
    }

    fn multipart_body(file_name: &str, content: &[u8], description: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                f = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
        if let Some(description) = description {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\n{d}\r\n",
                    b = BOUNDARY,
                    d = description
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_list_download() {
        let (router, _env) = app(TestEnv::new(NamingScheme::Unique).await);
        let payload = b"line one\nline two\n";

        let response = router
            .clone()
            .oneshot(upload_request(multipart_body("Notes (final).txt", payload, Some("  minutes "))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "File uploaded successfully");
        assert_eq!(json["data"]["fileName"], "Notes (final).txt");
        assert_eq!(json["data"]["sizeBytes"], payload.len());
        assert_eq!(json["data"]["description"], "  minutes ");
        let id = json["data"]["id"].as_i64().unwrap();

        let response = router
            .clone()
            .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["files"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"]["skipped"], 0);

        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/api/download/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(
            disposition,
            "attachment; filename=\"Notes (final).txt\"; filename*=UTF-8''Notes%20%28final%29.txt"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], payload);
    }

    #[test]
    fn test_content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("résumé \"final\".pdf"),
            "attachment; filename=\"r_sum_ _final_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%22final%22.pdf"
        );
    }

    #[tokio::test]
    async fn test_upload_without_document() {
        let (router, env) = app(TestEnv::new(NamingScheme::Unique).await);
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nlonely\r\n--{b}--\r\n",
            b = BOUNDARY
        );

        let response = router.oneshot(upload_request(body.into_bytes())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(blob_names(&env.upload_dir).is_empty());
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let (router, env) = app(TestEnv::with_limit(NamingScheme::Unique, 4).await);

        let response = router
            .oneshot(upload_request(multipart_body("big.bin", b"12345", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(blob_names(&env.upload_dir).is_empty());
    }

    #[tokio::test]
    async fn test_download_unknown_id() {
        let (router, _env) = app(TestEnv::new(NamingScheme::Unique).await);

        let response = router
            .oneshot(Request::get("/api/download/41").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["code"], 404);
    }
}
