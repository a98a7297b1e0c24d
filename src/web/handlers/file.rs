//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::file::FileService;
use crate::web::dto::{ApiResponse, FileResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes and backslashes replaced in
/// the plain `filename` parameter. Names that are not plain ASCII also get
/// an RFC 5987 `filename*` parameter carrying the exact UTF-8 name.
fn content_disposition_header(filename: &str) -> String {
    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// POST /api/files/upload - Upload a file as multipart field `file`.
///
/// The field is streamed straight to storage; it is never held in memory.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let service = FileService::new(state.db.pool(), &state.storage);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        // A body that breaks off mid-field is the client's fault, not storage's.
        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let reader = std::pin::pin!(reader);

        let record = service
            .upload(&user, reader, filename.as_deref(), content_type)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::new(FileResponse::from(record))),
        ));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// GET /api/files - List the caller's files, newest first.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let records = FileService::new(state.db.pool(), &state.storage)
        .list(&user)
        .await?;

    let files = records.into_iter().map(FileResponse::from).collect();
    Ok(Json(ApiResponse::new(files)))
}

/// GET /api/files/:id - File metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = FileService::new(state.db.pool(), &state.storage)
        .get(&user, file_id)
        .await?;

    Ok(Json(ApiResponse::new(FileResponse::from(record))))
}

/// GET /api/files/:id/download - Stream file content.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
) -> Result<Response, ApiError> {
    let (record, file) = FileService::new(state.db.pool(), &state.storage)
        .open_download(&user, file_id)
        .await?;

    let content_type = record
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let disposition = HeaderValue::from_str(&content_disposition_header(&record.original_name))
        .map_err(|e| {
            tracing::error!("Invalid Content-Disposition for file {}: {}", record.id, e);
            ApiError::internal("Failed to build response")
        })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, record.size_bytes)
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(file_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    FileService::new(state.db.pool(), &state.storage)
        .delete(&user, file_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_header_simple_ascii() {
        let result = content_disposition_header("document.txt");
        assert_eq!(result, "attachment; filename=\"document.txt\"");
    }

    #[test]
    fn test_content_disposition_header_with_spaces() {
        let result = content_disposition_header("my document.txt");
        assert_eq!(result, "attachment; filename=\"my document.txt\"");
    }

    #[test]
    fn test_content_disposition_header_non_ascii() {
        let result = content_disposition_header("résumé.pdf");
        assert!(result.starts_with("attachment; filename=\"r_sum_.pdf\""));
        assert!(result.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
        assert!(HeaderValue::from_str(&result).is_ok());
    }

    #[test]
    fn test_content_disposition_header_double_quote() {
        let result = content_disposition_header("test\"file.txt");
        assert!(result.contains("filename=\"test_file.txt\""));
        assert!(result.contains("filename*=UTF-8''test%22file.txt"));
    }

    #[test]
    fn test_content_disposition_header_backslash() {
        let result = content_disposition_header("test\\file.txt");
        assert!(result.contains("filename=\"test_file.txt\""));
    }

    #[test]
    fn test_content_disposition_header_crlf_injection() {
        let result = content_disposition_header("evil\r\nSet-Cookie: x=1.txt");
        assert!(!result.contains('\r'));
        assert!(!result.contains('\n'));
        assert!(HeaderValue::from_str(&result).is_ok());
    }
}
