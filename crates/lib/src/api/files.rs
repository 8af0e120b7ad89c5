//! File endpoints
//!
//! Every handler takes an [`AuthSession`] and only ever touches the caller's
//! own namespace.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::{ApiError, ApiResult, AppState, AuthSession};
use crate::files::{FileError, RetrievedFile, StoredFile};

/// Name of the multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

/// Allowance for multipart framing when checking Content-Length up front.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file: StoredFile,
}

/// Handler for GET /files/list
pub async fn handle_list(
    State(state): State<AppState>,
    auth: AuthSession,
) -> ApiResult<Json<FileListResponse>> {
    let files = state.files.list(auth.username()).await?;
    Ok(Json(FileListResponse { files }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    tracing::debug!("Rejected multipart body: {err}");
    ApiError::bad_request(err.body_text())
}

fn too_large(size: u64, max: u64) -> ApiError {
    crate::Error::from(FileError::TooLarge { size, max }).into()
}

/// Handler for POST /files/upload
///
/// The body is streamed to a temporary file chunk by chunk and abandoned as
/// soon as it passes the size cap, so an oversized upload never becomes
/// visible.
pub async fn handle_upload(
    State(state): State<AppState>,
    auth: AuthSession,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let max = state.max_upload_bytes;

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(declared) = declared
        && declared > max.saturating_add(MULTIPART_OVERHEAD)
    {
        return Err(too_large(declared, max));
    }

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if original_name.is_empty() {
            continue;
        }

        let mut upload = state
            .files
            .begin_upload(auth.username(), &original_name, max)
            .await?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if let Err(e) = upload.write(&chunk).await {
                if matches!(e, crate::Error::Files(FileError::TooLarge { .. })) {
                    tracing::info!(
                        "Rejected upload {original_name} from {}: over {max} bytes",
                        auth.username()
                    );
                }
                return Err(e.into());
            }
        }

        let file = upload.finish().await?;
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "File uploaded successfully",
                file,
            }),
        ));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// Handler for GET /files/download/{filename}
pub async fn handle_download(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let retrieved = state.files.retrieve(auth.username(), &filename).await?;
    let disposition = content_disposition("attachment", &retrieved.info.name)?;
    Ok(stream_file(
        retrieved,
        HeaderValue::from_static("application/octet-stream"),
        disposition,
    ))
}

/// Handler for GET /files/preview/{filename}
pub async fn handle_preview(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let (preview, retrieved) = state.files.preview(auth.username(), &filename).await?;
    let disposition = content_disposition("inline", &retrieved.info.name)?;
    let mut response = stream_file(
        retrieved,
        HeaderValue::from_static(preview.content_type),
        disposition,
    );
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

/// Handler for DELETE /files/{filename}
pub async fn handle_delete(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.files.remove(auth.username(), &filename).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

fn stream_file(
    retrieved: RetrievedFile,
    content_type: HeaderValue,
    disposition: HeaderValue,
) -> Response {
    let size = retrieved.info.size;
    let body = Body::from_stream(ReaderStream::new(retrieved.file));

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}

/// Build a Content-Disposition value carrying `name`.
///
/// The quoted `filename` is an ASCII fallback; names with anything else also
/// get an RFC 5987 `filename*`.
fn content_disposition(kind: &str, name: &str) -> ApiResult<HeaderValue> {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let mut value = format!("{kind}; filename=\"{fallback}\"");
    if fallback != name {
        value.push_str("; filename*=UTF-8''");
        value.push_str(&percent_encode(name));
    }

    HeaderValue::from_str(&value).map_err(|e| {
        tracing::error!("Unrepresentable Content-Disposition for {name:?}: {e}");
        ApiError::Internal
    })
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
