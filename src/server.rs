//! HTTP boundary: multipart upload in, JSON result set out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::emotion::{ResultSet, ResultSource};
use crate::errors::EmotionError;
use crate::traits::EmotionModel;
use crate::validation::Validator;
use crate::EmotionAnalyzer;

/// URL prefix under which persisted uploads are served.
pub const UPLOAD_ROUTE: &str = "/static/uploads";

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub struct AppState<M: EmotionModel> {
    analyzer: Arc<EmotionAnalyzer<M>>,
    validator: Validator,
    upload_dir: Arc<PathBuf>,
}

impl<M: EmotionModel> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            analyzer: Arc::clone(&self.analyzer),
            validator: self.validator,
            upload_dir: Arc::clone(&self.upload_dir),
        }
    }
}

impl<M: EmotionModel> AppState<M> {
    pub fn new(analyzer: EmotionAnalyzer<M>, validator: Validator, upload_dir: PathBuf) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            validator,
            upload_dir: Arc::new(upload_dir),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub source: ResultSource,
    pub results: ResultSet,
    pub image_path: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Multipart(MultipartError),
    Service(EmotionError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Multipart(e) => (e.status(), e.body_text()),
            Self::Service(e) => {
                error!(error = ?e, "upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Internal(message) => {
                error!(%message, "upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

/// Validation failures are the uploader's fault; everything else is ours.
impl From<EmotionError> for ApiError {
    fn from(err: EmotionError) -> Self {
        match err {
            EmotionError::Validation(e) => Self::BadRequest(e.to_string()),
            e => Self::Service(e),
        }
    }
}

pub fn router<M: EmotionModel + 'static>(state: AppState<M>) -> Router {
    let body_limit = usize::try_from(state.validator.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let uploads = ServeDir::new(state.upload_dir.as_ref());

    Router::new()
        .route("/health", get(health::<M>))
        .route("/upload", post(upload::<M>))
        .nest_service(UPLOAD_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health<M: EmotionModel + 'static>(State(state): State<AppState<M>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model_loaded": state.analyzer.runtime().is_loaded(),
    }))
}

struct Upload {
    file_name: String,
    content_type: String,
    data: Bytes,
}

async fn upload<M: EmotionModel + 'static>(
    State(state): State<AppState<M>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some(Upload {
            file_name,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if upload.file_name.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }

    state
        .validator
        .validate(&upload.content_type, &upload.data)
        .map_err(EmotionError::from)?;

    let analyzer = Arc::clone(&state.analyzer);
    let data = upload.data.clone();
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let filename = sanitize_filename(&upload.file_name);
    persist_upload(&state.upload_dir, &filename, &upload.data).await?;

    let top = analysis.top().map(|r| r.emotion);
    info!(file = %filename, source = ?analysis.source, ?top, "upload analyzed");

    Ok(Json(UploadResponse {
        success: true,
        source: analysis.source,
        results: analysis.results,
        image_path: format!("{}/{filename}", UPLOAD_ROUTE.trim_start_matches('/')),
    }))
}

/// Write an accepted upload under `upload_dir`, creating the directory if needed.
pub async fn persist_upload(
    upload_dir: &Path,
    filename: &str,
    data: &[u8],
) -> crate::Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|source| EmotionError::FileSystem {
            path: upload_dir.to_path_buf(),
            operation: "create upload directory".to_string(),
            source,
        })?;

    let file_path = upload_dir.join(filename);
    tokio::fs::write(&file_path, data)
        .await
        .map_err(|source| EmotionError::FileSystem {
            path: file_path.clone(),
            operation: "save upload".to_string(),
            source,
        })?;
    Ok(file_path)
}

/// Reduce a client-supplied name to a safe flat file name.
///
/// Directory components are dropped, whitespace becomes `_`, anything outside
/// ASCII alphanumerics and `.-_` is removed, and leading/trailing `.`/`_` are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
