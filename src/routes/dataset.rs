use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;

use crate::{
    error::AppError,
    services::dataset::{columns::dtype_name, reader_for},
    AppState,
};

/// Column suggested as the case weight when present.
pub const DEFAULT_WEIGHT: &str = "peso";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload))
        .route("/close", post(close_file))
}

#[derive(Debug, Serialize)]
pub struct VariableInfo {
    name: String,
    dtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    message: String,
    filename: String,
    rows: usize,
    variables: Vec<VariableInfo>,
    suggested_weight: Option<String>,
    loaded_at: String,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    message: String,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;
    if filename.trim().is_empty() {
        return Err(AppError::InvalidInput("Empty file name".to_string()));
    }
    tracing::info!("Received upload {} ({}KB)", filename, data.len() / 1024);

    let reader = reader_for(&filename)?;
    let dataset = tokio::task::spawn_blocking(move || reader.read(data))
        .await
        .map_err(|e| AppError::Internal(format!("Upload reader task failed: {}", e)))??;

    let variables: Vec<VariableInfo> = dataset
        .frame
        .get_columns()
        .iter()
        .map(|series| VariableInfo {
            name: series.name().to_string(),
            dtype: dtype_name(series.dtype()),
            label: dataset
                .metadata
                .variable(series.name())
                .and_then(|meta| meta.label.clone()),
        })
        .collect();
    let suggested_weight = dataset
        .has_column(DEFAULT_WEIGHT)
        .then(|| DEFAULT_WEIGHT.to_string());
    let rows = dataset.row_count();

    let loaded_at = state.sessions.open(filename.clone(), dataset);
    tracing::info!(
        "Loaded {}: {} rows, {} variables in {:?}",
        filename,
        rows,
        variables.len(),
        start.elapsed()
    );

    Ok(Json(UploadResponse {
        message: format!("File loaded: {}", filename),
        filename,
        rows,
        variables,
        suggested_weight,
        loaded_at: loaded_at.to_rfc3339(),
    }))
}

async fn close_file(State(state): State<Arc<AppState>>) -> Json<CloseResponse> {
    let message = if state.sessions.close() {
        "File closed and memory cleared."
    } else {
        "No file was open."
    };
    Json(CloseResponse {
        message: message.to_string(),
    })
}
