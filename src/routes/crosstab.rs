use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::dataset::DEFAULT_WEIGHT;
use crate::{
    error::AppError,
    services::{
        crosstab::{build_tables, CrosstabRequest, Statistic, TableSet, WeightRounding},
        export::{export_tables, EXPORT_FILENAME},
    },
    AppState,
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crosstab", post(crosstab))
        .route("/export_excel", get(export_excel))
}

#[derive(Debug, Deserialize)]
pub struct CrosstabPayload {
    #[serde(default)]
    rows: Vec<String>,
    #[serde(default)]
    cols: Vec<String>,
    weight: Option<String>,
    #[serde(default)]
    options: Vec<Statistic>,
    #[serde(default, alias = "rounding")]
    niw_mode: WeightRounding,
}

#[derive(Debug, Serialize)]
struct CrosstabResponse<'a> {
    tables: &'a TableSet,
}

async fn crosstab(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CrosstabPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let handle = state.sessions.dataset()?;
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let weight = match payload.weight.filter(|w| !w.trim().is_empty()) {
        Some(weight) => weight,
        None if handle.dataset.has_column(DEFAULT_WEIGHT) => DEFAULT_WEIGHT.to_string(),
        None => {
            return Err(AppError::InvalidInput(
                "Select a weight variable".to_string(),
            ))
        }
    };

    let request = CrosstabRequest {
        rows: payload.rows,
        cols: payload.cols,
        weight,
        statistics: payload.options.into_iter().collect(),
        rounding: payload.niw_mode,
        significance_threshold: state.config.significance_threshold,
    };
    tracing::info!(
        "Crosstab requested on {}: rows={:?} cols={:?} weight={} options={:?} mode={:?}",
        state.sessions.filename().unwrap_or_default(),
        request.rows,
        request.cols,
        request.weight,
        request.statistics,
        request.rounding
    );

    let dataset = Arc::clone(&handle.dataset);
    let tables = tokio::task::spawn_blocking(move || build_tables(&dataset, &request))
        .await
        .map_err(|e| AppError::Internal(format!("Crosstab task failed: {}", e)))??;
    let tables = Arc::new(tables);

    state.sessions.store_tables(handle.generation, Arc::clone(&tables));

    Ok(Json(CrosstabResponse { tables: &tables }).into_response())
}

async fn export_excel(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let tables = state.sessions.tables()?;
    let bytes = tokio::task::spawn_blocking(move || export_tables(&tables))
        .await
        .map_err(|e| AppError::Internal(format!("Export task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        bytes,
    )
        .into_response())
}
