use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No file loaded")]
    NoDataset,
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("File processing error: {0}")]
    FileProcessingError(String),
    #[error("Failed to build table {pair}: {cause}")]
    Computation { pair: String, cause: String },
    #[error("Export error: {0}")]
    Export(String),
    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("DataFrame error: {0}")]
    DataFrameError(#[from] polars::error::PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn computation(pair: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AppError::Computation {
            pair: pair.into(),
            cause: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::NoDataset
            | AppError::UnsupportedFormat(_)
            | AppError::FileProcessingError(_)
            | AppError::ParseError(_)
            | AppError::Export(_) => StatusCode::BAD_REQUEST,
            AppError::Computation { .. }
            | AppError::Xlsx(_)
            | AppError::DataFrameError(_)
            | AppError::IoError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
