use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 应用级错误
#[derive(Debug, Error)]
pub enum AppError {
    /// 商店 URL / API key 缺失或非法 (API 更新不可用, SQL 仍可用)
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("invalid margin: {0}")]
    InvalidMargin(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("invalid price list line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("nothing to process: {0}")]
    EmptyBatch(&'static str),

    #[error("a supplier id is required to generate SQL")]
    MissingSupplierId,

    #[error("supplier id must be a positive integer, got {0:?}")]
    InvalidSupplierId(String),

    #[error("row {0} does not exist")]
    UnknownRow(usize),

    #[error("no price list loaded")]
    NoPriceList,

    #[error("an update run is already in progress")]
    RunInProgress,

    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidPrice(_)
            | AppError::InvalidMargin(_)
            | AppError::MissingColumns(_)
            | AppError::InvalidRow { .. }
            | AppError::EmptyBatch(_)
            | AppError::MissingSupplierId
            | AppError::InvalidSupplierId(_)
            | AppError::Csv(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownRow(_) | AppError::NoPriceList => StatusCode::NOT_FOUND,
            AppError::RunInProgress => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
