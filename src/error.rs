use crate::domain::SettingsError;
use crate::marketplace::MarketplaceError;
use crate::orchestration::{ApplyError, ManualError, PricingError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<MarketplaceError> for AppError {
    fn from(err: MarketplaceError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Settings(e) => e.into(),
            PricingError::Db(e) => e.into(),
        }
    }
}

impl From<ApplyError> for AppError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::Gate(_) | ApplyError::MissingReference(_) => {
                AppError::BadRequest(err.to_string())
            }
            ApplyError::Upstream(_) | ApplyError::Rejected { .. } => {
                AppError::Upstream(err.to_string())
            }
            ApplyError::Db(e) => e.into(),
        }
    }
}

impl From<ManualError> for AppError {
    fn from(err: ManualError) -> Self {
        match err {
            ManualError::NotFound(_) => AppError::NotFound(err.to_string()),
            ManualError::NoSuggestion(_) => AppError::BadRequest(err.to_string()),
            ManualError::Pricing(e) => e.into(),
            ManualError::Apply(e) => e.into(),
            ManualError::Db(e) => e.into(),
            ManualError::Panicked(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
