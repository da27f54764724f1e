use super::AppState;
use crate::db::AlertRecord;
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

const DEFAULT_ALERTS_LIMIT: i64 = 100;
const MAX_ALERTS_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

pub async fn list_alerts(
    Query(params): Query<AlertsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AlertRecord>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ALERTS_LIMIT)
        .clamp(1, MAX_ALERTS_LIMIT);
    let alerts = state
        .repo
        .list_alerts(params.unread_only.unwrap_or(false), limit)
        .await?;
    Ok(Json(alerts))
}

pub async fn mark_alert_read(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.repo.mark_alert_read(id).await? {
        return Err(AppError::NotFound(format!("alert {}", id)));
    }
    Ok(Json(serde_json::json!({"id": id, "read": true})))
}
