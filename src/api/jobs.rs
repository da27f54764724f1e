use super::AppState;
use crate::error::AppError;
use crate::orchestration::{AutoPilotSummary, JobOutcome, PollSummary, Trigger};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobResponse<T> {
    Completed { summary: T },
    AlreadyRunning,
}

/// `409 Conflict` when another run holds the job lock.
fn respond<T: Serialize>(outcome: JobOutcome<T>) -> (StatusCode, Json<JobResponse<T>>) {
    match outcome {
        JobOutcome::Completed(summary) => (StatusCode::OK, Json(JobResponse::Completed { summary })),
        JobOutcome::AlreadyRunning => (StatusCode::CONFLICT, Json(JobResponse::AlreadyRunning)),
    }
}

pub async fn post_autopilot(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobResponse<AutoPilotSummary>>), AppError> {
    let outcome = state.jobs.run_autopilot(Trigger::Manual).await?;
    Ok(respond(outcome))
}

pub async fn post_poll(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobResponse<PollSummary>>), AppError> {
    let outcome = state.jobs.run_polling(Trigger::Manual).await?;
    Ok(respond(outcome))
}
