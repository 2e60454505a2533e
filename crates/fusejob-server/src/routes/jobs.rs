//! Job endpoints.
//!
//! `POST /jobs` takes either a bare request or an `{ "id", "input" }`
//! envelope and answers with the job response. A failed job is still a
//! `200`; only malformed or invalid requests get a client error status.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use fusejob_engine::DispatchOutput;
use fusejob_engine::health::diagnose;
use fusejob_types::{DiagnosticReport, FailureKind, JobEnvelope};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Run one job. Jobs are serialized through the state's job gate.
///
/// The job runs on its own task holding the gate, so a client that
/// disconnects mid-job neither cancels it nor frees the harness early.
pub async fn job_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<JobEnvelope>, JsonRejection>,
) -> Result<Response> {
    let Json(envelope) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let gate = state.job_gate.clone().lock_owned().await;
    let dispatcher = state.dispatcher.clone();
    let output = tokio::spawn(async move {
        let output = dispatcher.dispatch(envelope).await;
        drop(gate);
        output
    })
    .await
    .map_err(|e| ServerError::Internal(format!("job task failed: {e}")))?;

    let status = match &output {
        DispatchOutput::Job(response)
            if response.failure_kind() == Some(FailureKind::InvalidRequest) =>
        {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::OK,
    };

    Ok((status, Json(output)).into_response())
}

/// Environment report for fixing the strategy catalog.
pub async fn diagnose_handler(State(state): State<AppState>) -> Json<DiagnosticReport> {
    let _gate = state.job_gate.lock().await;
    Json(diagnose(state.dispatcher.harness().config()).await)
}

/// Create job routes.
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(job_handler))
        .route("/diagnose", post(diagnose_handler))
}
