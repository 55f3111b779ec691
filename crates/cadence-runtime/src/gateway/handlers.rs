use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cadence_core::workflow::{parse_anchor_date, ProcessKind, StepStatus};
use cadence_core::{CadenceError, Result};

use super::response::{ApiError, ApiResponse};
use crate::Engine;

/// Shared handler state.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<Engine>,
    /// Cancels an HTTP-triggered sweep on shutdown.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub process_id: String,
    pub process_title: String,
    /// `YYYY-MM-DD`.
    pub anchor_date: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    ProcessKind::ExamResult.as_str().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepRequest {
    /// Sweep date; the engine's today when absent.
    #[serde(default)]
    pub today: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_instances(State(state): State<GatewayState>) -> ApiResponse {
    ApiResponse::from_result(state.engine.list_instances().await)
}

pub async fn create_instance(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<CreateInstanceRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };

    let result = async {
        let anchor = parse_anchor_date(&req.anchor_date)?;
        let kind: ProcessKind = req.kind.parse()?;
        state
            .engine
            .create_instance(&req.process_id, &req.process_title, anchor, kind)
            .await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn get_instance(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResponse {
    let result = async { state.engine.get_instance(parse_id(&id)?).await }.await;
    ApiResponse::from_result(result)
}

pub async fn transition_step(
    State(state): State<GatewayState>,
    Path((id, step_id)): Path<(String, String)>,
    body: std::result::Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };

    let result = async {
        let id = parse_id(&id)?;
        let status: StepStatus = req.status.parse()?;
        state.engine.transition_step(id, &step_id, status).await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn override_step(
    State(state): State<GatewayState>,
    Path((id, step_id)): Path<(String, String)>,
    body: std::result::Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };

    let result = async {
        let id = parse_id(&id)?;
        let status: StepStatus = req.status.parse()?;
        state.engine.override_step_status(id, &step_id, status).await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn pause_instance(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResponse {
    let result = async { state.engine.pause_instance(parse_id(&id)?).await }.await;
    ApiResponse::from_result(result)
}

pub async fn resume_instance(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResponse {
    let result = async { state.engine.resume_instance(parse_id(&id)?).await }.await;
    ApiResponse::from_result(result)
}

/// Body is optional; an empty request sweeps for the engine's today.
pub async fn run_sweep(
    State(state): State<GatewayState>,
    body: Option<Json<SweepRequest>>,
) -> ApiResponse {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let result = async {
        let today = match req.today.as_deref() {
            Some(date) => parse_anchor_date(date)?,
            None => state.engine.today(),
        };
        state.engine.run_automatic_sweep(today, &state.shutdown).await
    }
    .await;
    ApiResponse::from_result(result)
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id)
        .map_err(|_| CadenceError::InvalidArgument(format!("'{}' is not a valid instance id", id)))
}

fn rejected(rejection: JsonRejection) -> ApiResponse {
    ApiResponse::error(ApiError::invalid_argument(rejection.body_text()))
}
