use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MatrixConfig;
use crate::error::MatrixError;
use crate::logic::{
    DeployCheck, GroupSummary, MatrixDecorator, MatrixService, MatrixSummary,
    PacticipantGroupService,
};
use crate::model::{MatrixOptions, MatrixRow, UnresolvedSelector, UnresolvedSelectorReport};
use crate::store::traits::Store;

/// Shared state handed to every handler
pub struct BrokerState<S> {
    pub store: Arc<S>,
    pub config: MatrixConfig,
}

impl<S> BrokerState<S> {
    pub fn new(store: Arc<S>, config: MatrixConfig) -> Self {
        Self { store, config }
    }
}

pub type AppState<S> = Arc<BrokerState<S>>;

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn error_response(err: MatrixError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        MatrixError::InvalidSelector(_) => StatusCode::BAD_REQUEST,
        MatrixError::Store(_) | MatrixError::TaskFailed(_) => {
            error!("Matrix evaluation failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

#[derive(Debug, Deserialize)]
pub struct CanIDeployRequest {
    pub selectors: Vec<UnresolvedSelector>,
    #[serde(default)]
    pub options: MatrixOptions,
}

#[derive(Debug, Serialize)]
pub struct MatrixResponse {
    pub summary: MatrixSummary,
    pub matrix: Vec<MatrixRow>,
    pub warnings: Vec<String>,
    pub unresolved_selectors: Vec<UnresolvedSelectorReport>,
    pub executed_at: String,
}

pub async fn can_i_deploy<S: Store + 'static>(
    State(state): State<AppState<S>>,
    RequestJson(request): RequestJson<CanIDeployRequest>,
) -> HandlerResult<MatrixResponse> {
    let results = MatrixService::can_i_deploy(
        state.store.as_ref(),
        &request.selectors,
        &request.options,
        &state.config,
    )
    .await
    .map_err(error_response)?;

    let decorator = MatrixDecorator::new(&results);
    let check = decorator.deploy_check();
    Ok(Json(MatrixResponse {
        summary: decorator.summary(),
        matrix: results.rows.clone(),
        warnings: results.warnings.clone(),
        unresolved_selectors: results.unresolved_selectors.clone(),
        executed_at: check.executed_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CanIMergeRequest {
    pub selectors: Vec<UnresolvedSelector>,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub can_merge: Option<bool>,
    pub reason: String,
    pub executed_at: String,
    pub matrix: Vec<MatrixRow>,
    pub warnings: Vec<String>,
}

pub async fn can_i_merge<S: Store + 'static>(
    State(state): State<AppState<S>>,
    RequestJson(request): RequestJson<CanIMergeRequest>,
) -> HandlerResult<MergeResponse> {
    let results =
        MatrixService::can_i_merge(state.store.as_ref(), &request.selectors, &state.config)
            .await
            .map_err(error_response)?;

    let check = MatrixDecorator::new(&results).merge_check();
    Ok(Json(MergeResponse {
        can_merge: check.can_merge,
        reason: check.reason,
        executed_at: check.executed_at,
        matrix: results.rows,
        warnings: results.warnings,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EnvironmentsRequest {
    pub selector: UnresolvedSelector,
    pub environments: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EnvironmentsResponse {
    /// Keyed by environment name
    pub results: BTreeMap<String, DeployCheck>,
    /// Environments whose evaluation failed, with the error
    pub errors: BTreeMap<String, String>,
}

pub async fn can_i_deploy_to_environments<S: Store + 'static>(
    State(state): State<AppState<S>>,
    RequestJson(request): RequestJson<EnvironmentsRequest>,
) -> HandlerResult<EnvironmentsResponse> {
    request
        .selector
        .validate()
        .map_err(|e| error_response(MatrixError::InvalidSelector(e)))?;
    if request.environments.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("At least one environment is required")),
        ));
    }

    let checks = MatrixService::can_i_deploy_to_environments(
        state.store.clone(),
        request.selector,
        request.environments,
        state.config.clone(),
    )
    .await;

    let mut response = EnvironmentsResponse {
        results: BTreeMap::new(),
        errors: BTreeMap::new(),
    };
    for (environment_name, check) in checks {
        match check {
            Ok(check) => {
                response.results.insert(environment_name, check);
            }
            Err(err) => {
                response.errors.insert(environment_name, err.to_string());
            }
        }
    }
    Ok(Json(response))
}

pub async fn pacticipant_summary<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> HandlerResult<GroupSummary> {
    let summary = PacticipantGroupService::summary(state.store.clone(), &name, &state.config)
        .await
        .map_err(error_response)?;

    if summary.pacticipant.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(&format!(
                "No pacticipant with name '{}' found",
                name
            ))),
        ));
    }
    Ok(Json(summary))
}
