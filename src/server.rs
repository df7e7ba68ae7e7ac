use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::factors::EmissionFactors;
use crate::footprint::calculator::compute_footprint_with_devices;
use crate::footprint::devices::{active_contributions, Device};
use crate::footprint::history::summarize_timeline;
use crate::footprint::{CarbonFootprint, Category, FootprintRecord};
use crate::profile::store::ProfileStore;
use crate::profile::{ProfileError, ProfileEvaluation, ProfileSnapshot};
use crate::recommend::progress::{pending_recommendations, summarize_progress};
use crate::recommend::rules::generate_recommendations;
use crate::recommend::whatif::simulate_whatif;
use crate::recommend::{ActionProgress, Recommendation, WhatIfResult};
use crate::survey::{SurveyAnswers, SurveyChange};

#[derive(Clone)]
struct ApiState {
    config: Config,
    factors: Arc<EmissionFactors>,
    db_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(error: ProfileError) -> Self {
        match error {
            ProfileError::MissingSurvey => Self::not_found(error.to_string()),
            ProfileError::Survey(_) | ProfileError::Device(_) => {
                Self::bad_request(error.to_string())
            }
            ProfileError::Storage(_) => Self::internal(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("request failed: {}", self.message);
        }
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Deserialize)]
struct FootprintRequest {
    survey: SurveyAnswers,
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
struct RecommendationsRequest {
    #[serde(flatten)]
    inputs: FootprintRequest,
    #[serde(default)]
    completed_action_ids: Vec<String>,
    top: Option<usize>,
    hide_completed: Option<bool>,
    /// Restricts the list to actions cutting one category.
    category: Option<Category>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhatIfRequest {
    /// Falls back to the stored survey when omitted.
    survey: Option<SurveyAnswers>,
    devices: Option<Vec<Device>>,
    #[serde(default)]
    changes: Vec<SurveyChange>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct FootprintResponse {
    footprint: CarbonFootprint,
    total_tonnes: f64,
}

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    footprint: CarbonFootprint,
    recommendations: Vec<Recommendation>,
    progress: ActionProgress,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    summary: String,
    records: Vec<FootprintRecord>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState {
        db_path: config.resolved_db_path(),
        factors: Arc::new(config.emission_factors()),
        config,
    };

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/footprint", post(footprint))
        .route("/v1/recommendations", post(recommendations))
        .route("/v1/whatif", post(whatif))
        .route("/v1/profile", get(profile))
        .route("/v1/history", get(history))
        .route("/v1/factors", get(factors))
        .route("/v1/config", get(show_config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn factors(State(state): State<ApiState>) -> Json<ApiResponse<EmissionFactors>> {
    ok(state.factors.as_ref().clone())
}

async fn footprint(
    State(state): State<ApiState>,
    Json(request): Json<FootprintRequest>,
) -> ApiResult<FootprintResponse> {
    let footprint = compute_from_request(&state, &request)?;
    Ok(ok(FootprintResponse {
        total_tonnes: footprint.total_tonnes(),
        footprint,
    }))
}

async fn recommendations(
    State(state): State<ApiState>,
    Json(request): Json<RecommendationsRequest>,
) -> ApiResult<RecommendationsResponse> {
    let footprint = compute_from_request(&state, &request.inputs)?;
    let ranked = generate_recommendations(&footprint, &request.inputs.survey);
    let progress = summarize_progress(&footprint, &ranked, &request.completed_action_ids);

    let hide_completed = request
        .hide_completed
        .unwrap_or(state.config.recommendations.hide_completed);
    let mut recommendations = if hide_completed {
        pending_recommendations(&ranked, &request.completed_action_ids)
    } else {
        ranked
    };
    if let Some(category) = request.category {
        recommendations.retain(|rec| rec.targets(category));
    }
    recommendations.truncate(resolve_top(request.top, state.config.recommendations.max_items));

    Ok(ok(RecommendationsResponse {
        footprint,
        recommendations,
        progress,
    }))
}

async fn whatif(
    State(state): State<ApiState>,
    Json(request): Json<WhatIfRequest>,
) -> ApiResult<WhatIfResult> {
    if request.changes.is_empty() {
        return Err(ApiError::bad_request(
            "at least one survey change is required",
        ));
    }

    let (survey, devices) = match (request.survey, request.devices) {
        (Some(survey), devices) => (survey, devices.unwrap_or_default()),
        (None, devices) => {
            let snapshot = load_snapshot(&state)?;
            let survey = snapshot.survey.ok_or(ProfileError::MissingSurvey)?;
            (survey, devices.unwrap_or(snapshot.devices))
        }
    };
    survey
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    validate_devices(&devices)?;

    let result = simulate_whatif(
        &survey,
        &state.factors,
        &active_contributions(&devices),
        &request.changes,
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(ok(result))
}

async fn profile(State(state): State<ApiState>) -> ApiResult<ProfileEvaluation> {
    let snapshot = load_snapshot(&state)?;
    let evaluation = snapshot.evaluate(&state.factors)?;
    Ok(ok(evaluation))
}

async fn history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000);
    let store = open_store(&state)?;
    let records = store.load_history(limit).map_err(ApiError::internal)?;
    Ok(ok(HistoryResponse {
        summary: summarize_timeline(&records),
        records,
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn open_store(state: &ApiState) -> std::result::Result<ProfileStore, ApiError> {
    ProfileStore::open(&state.db_path).map_err(ApiError::internal)
}

fn load_snapshot(state: &ApiState) -> std::result::Result<ProfileSnapshot, ApiError> {
    let store = open_store(state)?;
    Ok(ProfileSnapshot::load(&store)?)
}

fn compute_from_request(
    state: &ApiState,
    request: &FootprintRequest,
) -> std::result::Result<CarbonFootprint, ApiError> {
    request
        .survey
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    validate_devices(&request.devices)?;
    Ok(compute_footprint_with_devices(
        &request.survey,
        &state.factors,
        &active_contributions(&request.devices),
    ))
}

fn validate_devices(devices: &[Device]) -> std::result::Result<(), ApiError> {
    for device in devices {
        device
            .validate()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    Ok(())
}

fn resolve_top(requested: Option<usize>, configured: usize) -> usize {
    requested.unwrap_or(configured).max(1)
}
