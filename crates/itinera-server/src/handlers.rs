use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use itinera_core::provider::ProviderKind;
use itinera_core::state::{PipelineState, TravelRequest, TravelResponse, DEFAULT_PROVIDER};

use crate::error::ApiError;
use crate::server::AppState;

pub const INVALID_PROVIDER: &str = "Invalid AI provider. Use 'gpt' or 'gemini'";

fn configured(yes: bool) -> &'static str {
    if yes {
        "configured"
    } else {
        "not_configured"
    }
}

pub async fn root() -> Json<Value> {
    let providers: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
    Json(json!({
        "message": "Travel Planning Service is running",
        "status": "healthy",
        "available_providers": providers,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let registry = state.pipeline.registry();
    let retrieval = if state.pipeline.has_retrieval() {
        "enabled"
    } else {
        "disabled"
    };
    Json(json!({
        "status": "healthy",
        "services": {
            "pipeline": "ready",
            "openai": configured(registry.is_configured(ProviderKind::Gpt)),
            "gemini": configured(registry.is_configured(ProviderKind::Gemini)),
            "retrieval": retrieval,
            "routing": configured(state.route_proxy.is_configured()),
        }
    }))
}

pub async fn generate_itinerary(
    State(state): State<AppState>,
    Json(request): Json<TravelRequest>,
) -> Result<Json<TravelResponse>, ApiError> {
    info!(ai_provider = %request.ai_provider, "generating itinerary");

    // Matched case-insensitively, like dispatch.
    if ProviderKind::from_key(&request.ai_provider).is_none() {
        return Err(ApiError::BadRequest(INVALID_PROVIDER.into()));
    }

    Ok(Json(state.pipeline.plan(request).await))
}

/// Body of the legacy endpoint. Fields are optional and history is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

pub async fn generate_itinerary_legacy(
    State(state): State<AppState>,
    Json(request): Json<LegacyRequest>,
) -> Json<PipelineState> {
    let input = PipelineState::new(
        request.text.unwrap_or_default(),
        request.ai_provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
        Vec::new(),
    );
    Json(state.pipeline.run(input).await)
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub coordinates: Option<Vec<Value>>,
}

pub async fn route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .route_proxy
        .route(request.coordinates.unwrap_or_default())
        .await?;
    Ok(Json(body))
}
