//! Driving-directions proxy in front of OpenRouteService.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, error};

use itinera_core::security::ApiKey;
use itinera_core::settings::RoutingSettings;

use crate::error::ApiError;

pub const MISSING_COORDINATES: &str = "Need at least 2 coordinates";
pub const MISSING_KEY: &str = "OPENROUTE_API_KEY not set";

pub struct RouteProxy {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl RouteProxy {
    pub fn new(base_url: impl Into<String>, api_key: Option<ApiKey>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_settings(settings: &RoutingSettings) -> Self {
        Self::new(
            &settings.base_url,
            settings.api_key.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Route through `coordinates` (each `[lon, lat]`). Upstream failures
    /// degrade to a straight line.
    pub async fn route(&self, coordinates: Vec<Value>) -> Result<Value, ApiError> {
        if coordinates.len() < 2 {
            return Err(ApiError::BadRequest(MISSING_COORDINATES.into()));
        }
        let Some(key) = &self.api_key else {
            return Err(ApiError::Internal(MISSING_KEY.into()));
        };

        match self.fetch(key, &coordinates).await {
            Ok(body) => Ok(body),
            Err(e) => {
                error!(error = %e, "OpenRouteService failed, returning straight line");
                Ok(straight_line(coordinates))
            }
        }
    }

    async fn fetch(&self, key: &ApiKey, coordinates: &[Value]) -> Result<Value, reqwest::Error> {
        let body = self
            .client
            .post(&self.base_url)
            .bearer_auth(key.expose())
            .json(&json!({ "coordinates": coordinates }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        debug!("route received from OpenRouteService");
        Ok(body)
    }
}

/// GeoJSON collection with one line through the given points.
pub fn straight_line(coordinates: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            }
        }]
    })
}
