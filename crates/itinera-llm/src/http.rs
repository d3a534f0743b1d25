//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use itinera_core::errors::GatewayError;
use reqwest::Client;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const USER_AGENT: &str = "itinera/0.1";

/// Build the client used for provider calls.
pub fn build_client(request_timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Send a JSON request and decode the JSON body, classifying failures.
pub async fn send_json(
    req: reqwest::RequestBuilder,
    request_timeout: Duration,
) -> Result<serde_json::Value, GatewayError> {
    // Errors are stripped of their URL so credentials in it never reach callers.
    let resp = req.send().await.map_err(|e| {
        GatewayError::from_transport(e.is_timeout(), request_timeout, e.without_url().to_string())
    })?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::from_status(status, body));
    }

    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| GatewayError::MalformedResponse(e.without_url().to_string()))
}

/// Strip a trailing slash so paths can be appended with `/`.
pub fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
