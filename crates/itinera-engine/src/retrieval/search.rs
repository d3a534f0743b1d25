//! Web search backends used to locate a destination's travel-wiki page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};

use itinera_core::security::ApiKey;

use crate::error::RetrievalError;

pub const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
pub const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DUCKDUCKGO_ORIGIN: &str = "https://duckduckgo.com";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// One ranked search result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Return at most `count` ranked results for `query`.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, RetrievalError>;
}

fn search_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(SEARCH_TIMEOUT)
        .user_agent("Mozilla/5.0 (compatible; itinera/0.1)")
        .build()
        .unwrap_or_default()
}

/// Brave Web Search API.
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
}

impl BraveSearch {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: search_client(),
            api_key,
            base_url: BRAVE_SEARCH_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub fn parse_brave_results(body: &serde_json::Value) -> Vec<SearchHit> {
    body["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    let url = r["url"].as_str()?;
                    Some(SearchHit {
                        title: r["title"].as_str().unwrap_or("(untitled)").to_string(),
                        url: url.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchBackend for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        let limit = count.clamp(1, 20);
        let count_param = limit.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header("X-Subscription-Token", self.api_key.expose())
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", count_param.as_str())])
            .send()
            .await
            .map_err(|e| RetrievalError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Search(format!("HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::Search(format!("failed to parse response: {e}")))?;

        let mut hits = parse_brave_results(&body);
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Keyless search against DuckDuckGo's HTML endpoint.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self {
            client: search_client(),
            base_url: DUCKDUCKGO_HTML_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Resolve a result link, unwrapping DuckDuckGo's `/l/?uddg=` redirect.
pub fn decode_result_link(href: &str) -> Option<String> {
    let url = Url::parse(DUCKDUCKGO_ORIGIN).ok()?.join(href).ok()?;

    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

pub fn parse_duckduckgo_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| {
            let url = decode_result_link(a.value().attr("href")?)?;
            let title = a.text().collect::<String>().trim().to_string();
            Some(SearchHit { title, url })
        })
        .collect()
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| RetrievalError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Search(format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| RetrievalError::Search(format!("failed to read response: {e}")))?;

        let mut hits = parse_duckduckgo_results(&html);
        hits.truncate(count);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn brave_results_parsed() {
        let body = serde_json::json!({
            "web": {"results": [
                {"title": "Da Lat – Travel guide", "url": "https://en.wikivoyage.org/wiki/Da_Lat"},
                {"title": "no url"}
            ]}
        });
        let hits = parse_brave_results(&body);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://en.wikivoyage.org/wiki/Da_Lat");
    }

    #[test]
    fn brave_results_empty_when_missing() {
        assert!(parse_brave_results(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn duckduckgo_redirect_is_unwrapped() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikivoyage.org%2Fwiki%2FHue&rut=abc";
        assert_eq!(
            decode_result_link(href).as_deref(),
            Some("https://en.wikivoyage.org/wiki/Hue")
        );
    }

    #[test]
    fn duckduckgo_direct_link_kept() {
        assert_eq!(
            decode_result_link("https://en.wikivoyage.org/wiki/Hue").as_deref(),
            Some("https://en.wikivoyage.org/wiki/Hue")
        );
        assert!(decode_result_link("javascript:void(0)").is_none());
    }

    #[test]
    fn duckduckgo_html_parsed_in_rank_order() {
        let html = r#"<div class="results">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikivoyage.org%2Fwiki%2FDa_Lat">Da Lat</a>
            <a class="result__a" href="https://en.wikivoyage.org/wiki/Lam_Dong">Lam Dong</a>
        </div>"#;
        let hits = parse_duckduckgo_results(html);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Da Lat");
        assert_eq!(hits[0].url, "https://en.wikivoyage.org/wiki/Da_Lat");
    }

    #[tokio::test]
    async fn brave_search_sends_token_and_limits_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("X-Subscription-Token", "brave-key"))
            .and(query_param("q", "Hue site:en.wikivoyage.org"))
            .and(query_param("count", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {"results": [
                    {"title": "Hue", "url": "https://en.wikivoyage.org/wiki/Hue"},
                    {"title": "Hue (disambiguation)", "url": "https://en.wikivoyage.org/wiki/Hue_(d)"}
                ]}
            })))
            .mount(&server)
            .await;

        let backend = BraveSearch::new(ApiKey::from_raw("brave-key").unwrap())
            .with_base_url(server.uri());
        let hits = backend.search("Hue site:en.wikivoyage.org", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Hue");
    }

    #[tokio::test]
    async fn brave_search_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let backend = BraveSearch::new(ApiKey::from_raw("bad").unwrap()).with_base_url(server.uri());
        let err = backend.search("x", 1).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Search(ref m) if m.contains("403")));
    }

    #[tokio::test]
    async fn duckduckgo_search_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Sapa site:en.wikivoyage.org"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a class="result__a" href="https://en.wikivoyage.org/wiki/Sa_Pa">Sa Pa</a>"#,
            ))
            .mount(&server)
            .await;

        let backend = DuckDuckGoSearch::new().with_base_url(server.uri());
        let hits = backend.search("Sapa site:en.wikivoyage.org", 1).await.unwrap();
        assert_eq!(hits, vec![SearchHit {
            title: "Sa Pa".into(),
            url: "https://en.wikivoyage.org/wiki/Sa_Pa".into(),
        }]);
    }
}
