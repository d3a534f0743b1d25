use std::sync::Arc;

use itinera_core::errors::GatewayError;
use itinera_core::provider::{GenerationOptions, ProviderKind};
use itinera_core::state::{HistoryEntry, PipelineState, TravelRequest, TravelResponse};
use itinera_engine::retrieval::DuckDuckGoSearch;
use itinera_engine::{
    ContextRetriever, Pipeline, ProviderRegistry, RetrievalConfig, AI_ERROR_PREFIX,
    UNSUPPORTED_PROVIDER_MESSAGE,
};
use itinera_llm::{MockProvider, MockResponse};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gpt_registry(provider: Arc<MockProvider>) -> Arc<ProviderRegistry> {
    Arc::new(
        ProviderRegistry::new(GenerationOptions::default())
            .with_provider(ProviderKind::Gpt, provider),
    )
}

#[tokio::test]
async fn gpt_request_returns_adapter_text() {
    let provider = Arc::new(MockProvider::replying("ITINERARY_X"));
    let pipeline = Pipeline::builder(gpt_registry(provider)).build();

    let response = pipeline.plan(TravelRequest::new("3 days in Đà Lạt", "gpt")).await;

    assert_eq!(
        response,
        TravelResponse {
            output: "ITINERARY_X".into(),
            success: true,
            ai_provider: "gpt".into(),
        }
    );
}

#[tokio::test]
async fn unknown_provider_returns_fixed_text() {
    let provider = Arc::new(MockProvider::replying("never used"));
    let pipeline = Pipeline::builder(gpt_registry(provider.clone())).build();

    let response = pipeline.plan(TravelRequest::new("3 days in Đà Lạt", "bing")).await;

    assert_eq!(response.output, UNSUPPORTED_PROVIDER_MESSAGE);
    assert!(response.success);
    assert_eq!(response.ai_provider, "bing");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn missing_credential_reports_error_text_with_success() {
    let pipeline = Pipeline::builder(Arc::new(ProviderRegistry::default())).build();

    let response = pipeline.plan(TravelRequest::new("2 ngày ở Huế", "gemini")).await;

    assert!(response.output.starts_with(AI_ERROR_PREFIX), "{}", response.output);
    assert!(response.output.contains("GEMINI_API_KEY"));
    assert!(response.success);
}

#[tokio::test]
async fn adapter_failure_still_reports_success() {
    let provider = Arc::new(MockProvider::new(vec![MockResponse::Error(
        GatewayError::ProviderOverloaded,
    )]));
    let pipeline = Pipeline::builder(gpt_registry(provider)).build();

    let response = pipeline.plan(TravelRequest::new("Sapa", "gpt")).await;

    assert!(response.output.starts_with(AI_ERROR_PREFIX));
    assert!(response.success);
}

#[tokio::test]
async fn history_is_carried_into_prompt_in_order() {
    let provider = Arc::new(MockProvider::replying("ok"));
    let pipeline = Pipeline::builder(gpt_registry(provider.clone())).build();

    let request = TravelRequest::new("Thêm một ngày", "gpt")
        .with_history(vec![HistoryEntry::user("A"), HistoryEntry::assistant("B")]);
    pipeline.plan(request).await;

    let prompt = &provider.prompts()[0];
    let a = prompt.find("Person: A").unwrap();
    let b = prompt.find("Bot: B").unwrap();
    let current = prompt.find("Thêm một ngày").unwrap();
    assert!(a < b && b < current);
}

#[tokio::test]
async fn retrieval_appends_context_to_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "Da Lat site:en.wikivoyage.org"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a class="result__a" href="{}/wiki/Da_Lat">Da Lat</a>"#,
            server.uri()
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Da_Lat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="mw-content-text"><p>Pine forests and flower gardens.</p></div>"#,
        ))
        .mount(&server)
        .await;

    // First call extracts the destination, second writes the itinerary.
    let provider = Arc::new(MockProvider::new(vec![
        MockResponse::text("Da Lat"),
        MockResponse::text("ITINERARY_X"),
    ]));
    let search = DuckDuckGoSearch::new().with_base_url(format!("{}/html/", server.uri()));
    let retriever = ContextRetriever::new(Arc::new(search), RetrievalConfig::default());
    let pipeline = Pipeline::builder(gpt_registry(provider.clone()))
        .with_retrieval(retriever)
        .build();

    let state = pipeline
        .run(PipelineState::new("3 days in Đà Lạt", "gpt", Vec::new()))
        .await;

    assert_eq!(state.output.as_deref(), Some("ITINERARY_X"));
    let prompt = state.prompt_or_empty();
    assert!(prompt.ends_with("Context retrieved for Da Lat:\nPine forests and flower gardens."));
    assert_eq!(provider.prompts()[1], prompt);
}

#[tokio::test]
async fn retrieval_without_results_keeps_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>No results</body></html>"))
        .mount(&server)
        .await;

    let provider = Arc::new(MockProvider::new(vec![
        MockResponse::text("Atlantis"),
        MockResponse::text("ITINERARY_X"),
    ]));
    let search = DuckDuckGoSearch::new().with_base_url(server.uri());
    let retriever = ContextRetriever::new(Arc::new(search), RetrievalConfig::default());
    let with_rag = Pipeline::builder(gpt_registry(provider))
        .with_retrieval(retriever)
        .build();
    let plain = Pipeline::builder(gpt_registry(Arc::new(MockProvider::replying("ITINERARY_X")))).build();

    let input = PipelineState::new("Atlantis", "gpt", Vec::new());
    let augmented = with_rag.run(input.clone()).await;
    let baseline = plain.run(input).await;

    assert_eq!(augmented.prompt, baseline.prompt);
    assert!(!augmented.prompt_or_empty().contains("Context retrieved"));
}
