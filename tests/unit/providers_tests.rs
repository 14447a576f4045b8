/*!
 * Tests for provider implementations and the registry
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use txtsum::app_config::{ProviderConfig, ProviderKind};
use txtsum::errors::ProviderError;
use txtsum::providers::anthropic::{Anthropic, AnthropicResponse};
use txtsum::providers::mock::MockProvider;
use txtsum::providers::ollama::parse_generation_response;
use txtsum::providers::openai::{ChatCompletionResponse, OpenAICompatible};
use txtsum::providers::{GenerationOptions, LlmProvider, ProviderRegistry, RateLimiter};

#[test]
fn test_registry_withDefaults_shouldKnowEveryProvider() {
    let registry = ProviderRegistry::with_defaults();
    assert_eq!(registry.ids(), vec!["anthropic", "lm_studio", "mock", "ollama", "openai", "qwen"]);
}

#[test]
fn test_registry_create_localProviders_shouldNotNeedKeys() {
    let registry = ProviderRegistry::with_defaults();

    let lm_studio = registry.create("LM-Studio", &ProviderConfig::new(ProviderKind::LmStudio)).unwrap();
    assert_eq!(lm_studio.id(), "lm_studio");
    assert_eq!(lm_studio.model(), "local-model");

    let ollama = registry.create("ollama", &ProviderConfig::new(ProviderKind::Ollama)).unwrap();
    assert_eq!(ollama.id(), "ollama");
}

#[test]
fn test_registry_create_unknownProvider_shouldBeInvalidConfig() {
    let registry = ProviderRegistry::with_defaults();
    let result = registry.create("gemini", &ProviderConfig::new(ProviderKind::OpenAI));

    match result {
        Err(ProviderError::InvalidConfig(message)) => assert!(message.contains("gemini")),
        other => panic!("expected InvalidConfig, got {:?}", other.map(|p| p.id().to_string())),
    }
}

#[test]
fn test_registry_create_withBadEndpoint_shouldBeInvalidConfig() {
    let registry = ProviderRegistry::with_defaults();
    let mut config = ProviderConfig::new(ProviderKind::LmStudio);
    config.endpoint = "localhost:1234".to_string();

    assert!(matches!(registry.create("lm_studio", &config), Err(ProviderError::InvalidConfig(_))));
}

#[test]
fn test_registry_create_cloudProviderWithKey_shouldSucceed() {
    let registry = ProviderRegistry::with_defaults();
    for kind in [ProviderKind::OpenAI, ProviderKind::Qwen, ProviderKind::Anthropic] {
        let mut config = ProviderConfig::new(kind);
        config.api_key = "sk-test".to_string();
        let provider = registry.create(kind.id(), &config).unwrap();
        assert_eq!(provider.id(), kind.id());
    }
}

#[test]
fn test_registry_registerInstance_shouldReturnSameProvider() {
    let mock = MockProvider::working();
    let mut registry = ProviderRegistry::new();
    registry.register_instance("lm_studio", Arc::new(mock.clone()));

    let provider = registry.create("lmstudio", &ProviderConfig::new(ProviderKind::LmStudio)).unwrap();
    assert_eq!(provider.id(), "mock");
}

#[tokio::test]
async fn test_openai_generate_withUnreachableServer_shouldBeTransportError() {
    let mut config = ProviderConfig::new(ProviderKind::LmStudio);
    config.endpoint = "http://127.0.0.1:9/v1".to_string();
    config.timeout_secs = 2;
    let provider = OpenAICompatible::from_config(&config);

    let result = provider.generate("Hello", &GenerationOptions::default()).await;
    assert!(matches!(result, Err(ProviderError::Transport(_))));
}

#[test]
fn test_openai_extract_text_shouldTakeFirstChoice() {
    let response: ChatCompletionResponse = serde_json::from_str(r#"{
        "choices": [
            {"message": {"role": "assistant", "content": "First"}, "finish_reason": "stop"},
            {"message": {"role": "assistant", "content": "Second"}}
        ],
        "usage": {"prompt_tokens": 12, "completion_tokens": 3}
    }"#).unwrap();

    assert_eq!(OpenAICompatible::extract_text_from_response(&response).unwrap(), "First");
}

#[test]
fn test_openai_extract_text_withNullContent_shouldBeInvalidResponse() {
    let response: ChatCompletionResponse = serde_json::from_str(
        r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#
    ).unwrap();

    assert!(matches!(
        OpenAICompatible::extract_text_from_response(&response),
        Err(ProviderError::InvalidResponse(_))
    ));
}

#[test]
fn test_anthropic_extract_text_shouldSkipNonTextBlocks() {
    let response: AnthropicResponse = serde_json::from_str(r#"{
        "content": [
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "Summary body"}
        ],
        "usage": {"input_tokens": 10, "output_tokens": 2}
    }"#).unwrap();

    assert_eq!(Anthropic::extract_text_from_response(&response), "Summary body");
}

#[test]
fn test_ollama_parse_generation_response_shouldHandleStreamLines() {
    let body = "{\"model\":\"m\",\"response\":\"Part one, \",\"done\":false}\n{\"model\":\"m\",\"response\":\"part two.\",\"done\":true}\n";
    let parsed = parse_generation_response(body).unwrap();
    assert_eq!(parsed.response, "Part one, part two.");
}

#[test]
fn test_rate_limiter_unlimited_shouldBeNone() {
    assert!(RateLimiter::per_minute(None).is_none());
    assert!(RateLimiter::per_minute(Some(0)).is_none());
}

#[tokio::test]
async fn test_rate_limiter_shouldSpaceRequests() {
    let limiter = RateLimiter::per_minute(Some(600)).unwrap();
    let start = Instant::now();

    limiter.acquire().await;
    limiter.acquire().await;

    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_mock_failing_shouldReturnConfiguredError() {
    let provider = MockProvider::failing(ProviderError::Auth("bad key".to_string()));
    let result = provider.generate("prompt", &GenerationOptions::default()).await;

    assert_eq!(result, Err(ProviderError::Auth("bad key".to_string())));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_mock_testConnection_shouldUseShortPrompt() {
    let provider = MockProvider::working();
    provider.test_connection().await.unwrap();

    assert_eq!(provider.prompts(), vec!["Hello".to_string()]);
}
