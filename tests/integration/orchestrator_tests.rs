/*!
 * Integration tests for the chunk-then-reduce orchestrator
 *
 * All tests run against the in-crate mock provider; no network access.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use txtsum::errors::{ProviderError, SummarizeError};
use txtsum::normalizer::{NormalizeOptions, NormalizedText, SourceFormat, normalize};
use txtsum::providers::mock::MockProvider;
use txtsum::summary::{CancellationToken, OrchestratorSettings, RunOptions, SummaryOrchestrator};
use txtsum::templates::{PromptTemplate, TemplateStore};
use crate::common;

const CHUNK_PREFIX: &str = "This is chunk ";
const COMBINE_MARKER: &str = "Please combine them into";

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        concurrent_requests: 3,
        retry_count: 2,
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn template() -> PromptTemplate {
    TemplateStore::built_in().resolve("default").unwrap()
}

fn options(max_chunk_chars: usize) -> RunOptions {
    RunOptions { max_chunk_chars, ..Default::default() }
}

fn plain(text: &str) -> NormalizedText {
    let options = NormalizeOptions { full_context: false, max_text_length: usize::MAX };
    normalize(text, Some(SourceFormat::Plain), &options).unwrap()
}

/// 1-based chunk number of a chunk prompt
fn chunk_number(prompt: &str) -> Option<usize> {
    prompt.strip_prefix(CHUNK_PREFIX)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

#[tokio::test]
async fn test_summarize_threeLineScenario_shouldMakeOneCallAndTrimCompletion() {
    let provider = MockProvider::working().with_responder(|_| "  The three lines say hello.  \n\n".to_string());
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let text = plain("Line1\nLine2\nLine3\n");

    let result = orchestrator.summarize(&text, &template(), &options(100)).await.unwrap();

    assert_eq!(result.body, "The three lines say hello.");
    assert_eq!(result.chunk_count, 1);
    assert_eq!(result.llm_calls, 1);
    assert_eq!(provider.request_count(), 1);

    let prompts = provider.prompts();
    assert!(prompts[0].contains("Line1\nLine2\nLine3"));
    assert!(chunk_number(&prompts[0]).is_none());
}

#[tokio::test]
async fn test_summarize_multiChunk_shouldCombinePartialsInChunkOrder() {
    // Earlier chunks answer later so completion order is reversed
    let provider = MockProvider::working()
        .with_responder(|prompt| match chunk_number(prompt) {
            Some(n) => format!("partial-{}", n),
            None => "Final combined summary".to_string(),
        })
        .with_delay(|prompt| chunk_number(prompt).map(|n| (5 - n as u64) * 30).unwrap_or(0));
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let text = plain(&common::long_lines(4));

    let result = orchestrator.summarize(&text, &template(), &options(100)).await.unwrap();

    assert_eq!(result.chunk_count, 4);
    assert_eq!(result.partials, vec!["partial-1", "partial-2", "partial-3", "partial-4"]);
    assert_eq!(result.body, "Final combined summary");
    assert_eq!(result.reduction_passes, 0);
    assert_eq!(result.llm_calls, 5);

    let prompts = provider.prompts();
    let combine = prompts.last().unwrap();
    assert!(combine.contains(COMBINE_MARKER));
    assert!(combine.ends_with("partial-1\n\npartial-2\n\npartial-3\n\npartial-4"));
}

#[tokio::test]
async fn test_summarize_longPartials_shouldReduceBeforeCombining() {
    let provider = MockProvider::working().with_responder(|prompt| {
        if chunk_number(prompt).is_some() {
            "A partial summary that is sixty characters long, give or ta".to_string()
        } else if prompt.contains(COMBINE_MARKER) {
            "Final".to_string()
        } else {
            "short".to_string()
        }
    });
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let text = plain(&common::long_lines(3));

    let result = orchestrator.summarize(&text, &template(), &options(100)).await.unwrap();

    assert_eq!(result.body, "Final");
    assert_eq!(result.chunk_count, 3);
    assert_eq!(result.reduction_passes, 1);
    assert_eq!(result.llm_calls, provider.request_count());

    // Three chunk calls, one reduce call per partial, one combine call
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 7);
    let reduce_prompts: Vec<&String> = prompts.iter().filter(|p| p.contains("Condense them")).collect();
    assert_eq!(reduce_prompts.len(), 3);
    assert!(reduce_prompts.iter().all(|p| p.contains("A partial summary")));
    assert!(prompts[6].ends_with("short\n\nshort\n\nshort"));
}

#[tokio::test]
async fn test_summarize_partialsThatNeverShrink_shouldReportDivergence() {
    let provider = MockProvider::working().with_responder(|_| "Long partial summary. ".repeat(10));
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let text = plain(&common::long_lines(3));

    let result = orchestrator.summarize(&text, &template(), &options(100)).await;

    match result {
        Err(SummarizeError::ReductionDiverged { pass, before, after }) => {
            assert_eq!(pass, 1);
            assert!(after >= before);
        }
        other => panic!("expected ReductionDiverged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_summarize_oneOverMaxTextLength_shouldFailWithoutCalls() {
    let provider = MockProvider::working();
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let text = plain(&"x".repeat(51));
    let options = RunOptions { max_text_length: 50, ..options(100) };

    let result = orchestrator.summarize(&text, &template(), &options).await;

    assert!(matches!(result, Err(SummarizeError::TooLong { actual: 51, max: 50 })));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_summarize_emptyText_shouldFailWithoutCalls() {
    let provider = MockProvider::working();
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());

    for raw in ["", "   \n\t\n"] {
        let result = orchestrator.summarize(&plain(raw), &template(), &options(100)).await;
        assert!(matches!(result, Err(SummarizeError::EmptyContent)));
    }
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_summarize_flakyProvider_shouldRetryAndSucceed() {
    let provider = MockProvider::flaky(2, ProviderError::RateLimit("slow down".to_string()));
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());

    let result = orchestrator.summarize(&plain("Short text"), &template(), &options(100)).await.unwrap();

    assert_eq!(provider.request_count(), 3);
    assert_eq!(result.llm_calls, 3);
}

#[tokio::test]
async fn test_summarize_retriesExhausted_shouldReturnLastError() {
    let provider = MockProvider::failing(ProviderError::Transport("connection reset".to_string()));
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());

    let result = orchestrator.summarize(&plain("Short text"), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Provider(ProviderError::Transport(_)))));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_summarize_authFailure_shouldNotRetry() {
    let provider = MockProvider::failing(ProviderError::Auth("invalid key".to_string()));
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());

    let result = orchestrator.summarize(&plain("Short text"), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Provider(ProviderError::Auth(_)))));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_summarize_emptyCompletions_shouldFailWithSanitizeError() {
    let provider = MockProvider::empty();
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());

    let result = orchestrator.summarize(&plain("Short text"), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Sanitize(_))));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_summarize_cancelledToken_shouldMakeNoCalls() {
    let provider = MockProvider::working();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings())
        .with_cancellation(cancel);

    let result = orchestrator.summarize(&plain(&common::long_lines(3)), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Cancelled)));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_summarize_cancelDuringChunks_shouldLetInFlightCallsFinish() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    // The first call to arrive cancels the run; calls already admitted still answer
    let provider = MockProvider::working()
        .with_responder(move |_| {
            trigger.cancel();
            "partial".to_string()
        })
        .with_delay(|_| 20);
    let settings = OrchestratorSettings { concurrent_requests: 2, ..settings() };
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings)
        .with_cancellation(cancel);

    let result = orchestrator.summarize(&plain(&common::long_lines(6)), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Cancelled)));
    assert!(provider.request_count() >= 1);
    assert!(provider.request_count() < 6);
}

#[tokio::test]
async fn test_summarize_cancelDuringBackoff_shouldStopWaiting() {
    let provider = MockProvider::failing(ProviderError::RateLimit("slow down".to_string()));
    let cancel = CancellationToken::new();
    let settings = OrchestratorSettings { retry_backoff_ms: 60_000, ..settings() };
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings)
        .with_cancellation(cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = orchestrator.summarize(&plain("Short text"), &template(), &options(100)).await;

    assert!(matches!(result, Err(SummarizeError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_summarize_concurrency_shouldStayWithinLimit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (enter, peak_seen) = (in_flight.clone(), peak.clone());

    // The delay hook runs when a call starts, the responder when it ends
    let provider = MockProvider::working()
        .with_delay(move |_| {
            let now = enter.fetch_add(1, Ordering::SeqCst) + 1;
            peak_seen.fetch_max(now, Ordering::SeqCst);
            15
        })
        .with_responder({
            let leave = in_flight.clone();
            move |_| {
                leave.fetch_sub(1, Ordering::SeqCst);
                "p".to_string()
            }
        });
    let settings = OrchestratorSettings { concurrent_requests: 2, ..settings() };
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings);

    orchestrator.summarize(&plain(&common::long_lines(6)), &template(), &options(100)).await.unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(provider.request_count(), 7);
}

#[tokio::test]
async fn test_summarize_progress_shouldReportEveryChunk() {
    let reports = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = reports.clone();
    let provider = MockProvider::working().with_responder(|_| "p".to_string());
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider), settings())
        .with_progress(Arc::new(move |completed: usize, total: usize| sink.lock().push((completed, total))));

    orchestrator.summarize(&plain(&common::long_lines(3)), &template(), &options(100)).await.unwrap();

    let mut reports = reports.lock().clone();
    reports.sort();
    assert_eq!(reports, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_summarize_nonEnglish_shouldAskForLanguageEverywhere() {
    let provider = MockProvider::working();
    let orchestrator = SummaryOrchestrator::new(Arc::new(provider.clone()), settings());
    let options = RunOptions { language: "fr".to_string(), ..options(100) };

    orchestrator.summarize(&plain(&common::long_lines(2)), &template(), &options).await.unwrap();

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts.iter().all(|p| p.contains("French")));
}
