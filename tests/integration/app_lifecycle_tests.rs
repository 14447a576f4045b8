/*!
 * End-to-end tests of the controller: discovery, summarization, output and batch reports
 */

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use txtsum::app_controller::{Controller, FileOutcome, ISSUES_LOG_FILE};
use txtsum::errors::SummarizeError;
use txtsum::providers::mock::MockProvider;
use txtsum::summary::{CancellationToken, RunOptions};
use crate::common;

#[tokio::test]
async fn test_summarize_file_subtitle_shouldWriteMarkdownNextToInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let config = common::test_config();
    let options = RunOptions::from_config(&config);
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    let outcome = controller.summarize_file(&input, &options).await?;

    let expected = temp_dir.path().join("talk.md");
    match outcome {
        FileOutcome::Summarized { output, result } => {
            assert_eq!(output, expected);
            assert_eq!(result.chunk_count, 1);
            assert_eq!(result.template, "default");
        }
        other => panic!("expected Summarized, got {:?}", other),
    }

    let document = fs::read_to_string(&expected)?;
    assert!(document.starts_with("# Summary: talk.srt\n\n**Source File:** `talk.srt`"));
    assert!(document.contains("Mock summary of"));

    // Timings and markup never reach the model
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("This is a test subtitle.\nIt contains multiple entries.\nFor testing purposes."));
    assert!(!prompts[0].contains("-->"));
    assert!(!prompts[0].contains("<i>"));
    Ok(())
}

#[tokio::test]
async fn test_summarize_file_existingSummary_shouldSkipWithoutCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let config = common::test_config();
    let mut options = RunOptions::from_config(&config);
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    controller.summarize_file(&input, &options).await?;
    fs::write(temp_dir.path().join("talk.md"), "kept")?;

    let second = controller.summarize_file(&input, &options).await?;
    assert!(matches!(second, FileOutcome::Skipped { .. }));
    assert_eq!(provider.request_count(), 1);
    assert_eq!(fs::read_to_string(temp_dir.path().join("talk.md"))?, "kept");

    options.force_overwrite = true;
    let forced = controller.summarize_file(&input, &options).await?;
    assert!(matches!(forced, FileOutcome::Summarized { .. }));
    assert_eq!(provider.request_count(), 2);
    assert_ne!(fs::read_to_string(temp_dir.path().join("talk.md"))?, "kept");
    Ok(())
}

#[tokio::test]
async fn test_summarize_file_unknownTemplate_shouldFailBeforeAnyCall() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let config = common::test_config();
    let options = RunOptions { template: "nope".to_string(), ..RunOptions::from_config(&config) };
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    let result = controller.summarize_file(&input, &options).await;

    assert!(matches!(result, Err(SummarizeError::TemplateNotFound(ref id)) if id == "nope"));
    assert_eq!(provider.request_count(), 0);
    assert!(!temp_dir.path().join("talk.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_summarize_file_explicitOutputFile_shouldBeUsedForSingleInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "First paragraph.\n\nSecond paragraph.")?;
    let destination = temp_dir.path().join("out").join("custom.md");
    let config = common::test_config();
    let options = RunOptions { output: Some(destination.clone()), ..RunOptions::from_config(&config) };
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    let outcome = controller.summarize_file(&input, &options).await?;

    assert!(matches!(outcome, FileOutcome::Summarized { ref output, .. } if *output == destination));
    assert!(fs::read_to_string(&destination)?.contains("# Summary: notes.txt"));
    Ok(())
}

#[tokio::test]
async fn test_run_batch_mixedInputs_shouldIsolateFailuresAndLogIssues() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let good = common::create_test_subtitle(dir, "good.srt")?;
    let done = common::create_test_subtitle(dir, "done.srt")?;
    common::create_test_file(dir, "done.md", "already summarized")?;
    let empty = common::create_test_file(dir, "empty.txt", "  \n\n  ")?;
    let blob = dir.join("blob.bin");
    fs::write(&blob, [0u8, 159, 146, 150, 0, 1, 2, 3])?;

    let config = common::test_config();
    let options = RunOptions::from_config(&config);
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    let paths = vec![blob.clone(), done.clone(), empty.clone(), good.clone()];
    let report = controller.run_batch(&paths, &options).await;

    assert_eq!(report.written, vec![dir.join("good.md")]);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, empty);
    assert!(matches!(report.failures[0].error, SummarizeError::EmptyContent));
    assert!(report.has_failures());
    assert!(!report.was_cancelled());
    assert_eq!(report.total(), 4);
    assert_eq!(provider.request_count(), 1);

    let issues = fs::read_to_string(dir.join(ISSUES_LOG_FILE))?;
    assert!(issues.contains("4 file(s): 1 summarized, 2 skipped, 1 failed, 0 cancelled"));
    assert!(issues.contains("SKIPPED"));
    assert!(issues.contains("FAILED"));
    assert!(issues.contains("empty.txt"));
    Ok(())
}

#[tokio::test]
async fn test_run_batch_outputDirectory_shouldCollectSummariesThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first = common::create_test_subtitle(temp_dir.path(), "ep01.srt")?;
    let second = common::create_test_file(temp_dir.path(), "ep02.txt", "Plain transcript text.")?;
    let out_dir = temp_dir.path().join("summaries");
    fs::create_dir(&out_dir)?;

    let config = common::test_config();
    let options = RunOptions { output: Some(out_dir.clone()), ..RunOptions::from_config(&config) };
    let provider = MockProvider::working();
    let controller = common::mock_controller(config, &provider)?;

    let report = controller.run_batch(&[first, second], &options).await;

    assert_eq!(report.written, vec![out_dir.join("ep01.md"), out_dir.join("ep02.md")]);
    assert!(!report.has_failures());
    assert!(!out_dir.join(ISSUES_LOG_FILE).exists());
    assert!(!temp_dir.path().join(ISSUES_LOG_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_run_batch_afterCancel_shouldReportEveryFileCancelled() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first = common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    let second = common::create_test_subtitle(temp_dir.path(), "b.srt")?;

    let config = common::test_config();
    let options = RunOptions::from_config(&config);
    let provider = MockProvider::working();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let controller = common::mock_controller(config, &provider)?.with_cancellation(cancel);

    let report = controller.run_batch(&[first.clone(), second.clone()], &options).await;

    assert!(report.was_cancelled());
    assert_eq!(report.cancelled, vec![first, second]);
    assert!(report.written.is_empty());
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[test]
fn test_test_provider_withMock_shouldSendGreeting() -> Result<()> {
    let provider = MockProvider::working();
    let controller = common::mock_controller(common::test_config(), &provider)?;

    let result = tokio_test::block_on(async { controller.test_provider().await });

    assert!(result.is_ok());
    assert_eq!(provider.prompts(), vec!["Hello".to_string()]);
    Ok(())
}

#[test]
fn test_collect_inputs_directory_shouldRespectRecursionAndSkipSummaries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "a.srt")?;
    common::create_test_file(dir, "b.txt", "text")?;
    common::create_test_file(dir, "a.md", "summary")?;
    common::create_test_file(dir, ".hidden.srt", "hidden")?;
    fs::create_dir(dir.join("season2"))?;
    common::create_test_file(&dir.join("season2"), "c.vtt", "WEBVTT\n")?;

    let flat = Controller::collect_inputs(&[dir.to_path_buf()], false, false)?;
    assert_eq!(flat, vec![dir.join("a.srt"), dir.join("b.txt")]);

    let deep = Controller::collect_inputs(&[dir.to_path_buf()], true, false)?;
    assert_eq!(deep, vec![dir.join("a.srt"), dir.join("b.txt"), dir.join("season2").join("c.vtt")]);
    Ok(())
}

#[test]
fn test_collect_inputs_explicitFileAndMissingPath_shouldBehave() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    // Explicit files are taken even when discovery would skip them
    let explicit = common::create_test_file(temp_dir.path(), "notes.md", "# Notes")?;

    assert_eq!(Controller::collect_inputs(&[explicit.clone()], false, false)?, vec![explicit]);

    let missing = PathBuf::from(temp_dir.path()).join("missing.srt");
    assert!(Controller::collect_inputs(&[missing], false, false).is_err());
    Ok(())
}
