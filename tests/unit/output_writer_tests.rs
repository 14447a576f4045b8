/*!
 * Tests for summary output: path mapping, rendering and overwrite policy
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::time::Duration;
use txtsum::output_writer::{OutputWriter, WriteOutcome};
use txtsum::summary::SummaryResult;
use crate::common;

fn result(body: &str) -> SummaryResult {
    SummaryResult {
        language: "en".to_string(),
        template: "default".to_string(),
        body: body.to_string(),
        partials: vec![body.to_string()],
        chunk_count: 1,
        reduction_passes: 0,
        llm_calls: 1,
    }
}

#[test]
fn test_render_markdown_shouldHaveHeaderSourceAndBody() {
    let document = OutputWriter::render_markdown("talk.srt", &result("Bees matter.\n\n"));
    assert_eq!(
        document,
        "# Summary: talk.srt\n\n**Source File:** `talk.srt`\n\n---\n\nBees matter.\n"
    );
}

#[test]
fn test_write_newDestination_shouldWriteDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("out").join("talk.md");

    let outcome = OutputWriter::write(&result("Body"), "talk.srt", &destination, false)?;

    assert_eq!(outcome, WriteOutcome::Written(destination.clone()));
    assert!(fs::read_to_string(&destination)?.ends_with("Body\n"));
    Ok(())
}

#[test]
fn test_write_existingWithoutOverwrite_shouldLeaveFileUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = common::create_test_file(temp_dir.path(), "talk.md", "hand-edited summary")?;
    let modified_before = fs::metadata(&destination)?.modified()?;

    // Give a rewrite the chance to show up in the mtime
    std::thread::sleep(Duration::from_millis(20));
    let outcome = OutputWriter::write(&result("New body"), "talk.srt", &destination, false)?;

    assert_eq!(outcome, WriteOutcome::Skipped(destination.clone()));
    assert_eq!(fs::read_to_string(&destination)?, "hand-edited summary");
    assert_eq!(fs::metadata(&destination)?.modified()?, modified_before);
    Ok(())
}

#[test]
fn test_write_existingWithOverwrite_shouldReplace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = common::create_test_file(temp_dir.path(), "talk.md", "old")?;

    let outcome = OutputWriter::write(&result("New body"), "talk.srt", &destination, true)?;

    assert_eq!(outcome.path(), destination.as_path());
    assert!(matches!(outcome, WriteOutcome::Written(_)));
    assert!(fs::read_to_string(&destination)?.contains("New body"));
    Ok(())
}

#[test]
fn test_write_shouldLeaveNoTemporaryFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("talk.md");

    OutputWriter::write(&result("Body"), "talk.srt", &destination, false)?;

    let entries = fs::read_dir(temp_dir.path())?.collect::<std::io::Result<Vec<_>>>()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path(), destination);
    Ok(())
}

#[test]
fn test_output_path_for_existingDirectory_shouldJoinEvenForSingleInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let out_dir = temp_dir.path().join("summaries.md");
    fs::create_dir(&out_dir)?;

    let path = OutputWriter::output_path_for(Path::new("/data/ep01.vtt"), Some(&out_dir), true);
    assert_eq!(path, out_dir.join("ep01.md"));
    Ok(())
}
