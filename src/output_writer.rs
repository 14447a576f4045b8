/*!
 * Markdown output of completed summaries.
 *
 * Output files are never written partially: the document goes to a temporary
 * file in the destination directory, is synced, then renamed into place.
 * Existing summaries are left alone unless overwriting is requested.
 */

use log::{debug, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::file_utils::FileManager;
use crate::summary::SummaryResult;

/// Extension of summary files
pub const OUTPUT_EXTENSION: &str = "md";

/// Result of a write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The summary was written to the path
    Written(PathBuf),
    /// The path already existed and overwriting was off
    Skipped(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Skipped(path) => path,
        }
    }
}

// @struct: Output path mapping and atomic writes
pub struct OutputWriter;

impl OutputWriter {
    /// Where the summary of `input` goes
    ///
    /// Without `output` the summary sits next to the input. An `output` that
    /// is an existing directory, or has no `.md` extension, is a directory;
    /// a `.md` path is used as the file itself, but only for a single input.
    pub fn output_path_for(input: &Path, output: Option<&Path>, single_input: bool) -> PathBuf {
        let file_name = Self::summary_file_name(input);

        match output {
            Some(out) if single_input && !out.is_dir() && has_output_extension(out) => out.to_path_buf(),
            Some(dir) => dir.join(file_name),
            None => input.with_file_name(file_name),
        }
    }

    /// `<stem>.md`, or `<stem>.summary.md` when the input is Markdown itself
    fn summary_file_name(input: &Path) -> String {
        let stem = input.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "summary".to_string());
        if has_output_extension(input) {
            format!("{}.summary.{}", stem, OUTPUT_EXTENSION)
        } else {
            format!("{}.{}", stem, OUTPUT_EXTENSION)
        }
    }

    /// Markdown document for a summary of `source_name`
    pub fn render_markdown(source_name: &str, result: &SummaryResult) -> String {
        format!(
            "# Summary: {name}\n\n**Source File:** `{name}`\n\n---\n\n{body}\n",
            name = source_name,
            body = result.body.trim_end()
        )
    }

    /// Write the rendered summary to `destination`
    pub fn write(
        result: &SummaryResult,
        source_name: &str,
        destination: &Path,
        overwrite: bool,
    ) -> io::Result<WriteOutcome> {
        if destination.exists() && !overwrite {
            info!("Output exists, skipping: {}", destination.display());
            return Ok(WriteOutcome::Skipped(destination.to_path_buf()));
        }

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        FileManager::ensure_dir(&parent).map_err(|e| io::Error::other(e.to_string()))?;

        let document = Self::render_markdown(source_name, result);
        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(document.as_bytes())?;
        temp.as_file().sync_all()?;

        if overwrite {
            temp.persist(destination).map_err(|e| e.error)?;
        } else {
            // Another writer may have created the file since the check above
            match temp.persist_noclobber(destination) {
                Ok(_) => {}
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    info!("Output appeared while writing, skipping: {}", destination.display());
                    return Ok(WriteOutcome::Skipped(destination.to_path_buf()));
                }
                Err(e) => return Err(e.error),
            }
        }

        debug!("Wrote {} bytes to {}", document.len(), destination.display());
        Ok(WriteOutcome::Written(destination.to_path_buf()))
    }
}

fn has_output_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(OUTPUT_EXTENSION))
}
