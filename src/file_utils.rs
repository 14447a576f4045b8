use anyhow::{Result, Context, anyhow};
use chrono::Local;
use log::warn;
use std::fs;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::normalizer::{SourceFormat, looks_binary};

// @module: File and directory utilities

/// Inputs above this size are processed but reported
pub const LARGE_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Bytes read to classify a file without a known extension
const SNIFF_BYTES: usize = 512;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Whether a file is large enough to warn about
    pub fn is_large_file<P: AsRef<Path>>(path: P) -> bool {
        fs::metadata(path)
            .map(|m| m.len() > LARGE_FILE_BYTES)
            .unwrap_or(false)
    }

    /// Classify a file for discovery
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        match SourceFormat::from_path(path) {
            Some(SourceFormat::Plain) => return Ok(FileType::Text),
            Some(_) => return Ok(FileType::Subtitle),
            None => {}
        }

        let mut head = Vec::with_capacity(SNIFF_BYTES);
        fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?
            .take(SNIFF_BYTES as u64)
            .read_to_end(&mut head)?;

        if looks_binary(&head) {
            Ok(FileType::Binary)
        } else {
            Ok(FileType::Text)
        }
    }

    /// Collect the input files of a directory, sorted by path
    ///
    /// Only the top level is scanned unless `recursive` is set. Files with a
    /// known extension are always taken; other files only when they look like
    /// text, or unconditionally with `force_text`.
    pub fn find_input_files<P: AsRef<Path>>(dir: P, recursive: bool, force_text: bool) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut walker = WalkDir::new(dir).follow_links(true).min_depth(1);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut result = Vec::new();
        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() || is_hidden(path) || is_summary_output(path) {
                continue;
            }

            let accepted = force_text || match Self::detect_file_type(path) {
                Ok(FileType::Subtitle) | Ok(FileType::Text) => true,
                Ok(FileType::Binary) => false,
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    false
                }
            };
            if accepted {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Context for the prompt: the trimmed contents of a file when the value
    /// names one, otherwise the value itself
    pub fn read_context(value: &str) -> Result<String> {
        let path = Path::new(value);
        if Self::file_exists(path) {
            Ok(Self::read_to_string(path)?.trim().to_string())
        } else {
            Ok(value.to_string())
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Markdown files are where summaries land; never feed them back in
fn is_summary_output(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle file (SRT, VTT, ASS/SSA)
    Subtitle,
    /// Plain text, by extension or content
    Text,
    /// Content that does not look like text
    Binary,
}
