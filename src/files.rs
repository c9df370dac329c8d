// SPDX-License-Identifier: GPL-3.0-only

//! Reading, transforming, and writing markdown files.
//!
//! [`transform_file`] handles a single document. [`transform_dir`] applies it
//! to every markdown file under a directory, mirroring the directory layout
//! into an output directory. A file that cannot be read or written is
//! recorded in the [`BatchReport`] and the remaining files are still
//! processed.
//!
//! # Example
//!
//! ```no_run
//! use mdfence::files::transform_dir;
//! use mdfence::transform::TransformOptions;
//! use std::path::Path;
//!
//! let report = transform_dir(
//!     Path::new("exports"),
//!     Path::new("cleaned"),
//!     &TransformOptions::default(),
//! )
//! .unwrap();
//!
//! println!("{} written, {} failed", report.written(), report.failed());
//! ```

use crate::transform::{TransformOptions, transform_with};
use serde::Serialize;
use snafu::prelude::*;
use std::fs;
use std::path::{Path, PathBuf, StripPrefixError};
use walkdir::WalkDir;

/// Error type for file and directory operations.
#[derive(Debug, Snafu)]
pub enum FileError {
    /// Failed to read an input file as UTF-8 text.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create a directory for an output file.
    #[snafu(display("failed to create directory {}: {source}", path.display()))]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The batch input path does not name a directory.
    #[snafu(display("{} is not a directory", path.display()))]
    NotADirectory {
        /// The path given as input directory.
        path: PathBuf,
    },

    /// Failed while walking the input directory.
    #[snafu(display("failed to walk {}: {source}", path.display()))]
    Walk {
        /// The input directory being walked.
        path: PathBuf,
        /// The underlying walk error.
        source: walkdir::Error,
    },

    /// A walked file was not located under the input directory.
    #[snafu(display("{} is outside the input directory", path.display()))]
    OutsideInputDir {
        /// The offending file.
        path: PathBuf,
        /// The underlying prefix error.
        source: StripPrefixError,
    },
}

/// One file scheduled for batch processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The markdown file to read.
    pub input: PathBuf,
    /// Where the transformed text is written.
    pub output: PathBuf,
}

/// What happened to a single file during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The file was transformed and written.
    Written {
        /// The file that was read.
        input: PathBuf,
        /// The file that was written.
        output: PathBuf,
    },
    /// The file could not be processed.
    Failed {
        /// The file that was being processed.
        input: PathBuf,
        /// Why processing failed.
        error: String,
    },
}

impl FileOutcome {
    /// The input file this outcome refers to.
    #[must_use]
    pub fn input(&self) -> &Path {
        match self {
            Self::Written { input, .. } | Self::Failed { input, .. } => input,
        }
    }
}

/// Per-file results of a batch run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One outcome per processed file.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Number of files written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Written { .. }))
            .count()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.written()
    }

    /// Returns `true` if no file failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Reads `input` and returns its transformed text.
///
/// # Errors
///
/// Returns [`FileError::ReadFile`] if the file cannot be read or is not
/// valid UTF-8.
pub fn transform_to_string(input: &Path, opts: &TransformOptions) -> Result<String, FileError> {
    let text = fs::read_to_string(input).context(ReadFileSnafu { path: input })?;
    Ok(transform_with(&text, opts))
}

/// Transforms `input` and writes the result to `output`, or back to `input`.
///
/// Parent directories of the output are created as needed. Returns the path
/// that was written.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written. Nothing is written when reading fails.
pub fn transform_file(
    input: &Path,
    output: Option<&Path>,
    opts: &TransformOptions,
) -> Result<PathBuf, FileError> {
    let transformed = transform_to_string(input, opts)?;
    let target = output.unwrap_or(input);
    write_file(target, &transformed)?;
    Ok(target.to_path_buf())
}

/// Returns `true` if `path` has a `.md` or `.markdown` extension.
#[must_use]
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}

/// Collects every markdown file under `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if `dir` is not a directory or cannot be walked.
pub fn collect_markdown_files(dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    ensure!(dir.is_dir(), NotADirectorySnafu { path: dir });

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context(WalkSnafu { path: dir })?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Pairs every markdown file under `indir` with its mirrored path in `outdir`.
///
/// When `outdir` is nested inside `indir`, files already under `outdir` are
/// skipped so earlier outputs are not picked up again. An `outdir` equal to
/// `indir` transforms every file in place.
///
/// # Errors
///
/// Returns an error if `indir` is not a directory or cannot be walked.
pub fn plan_batch(indir: &Path, outdir: &Path) -> Result<Vec<BatchEntry>, FileError> {
    let nested_outdir = outdir != indir && outdir.starts_with(indir);

    let mut entries = Vec::new();
    for input in collect_markdown_files(indir)? {
        if nested_outdir && input.starts_with(outdir) {
            continue;
        }
        let relative = input
            .strip_prefix(indir)
            .context(OutsideInputDirSnafu { path: &input })?;
        let output = outdir.join(relative);
        entries.push(BatchEntry { input, output });
    }
    Ok(entries)
}

/// Transforms every entry, recording failures instead of stopping.
#[must_use]
pub fn run_batch(entries: &[BatchEntry], opts: &TransformOptions) -> BatchReport {
    let outcomes = entries
        .iter()
        .map(
            |entry| match transform_file(&entry.input, Some(&entry.output), opts) {
                Ok(output) => FileOutcome::Written {
                    input: entry.input.clone(),
                    output,
                },
                Err(err) => FileOutcome::Failed {
                    input: entry.input.clone(),
                    error: err.to_string(),
                },
            },
        )
        .collect();

    BatchReport { outcomes }
}

/// Transforms every markdown file under `indir` into the mirrored path under
/// `outdir`.
///
/// # Errors
///
/// Only fails if `indir` cannot be listed. Per-file failures are reported in
/// the returned [`BatchReport`].
pub fn transform_dir(
    indir: &Path,
    outdir: &Path,
    opts: &TransformOptions,
) -> Result<BatchReport, FileError> {
    let entries = plan_batch(indir, outdir)?;
    Ok(run_batch(&entries, opts))
}

fn write_file(path: &Path, contents: &str) -> Result<(), FileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
    }
    fs::write(path, contents).context(WriteFileSnafu { path })
}
