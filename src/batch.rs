//! Pattern expansion and parallel batch processing.

use crate::backup::{backup_path, is_backup, remove_backup, restore_backup, write_with_backup};
use crate::transform::{needs_write, Sanitizer, TransformReport};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// VCS internal directories that are never traversed while expanding patterns
pub const VCS_INTERNALS: &[&str] = &[
    ".git", ".jj", ".svn", ".hg", ".bzr", "_darcs", ".pijul", "CVS", ".fossil",
];

/// What the batch does to each matched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Strip development code, backing up each rewritten file
    #[default]
    Sanitize,
    /// Put backups back in place of their sources
    Restore,
    /// Delete backups left by an earlier run
    CleanBackups,
    /// Overwrite each file with fixed content, backing it up first
    Replace,
}

/// Options controlling batch behavior (runtime flags)
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub mode: BatchMode,
    pub dry_run: bool,
    pub verbose: bool,
    pub show_progress: bool,
    pub backup_suffix: String,
    /// Content written by [`BatchMode::Replace`]
    pub replacement: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: BatchMode::Sanitize,
            dry_run: false,
            verbose: false,
            show_progress: false,
            backup_suffix: ".bak".to_string(),
            replacement: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processed,
    Skipped,
    Failed,
}

/// Result of handling one matched file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub error: Option<String>,
    /// Shrinkage of the rewritten file, zero unless processed
    pub bytes_removed: u64,
    pub report: TransformReport,
}

impl FileOutcome {
    fn processed(path: &Path, bytes_removed: u64, report: TransformReport) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Processed,
            error: None,
            bytes_removed,
            report,
        }
    }

    fn skipped(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Skipped,
            error: None,
            bytes_removed: 0,
            report: TransformReport::default(),
        }
    }

    fn failed(path: &Path, error: &anyhow::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            error: Some(format!("{:#}", error)),
            bytes_removed: 0,
            report: TransformReport::default(),
        }
    }
}

/// Aggregate counts for one batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_removed: u64,
}

impl BatchStats {
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome.status {
            FileStatus::Processed => self.processed += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed => self.failed += 1,
        }
        self.bytes_removed += outcome.bytes_removed;
    }

    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// A pattern that could not be expanded
#[derive(Debug, Clone)]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Everything a batch produced, outcomes sorted by path
#[derive(Debug)]
pub struct BatchReport {
    pub stats: BatchStats,
    pub outcomes: Vec<FileOutcome>,
    pub pattern_errors: Vec<PatternError>,
}

fn has_glob_meta(text: &str) -> bool {
    text.contains(['*', '?', '[', '{'])
}

/// Split a pattern into the literal directory it starts from and the glob
/// below it. `None` means the pattern has no glob characters at all.
fn split_pattern(pattern: &str) -> (PathBuf, Option<String>) {
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();

    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_glob_meta(&text) {
            base.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }

    if rest.is_empty() {
        return (base, None);
    }
    if base.as_os_str().is_empty() {
        base = PathBuf::from(".");
    }
    (base, Some(rest.join("/")))
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn is_vcs_internal(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| VCS_INTERNALS.contains(&name))
}

/// Expand one glob pattern into absolute file paths, sorted.
///
/// Matching is anchored at the pattern's literal directory prefix; `*` stops
/// at path separators and `**` crosses them. Hidden entries below the
/// prefix, VCS internals and backup files are never matched. A pattern that
/// matches nothing is not an error.
pub fn expand_pattern(pattern: &str, backup_suffix: &str) -> Result<Vec<PathBuf>> {
    if pattern.trim().is_empty() {
        anyhow::bail!("Empty pattern");
    }

    let (base, glob) = split_pattern(pattern);

    let Some(glob) = glob else {
        let matched = base.is_file() && !is_backup(&base, backup_suffix);
        return Ok(if matched { vec![absolute(&base)] } else { Vec::new() });
    };

    let mut builder = OverrideBuilder::new(&base);
    builder
        .add(&format!("/{}", glob))
        .with_context(|| format!("Invalid glob pattern '{}'", pattern))?;
    let overrides = builder
        .build()
        .with_context(|| format!("Invalid glob pattern '{}'", pattern))?;

    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(&base)
        .hidden(true)
        // Only the pattern decides what matches
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .overrides(overrides)
        .filter_entry(|entry| !is_vcs_internal(entry.path()))
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!(
                    "Warning: Failed to access entry while expanding '{}': {}",
                    pattern, err
                );
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if is_backup(entry.path(), backup_suffix) {
            continue;
        }
        files.push(absolute(entry.path()));
    }

    files.sort();
    Ok(files)
}

fn sanitize_file(path: &Path, sanitizer: &Sanitizer, options: &BatchOptions) -> Result<FileOutcome> {
    let original =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let transformed = sanitizer.transform(&original);

    if !needs_write(&original, &transformed.text) {
        return Ok(FileOutcome::skipped(path));
    }

    let bytes_removed = (original.len() as u64).saturating_sub(transformed.text.len() as u64);

    if !options.dry_run {
        let backup = write_with_backup(path, &original, &transformed.text, &options.backup_suffix)?;
        if options.verbose {
            println!("DEBUG: Backed up {} to {}", path.display(), backup.display());
        }
    }

    Ok(FileOutcome::processed(path, bytes_removed, transformed.report))
}

fn replace_file(path: &Path, options: &BatchOptions) -> Result<FileOutcome> {
    let replacement = options
        .replacement
        .as_deref()
        .context("Replace mode needs replacement content")?;
    let original =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if !needs_write(&original, replacement) {
        return Ok(FileOutcome::skipped(path));
    }

    let bytes_removed = (original.len() as u64).saturating_sub(replacement.len() as u64);

    if !options.dry_run {
        let backup = write_with_backup(path, &original, replacement, &options.backup_suffix)?;
        if options.verbose {
            println!("DEBUG: Backed up {} to {}", path.display(), backup.display());
        }
    }

    Ok(FileOutcome::processed(path, bytes_removed, TransformReport::default()))
}

fn maintain_backup(path: &Path, options: &BatchOptions) -> Result<FileOutcome> {
    let suffix = options.backup_suffix.as_str();
    let had_backup = if options.dry_run {
        backup_path(path, suffix).is_file()
    } else {
        match options.mode {
            BatchMode::Restore => restore_backup(path, suffix)?,
            _ => remove_backup(path, suffix)?,
        }
    };

    Ok(if had_backup {
        FileOutcome::processed(path, 0, TransformReport::default())
    } else {
        FileOutcome::skipped(path)
    })
}

/// Handle one file according to the batch mode. Errors are captured in the
/// outcome, never returned.
pub fn process_file(path: &Path, sanitizer: &Sanitizer, options: &BatchOptions) -> FileOutcome {
    if options.verbose {
        println!("DEBUG: Processing: {}", path.display());
    }

    let result = match options.mode {
        BatchMode::Sanitize => sanitize_file(path, sanitizer, options),
        BatchMode::Replace => replace_file(path, options),
        BatchMode::Restore | BatchMode::CleanBackups => maintain_backup(path, options),
    };

    result.unwrap_or_else(|err| FileOutcome::failed(path, &err))
}

/// Expand patterns and stream distinct matches to the channel.
/// A file matched by several patterns is sent once.
fn discover_files_streaming(
    patterns: &[String],
    backup_suffix: &str,
    sender: Sender<PathBuf>,
    progress: Arc<ProgressBar>,
) -> Vec<PatternError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut errors = Vec::new();

    for pattern in patterns {
        progress.set_message(format!("Expanding {}", pattern));

        let files = match expand_pattern(pattern, backup_suffix) {
            Ok(files) => files,
            Err(err) => {
                eprintln!("Warning: Skipping pattern '{}': {:#}", pattern, err);
                errors.push(PatternError {
                    pattern: pattern.clone(),
                    message: format!("{:#}", err),
                });
                continue;
            }
        };

        for file in files {
            if seen.insert(file.clone()) && sender.send(file).is_err() {
                // Receiver dropped, stop discovering
                return errors;
            }
        }
    }

    progress.set_message(format!("Discovered {} files", seen.len()));
    errors
}

/// Run a batch over `patterns`.
///
/// Pattern expansion streams paths from a producer thread while rayon handles
/// the files in parallel. Per-file failures and bad patterns are recorded in
/// the report; only a panicking producer makes this return an error.
pub fn run_batch(
    patterns: &[String],
    sanitizer: &Sanitizer,
    options: &BatchOptions,
) -> Result<BatchReport> {
    let progress = Arc::new(if options.show_progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    });
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
            .context("Invalid progress template")?,
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    // Create bounded channel for streaming matched files
    let (sender, receiver) = bounded::<PathBuf>(100);

    let patterns_clone = patterns.to_vec();
    let suffix_clone = options.backup_suffix.clone();
    let progress_clone = Arc::clone(&progress);

    let producer_handle = thread::spawn(move || {
        discover_files_streaming(&patterns_clone, &suffix_clone, sender, progress_clone)
    });

    let mut outcomes: Vec<FileOutcome> = receiver
        .into_iter()
        .par_bridge()
        .map(|path| {
            let outcome = process_file(&path, sanitizer, options);
            progress.inc(1);
            outcome
        })
        .collect();

    let pattern_errors = producer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Pattern expansion thread panicked"))?;

    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    let mut stats = BatchStats::default();
    for outcome in &outcomes {
        stats.record(outcome);
    }

    progress.finish_and_clear();

    Ok(BatchReport {
        stats,
        outcomes,
        pattern_errors,
    })
}
