use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use humansize::{format_size, BINARY};
use std::fs;
use std::path::PathBuf;

use prodprep::{
    run_batch, BatchMode, BatchOptions, BatchReport, BlockScan, Config, FileStatus, Sanitizer,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Strip development-only code from annotated sources before a production build",
    long_about = None,
    after_help = "Example: prodprep \"programs/*/src/**/*.rs\" \"work/*/*.rs\""
)]
struct Args {
    /// File glob patterns to process
    #[arg(required = true, value_name = "PATTERNS")]
    patterns: Vec<String>,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Show per-file progress and debug information
    #[arg(long, short)]
    verbose: bool,

    /// TOML file overriding the built-in directive markers and output settings
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suffix appended to the original path for backups
    #[arg(long, value_name = "SUFFIX")]
    backup_suffix: Option<String>,

    /// How far a block-removal directive may reach back into preceding lines
    #[arg(long, value_enum)]
    block_scan: Option<BlockScan>,

    /// Also accept the first-generation "Add/Remove in production!" markers
    #[arg(long)]
    legacy_markers: bool,

    /// Restore matched files from their backups instead of sanitizing
    #[arg(long, conflicts_with_all = ["clean_backups", "replace_with"])]
    restore: bool,

    /// Delete backups of matched files instead of sanitizing
    #[arg(long, conflicts_with = "replace_with")]
    clean_backups: bool,

    /// Overwrite matched files with the contents of FILE instead of sanitizing
    #[arg(long, value_name = "FILE")]
    replace_with: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> BatchMode {
        if self.restore {
            BatchMode::Restore
        } else if self.clean_backups {
            BatchMode::CleanBackups
        } else if self.replace_with.is_some() {
            BatchMode::Replace
        } else {
            BatchMode::Sanitize
        }
    }
}

fn print_outcomes(report: &BatchReport, options: &BatchOptions) {
    let rewritten = match (options.mode, options.dry_run) {
        (BatchMode::Sanitize, false) => "Successfully processed",
        (BatchMode::Sanitize, true) => "Would rewrite",
        (BatchMode::Restore, false) => "Restored",
        (BatchMode::Restore, true) => "Would restore",
        (BatchMode::CleanBackups, false) => "Removed backup of",
        (BatchMode::CleanBackups, true) => "Would remove backup of",
        (BatchMode::Replace, false) => "Replaced",
        (BatchMode::Replace, true) => "Would replace",
    };

    for outcome in &report.outcomes {
        match outcome.status {
            FileStatus::Processed => {
                if options.mode == BatchMode::Sanitize {
                    let r = outcome.report;
                    let mut detail = format!(
                        "-{} lines, +{} injected",
                        r.lines_removed, r.lines_injected
                    );
                    if r.blocks_removed > 0 {
                        detail.push_str(&format!(", {} blocks", r.blocks_removed));
                    }
                    if r.test_section_stripped {
                        detail.push_str(", test section stripped");
                    }
                    println!("{}: {} ({})", rewritten, outcome.path.display(), detail);
                } else {
                    println!("{}: {}", rewritten, outcome.path.display());
                }
            }
            FileStatus::Skipped => {
                if options.verbose {
                    println!("No changes needed for: {}", outcome.path.display());
                }
            }
            FileStatus::Failed => {
                eprintln!(
                    "{}",
                    format!(
                        "Failed to process {}: {}",
                        outcome.path.display(),
                        outcome.error.as_deref().unwrap_or("unknown error")
                    )
                    .red()
                );
            }
        }
    }
}

fn print_summary(report: &BatchReport, options: &BatchOptions) {
    let stats = &report.stats;
    let heading = match options.mode {
        BatchMode::Sanitize => "Production Preparation Summary:",
        BatchMode::Restore => "Restore Summary:",
        BatchMode::CleanBackups => "Cleanup Summary:",
        BatchMode::Replace => "Replacement Summary:",
    };

    println!();
    println!("{}", heading.bold());
    println!("Files processed: {}", stats.processed.to_string().green());
    println!("Files skipped (no changes): {}", stats.skipped);
    let failed = if stats.failed > 0 {
        stats.failed.to_string().red().bold()
    } else {
        stats.failed.to_string().normal()
    };
    println!("Files failed: {}", failed);
    if matches!(options.mode, BatchMode::Sanitize | BatchMode::Replace) {
        println!("Bytes stripped: {}", format_size(stats.bytes_removed, BINARY));
    }
    if !report.pattern_errors.is_empty() {
        println!(
            "Patterns skipped: {}",
            report.pattern_errors.len().to_string().yellow()
        );
        for error in &report.pattern_errors {
            println!("  {}: {}", error.pattern, error.message);
        }
    }
    if options.dry_run {
        println!("Dry run mode: No files were written.");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(suffix) = &args.backup_suffix {
        config.output.backup_suffix = suffix.clone();
    }
    if let Some(scan) = args.block_scan {
        config.output.block_scan = scan;
    }
    if args.legacy_markers {
        config.legacy.enabled = true;
    }
    config.validate()?;

    let replacement = match &args.replace_with {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read replacement file {}", path.display()))?,
        ),
        None => None,
    };

    let options = BatchOptions {
        mode: args.mode(),
        dry_run: args.dry_run,
        verbose: args.verbose,
        show_progress: !args.verbose,
        backup_suffix: config.output.backup_suffix.clone(),
        replacement,
    };

    if args.verbose {
        println!("DEBUG: Processing files with patterns: {:?}", args.patterns);
        println!("DEBUG: Block scan: {:?}", config.output.block_scan);
    }

    let sanitizer = Sanitizer::new(&config);
    let report = run_batch(&args.patterns, &sanitizer, &options)?;

    print_outcomes(&report, &options);
    print_summary(&report, &options);

    Ok(())
}
