//! prodprep - Production Source Preparation
//!
//! prodprep rewrites annotated source files before a production build. Magic
//! comments mark code that only exists for local development (removed) and
//! code that only belongs in production (injected). Everything is lexical:
//! there is no parser, only line-by-line directive recognition and bracket
//! counting.
//!
//! ## Pipeline
//!
//! For every file matched by the batch patterns:
//! read → [`Sanitizer::transform`] → [`needs_write`] → backup → overwrite.
//!
//! Files without directives are left alone, so repeated runs are cheap and do
//! not touch modification times.

pub mod backup;
pub mod batch;
pub mod config;
pub mod directives;
pub mod extent;
pub mod transform;

// Re-export commonly used items
pub use backup::{backup_path, restore_backup, write_with_backup};
pub use batch::{
    expand_pattern, process_file, run_batch, BatchMode, BatchOptions, BatchReport, BatchStats,
    FileOutcome, FileStatus, PatternError,
};
pub use config::Config;
pub use directives::{Directive, DirectiveLexer};
pub use extent::BlockScan;
pub use transform::{needs_write, Sanitizer, TransformReport, Transformed};
