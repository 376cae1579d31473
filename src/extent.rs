//! Block extent resolution for the block-removal directive.
//!
//! Everything here is lexical. Brackets inside string literals or comments are
//! counted like any other, and the backward boundary is a guess based on how
//! the previous lines end, not on a parse.

use serde::Deserialize;

/// How far the backward scan may travel through already emitted lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BlockScan {
    /// Halt at a plain `//` comment line; removes nothing if it halts there
    #[default]
    StopAtComment,
    /// Like `StopAtComment`, but blank lines halt the scan too
    StopAtGap,
    /// Cross every line until a terminator or the buffer start
    Greedy,
}

impl BlockScan {
    fn halts_at(self, line: &str) -> bool {
        match self {
            BlockScan::StopAtComment => is_plain_comment(line),
            BlockScan::StopAtGap => line.trim().is_empty() || is_plain_comment(line),
            BlockScan::Greedy => false,
        }
    }
}

/// Opening minus closing brackets on a line, counting `{}`, `()` and `[]` together.
pub fn bracket_balance(line: &str) -> i64 {
    line.chars().fold(0, |acc, ch| match ch {
        '{' | '(' | '[' => acc + 1,
        '}' | ')' | ']' => acc - 1,
        _ => acc,
    })
}

/// Whether a trimmed line ends a statement or opens a block
fn ends_statement(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.ends_with(';') || trimmed.ends_with('{') || trimmed.ends_with(')')
}

/// A `//` comment that is not a `///` or `//!` doc comment. Doc comments
/// belong to the item below them and go with it.
fn is_plain_comment(line: &str) -> bool {
    let trimmed = line.trim();
    let outer_doc = trimmed.starts_with("///") && !trimmed.starts_with("////");
    trimmed.starts_with("//") && !outer_doc && !trimmed.starts_with("//!")
}

/// Length the buffer should be truncated to before a block-removal directive.
///
/// The boundary is the nearest line ending in `;`, `{` or `)`; it and
/// everything after it go. With no boundary the whole buffer goes, unless
/// the scan policy halted first, in which case nothing does.
pub fn backward_extent(buffer: &[String], scan: BlockScan) -> usize {
    for (index, line) in buffer.iter().enumerate().rev() {
        if ends_statement(line) {
            return index;
        }
        if scan.halts_at(line) {
            return buffer.len();
        }
    }
    0
}

/// Balance carried forward from the directive line. A positive value means
/// that many brackets are still open and following lines must be consumed.
pub fn forward_extent(directive_line: &str) -> i64 {
    bracket_balance(directive_line)
}
