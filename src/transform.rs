//! Single-pass line transformer and change detection.

use crate::config::Config;
use crate::directives::{Directive, DirectiveLexer};
use crate::extent::{backward_extent, bracket_balance, forward_extent, BlockScan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    /// Consuming a block until the bracket balance drops to zero
    SkipBlock(i64),
    /// One-way: there is no end-of-test-section marker
    SkipTestSection,
}

/// What a transformation did to one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub lines_injected: usize,
    /// Source lines dropped, including those inside removed blocks
    pub lines_removed: usize,
    pub blocks_removed: usize,
    pub test_section_stripped: bool,
}

impl TransformReport {
    pub fn is_empty(&self) -> bool {
        *self == TransformReport::default()
    }
}

/// Cleaned text plus a record of what changed
#[derive(Debug, Clone)]
pub struct Transformed {
    pub text: String,
    pub report: TransformReport,
}

/// Rewrites annotated source into its production form.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    lexer: DirectiveLexer,
    block_scan: BlockScan,
    inject_indent: String,
}

impl Sanitizer {
    pub fn new(config: &Config) -> Self {
        Self {
            lexer: DirectiveLexer::new(config),
            block_scan: config.output.block_scan,
            inject_indent: config.output.inject_indent.clone(),
        }
    }

    pub fn transform(&self, source: &str) -> Transformed {
        let mut cleaned: Vec<String> = Vec::new();
        let mut report = TransformReport::default();
        let mut state = State::Normal;

        // Split on '\n' rather than lines() so '\r' survives and CRLF files
        // without directives come back byte-identical.
        for line in source.split('\n') {
            match state {
                State::SkipTestSection => {
                    report.lines_removed += 1;
                }
                State::SkipBlock(balance) => {
                    report.lines_removed += 1;
                    let balance = balance + bracket_balance(line);
                    state = if balance <= 0 {
                        State::Normal
                    } else {
                        State::SkipBlock(balance)
                    };
                }
                State::Normal => match self.lexer.lex(line) {
                    Some(Directive::AddLine(payload)) => {
                        if !payload.is_empty() {
                            cleaned.push(format!("{}{}", self.inject_indent, payload));
                            report.lines_injected += 1;
                        }
                    }
                    Some(Directive::RemoveLine) => {
                        report.lines_removed += 1;
                    }
                    Some(Directive::RemoveBlock) => {
                        let keep = backward_extent(&cleaned, self.block_scan);
                        report.lines_removed += cleaned.len() - keep + 1;
                        report.blocks_removed += 1;
                        cleaned.truncate(keep);

                        let balance = forward_extent(line);
                        if balance > 0 {
                            state = State::SkipBlock(balance);
                        }
                    }
                    Some(Directive::TestSectionStart) => {
                        report.lines_removed += 1;
                        report.test_section_stripped = true;
                        state = State::SkipTestSection;
                    }
                    None => cleaned.push(line.to_string()),
                },
            }
        }

        while cleaned.last().is_some_and(|line| line.trim().is_empty()) {
            cleaned.pop();
        }

        let mut text = cleaned.join("\n");
        text.push('\n');

        Transformed { text, report }
    }
}

/// Whether the cleaned text differs from the original enough to be written.
/// Surrounding whitespace is ignored on both sides.
pub fn needs_write(original: &str, cleaned: &str) -> bool {
    original.trim() != cleaned.trim()
}
