//! Directive recognition on single source lines.

use crate::config::Config;

/// A directive carried by one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Inject the payload as a new line. An empty payload injects nothing.
    AddLine(&'a str),
    RemoveLine,
    RemoveBlock,
    /// Everything from here to end of file is test-only
    TestSectionStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    AddLine,
    RemoveLine,
    RemoveBlock,
}

/// Recognizes directive markers. Markers are matched as substrings anywhere on
/// the line, longest first, so a marker that happens to contain a shorter one
/// always wins.
#[derive(Debug, Clone)]
pub struct DirectiveLexer {
    markers: Vec<(String, MarkerKind)>,
    test_section: String,
}

impl DirectiveLexer {
    pub fn new(config: &Config) -> Self {
        let mut markers = vec![
            (config.markers.add_line.clone(), MarkerKind::AddLine),
            (config.markers.remove_line.clone(), MarkerKind::RemoveLine),
            (config.markers.remove_block.clone(), MarkerKind::RemoveBlock),
        ];
        if config.legacy.enabled {
            markers.push((config.legacy.add_line.clone(), MarkerKind::AddLine));
            markers.push((config.legacy.remove_line.clone(), MarkerKind::RemoveLine));
        }
        // Stable sort keeps declaration order between equal lengths
        markers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            markers,
            test_section: config.markers.test_section.clone(),
        }
    }

    pub fn lex<'a>(&self, line: &'a str) -> Option<Directive<'a>> {
        for (marker, kind) in &self.markers {
            if let Some(pos) = line.find(marker.as_str()) {
                return Some(match kind {
                    MarkerKind::AddLine => Directive::AddLine(line[pos + marker.len()..].trim()),
                    MarkerKind::RemoveLine => Directive::RemoveLine,
                    MarkerKind::RemoveBlock => Directive::RemoveBlock,
                });
            }
        }

        if line.trim_start().starts_with(self.test_section.as_str()) {
            return Some(Directive::TestSectionStart);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer() -> DirectiveLexer {
        DirectiveLexer::new(&Config::embedded().unwrap())
    }

    fn legacy_lexer() -> DirectiveLexer {
        let mut config = Config::embedded().unwrap();
        config.legacy.enabled = true;
        DirectiveLexer::new(&config)
    }

    #[test]
    fn test_plain_line_has_no_directive() {
        assert_eq!(lexer().lex("let x = 1;"), None);
        assert_eq!(lexer().lex(""), None);
        assert_eq!(lexer().lex("// CRITICAL: keep this comment"), None);
    }

    #[test]
    fn test_add_line_payload() {
        let lexer = lexer();
        assert_eq!(
            lexer.lex("    // CRITICAL: Add line in production!let now = Clock::get()?.unix_timestamp;"),
            Some(Directive::AddLine("let now = Clock::get()?.unix_timestamp;"))
        );
        assert_eq!(
            lexer.lex("// CRITICAL: Add line in production!   w = 9;   "),
            Some(Directive::AddLine("w = 9;"))
        );
    }

    #[test]
    fn test_add_line_payload_keeps_later_bangs() {
        assert_eq!(
            lexer().lex("// CRITICAL: Add line in production!require!(ok, Error::Nope);"),
            Some(Directive::AddLine("require!(ok, Error::Nope);"))
        );
    }

    #[test]
    fn test_add_line_empty_payload() {
        assert_eq!(
            lexer().lex("// CRITICAL: Add line in production!   "),
            Some(Directive::AddLine(""))
        );
    }

    #[test]
    fn test_remove_line_anywhere_on_line() {
        assert_eq!(
            lexer().lex("    unix_timestamp: Option<i64>, // CRITICAL: Remove line in production!"),
            Some(Directive::RemoveLine)
        );
    }

    #[test]
    fn test_remove_block() {
        assert_eq!(
            lexer().lex("    }; // CRITICAL: Remove block in production!"),
            Some(Directive::RemoveBlock)
        );
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        assert_eq!(lexer().lex("x; // critical: remove line in production!"), None);
    }

    #[test]
    fn test_test_section_must_start_line() {
        let lexer = lexer();
        assert_eq!(lexer.lex("#[cfg(test)]"), Some(Directive::TestSectionStart));
        assert_eq!(lexer.lex("    #[cfg(test)]"), Some(Directive::TestSectionStart));
        assert_eq!(lexer.lex("let s = \"#[cfg(test)]\";"), None);
    }

    #[test]
    fn test_marker_beats_test_section() {
        assert_eq!(
            lexer().lex("#[cfg(test)] // CRITICAL: Remove line in production!"),
            Some(Directive::RemoveLine)
        );
    }

    #[test]
    fn test_legacy_markers_off_by_default() {
        assert_eq!(lexer().lex("x; // CRITICAL: Remove in production!"), None);
        assert_eq!(lexer().lex("// CRITICAL: Add in production!y;"), None);
    }

    #[test]
    fn test_legacy_markers_when_enabled() {
        let lexer = legacy_lexer();
        assert_eq!(
            lexer.lex("x; // CRITICAL: Remove in production!"),
            Some(Directive::RemoveLine)
        );
        assert_eq!(
            lexer.lex("// CRITICAL: Add in production!y;"),
            Some(Directive::AddLine("y;"))
        );
        // Current markers still win
        assert_eq!(
            lexer.lex("}; // CRITICAL: Remove block in production!"),
            Some(Directive::RemoveBlock)
        );
    }

    #[test]
    fn test_longest_marker_wins() {
        let mut config = Config::embedded().unwrap();
        config.markers.remove_line = "// STRIP".to_string();
        config.markers.remove_block = "// STRIP BLOCK".to_string();
        let lexer = DirectiveLexer::new(&config);
        assert_eq!(lexer.lex("fn f() { // STRIP BLOCK"), Some(Directive::RemoveBlock));
        assert_eq!(lexer.lex("x; // STRIP"), Some(Directive::RemoveLine));
    }
}
