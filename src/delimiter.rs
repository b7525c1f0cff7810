use compact_str::CompactString;
use memchr::{memchr, memrchr};

use crate::classifier::is_word_char;
use crate::error::SplitError;
use crate::token::{Pos, Token};

/// Outcome of checking a delimiter against the token at the cursor.
/// The payload is the offset just past the delimiter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    MatchesInline(Pos),
    /// The delimiter is the only non-whitespace content on its line.
    MatchesAtLineStart(Pos),
}

impl MatchResult {
    pub fn is_match(self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    pub fn end(self) -> Option<Pos> {
        match self {
            Self::NoMatch => None,
            Self::MatchesInline(end) | Self::MatchesAtLineStart(end) => Some(end),
        }
    }
}

/// A statement terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    literal: CompactString,
    requires_newline: bool,
    is_default: bool,
}

impl Delimiter {
    /// A terminator that may appear anywhere (`requires_newline = false`)
    /// or only alone on its own line. Fails for an empty literal.
    pub fn new(literal: &str, requires_newline: bool) -> Result<Self, SplitError> {
        let literal = literal.trim();
        if literal.is_empty() {
            return Err(SplitError::Delimiter(
                "delimiter literal must not be empty".to_string(),
            ));
        }
        Ok(Self {
            literal: CompactString::from(literal),
            requires_newline,
            is_default: false,
        })
    }

    /// The implicit terminator at the end of the buffer. It never matches a token.
    pub fn end_of_input() -> Self {
        Self {
            literal: CompactString::default(),
            requires_newline: false,
            is_default: true,
        }
    }

    /// Parse a delimiter definition as users type it: `/`, `GO`, `/;nl`
    /// (`;nl` = must be alone on its line) or one of the aliases `oracle`,
    /// `sqlplus` and `mssql`.
    pub fn parse(definition: &str) -> Result<Self, SplitError> {
        let definition = definition.trim();
        let lower = definition.to_ascii_lowercase();
        match lower.as_str() {
            "oracle" | "sqlplus" => return Self::new("/", true),
            "mssql" | "sqlserver" => return Self::new("GO", true),
            _ => {}
        }
        match lower.strip_suffix(";nl") {
            Some(stripped) => Self::new(&definition[..stripped.len()], true),
            None => Self::new(definition, false),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn requires_newline(&self) -> bool {
        self.requires_newline
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// The plain `;` terminator.
    pub fn is_standard(&self) -> bool {
        !self.is_default && self.literal == ";"
    }

    /// Check whether the delimiter starts at `token`.
    ///
    /// Only code tokens can start a delimiter, so delimiters inside string
    /// literals and comments are never seen. Alphabetic delimiters (`GO`)
    /// compare case-insensitively and must end on a word boundary.
    pub fn matches(&self, source: &str, token: &Token) -> MatchResult {
        if self.is_default || !token.is_code() || token.kind.is_literal() {
            return MatchResult::NoMatch;
        }

        let bytes = source.as_bytes();
        let literal = self.literal.as_bytes();
        let start = token.start;
        let end = start + literal.len();
        if end > bytes.len() || !bytes[start..end].eq_ignore_ascii_case(literal) {
            return MatchResult::NoMatch;
        }

        let last = literal[literal.len() - 1];
        if is_word_char(last) && bytes.get(end).is_some_and(|b| is_word_char(*b)) {
            return MatchResult::NoMatch;
        }

        if !self.requires_newline {
            return MatchResult::MatchesInline(end);
        }

        let line_start = memrchr(b'\n', &bytes[..start]).map_or(0, |p| p + 1);
        let line_end = memchr(b'\n', &bytes[end..]).map_or(bytes.len(), |p| end + p);
        let blank = |s: &[u8]| s.iter().all(u8::is_ascii_whitespace);
        if blank(&bytes[line_start..start]) && blank(&bytes[end..line_end]) {
            MatchResult::MatchesAtLineStart(end)
        } else {
            MatchResult::NoMatch
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self {
            literal: CompactString::from(";"),
            requires_newline: false,
            is_default: false,
        }
    }
}

/// The delimiters in effect at one point of a script: the primary
/// terminator plus an optional alternate one (e.g. `/` for PL/SQL blocks).
#[derive(Debug, Clone)]
pub struct DelimiterSet {
    pub primary: Delimiter,
    pub alternate: Option<Delimiter>,
}

impl DelimiterSet {
    pub fn new(primary: Delimiter, alternate: Option<Delimiter>) -> Self {
        Self { primary, alternate }
    }

    /// Find the delimiter starting at `token`. The alternate delimiter is
    /// checked first; the primary one is skipped when `alternate_only` is
    /// set and an alternate exists.
    pub fn find_match(
        &self,
        source: &str,
        token: &Token,
        alternate_only: bool,
    ) -> Option<(&Delimiter, Pos)> {
        if let Some(alternate) = &self.alternate {
            if let Some(end) = alternate.matches(source, token).end() {
                return Some((alternate, end));
            }
            if alternate_only {
                return None;
            }
        }
        self.primary
            .matches(source, token)
            .end()
            .map(|end| (&self.primary, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::lexer::tokenize;

    fn token_at(source: &str, start: Pos) -> Token {
        tokenize(source, &Dialect::default())
            .into_iter()
            .find(|t| t.start == start)
            .unwrap()
    }

    #[test]
    fn test_empty_literal_rejected() {
        assert!(Delimiter::new("", false).is_err());
        assert!(Delimiter::new("   ", true).is_err());
        assert!(Delimiter::parse(";nl").is_err());
    }

    #[test]
    fn test_default_and_end_of_input() {
        let delimiter = Delimiter::default();
        assert_eq!(delimiter.literal(), ";");
        assert!(delimiter.is_standard());
        assert!(!delimiter.is_default());

        let eoi = Delimiter::end_of_input();
        assert!(eoi.is_default());
        assert!(!eoi.is_standard());
        let source = "select 1;";
        assert_eq!(eoi.matches(source, &token_at(source, 8)), MatchResult::NoMatch);
    }

    #[test]
    fn test_parse_definitions() {
        let slash = Delimiter::parse("/;nl").unwrap();
        assert_eq!(slash.literal(), "/");
        assert!(slash.requires_newline());

        let go = Delimiter::parse("GO;NL").unwrap();
        assert_eq!(go.literal(), "GO");
        assert!(go.requires_newline());

        let oracle = Delimiter::parse("oracle").unwrap();
        assert_eq!(oracle.literal(), "/");
        assert!(oracle.requires_newline());

        let plain = Delimiter::parse("$$").unwrap();
        assert_eq!(plain.literal(), "$$");
        assert!(!plain.requires_newline());
    }

    #[test]
    fn test_inline_match() {
        let source = "select 1; select 2";
        let delimiter = Delimiter::default();
        assert_eq!(
            delimiter.matches(source, &token_at(source, 8)),
            MatchResult::MatchesInline(9)
        );
        assert_eq!(
            delimiter.matches(source, &token_at(source, 0)),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_word_delimiter_boundary() {
        let go = Delimiter::new("go", false).unwrap();
        let source = "select 1\nGO\nselect gopher";
        assert_eq!(
            go.matches(source, &token_at(source, 9)),
            MatchResult::MatchesInline(11)
        );
        assert_eq!(go.matches(source, &token_at(source, 19)), MatchResult::NoMatch);
    }

    #[test]
    fn test_requires_newline() {
        let slash = Delimiter::new("/", true).unwrap();
        let source = "select 4 / 2 from dual\n  /  \nselect 1";
        assert_eq!(slash.matches(source, &token_at(source, 9)), MatchResult::NoMatch);
        assert_eq!(
            slash.matches(source, &token_at(source, 25)),
            MatchResult::MatchesAtLineStart(26)
        );
    }

    #[test]
    fn test_never_matches_inside_literal() {
        let source = "select ';'";
        let literal = token_at(source, 7);
        assert_eq!(Delimiter::default().matches(source, &literal), MatchResult::NoMatch);
    }

    #[test]
    fn test_set_prefers_alternate() {
        let alternate = Delimiter::new("/", true).unwrap();
        let set = DelimiterSet::new(Delimiter::default(), Some(alternate));
        let source = "end;\n/\n";
        let found = |token: &Token, alternate_only: bool| {
            set.find_match(source, token, alternate_only)
                .map(|(d, end)| (d.literal().to_string(), end))
        };

        let semi = token_at(source, 3);
        assert_eq!(found(&semi, false), Some((";".to_string(), 4)));
        assert_eq!(found(&semi, true), None);

        let slash = token_at(source, 5);
        assert_eq!(found(&slash, true), Some(("/".to_string(), 6)));
    }
}
