use compact_str::CompactString;
use smallvec::{smallvec, SmallVec};

use crate::error::SplitError;

/// The SQL variants with distinct lexical rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Standard,
    Postgres,
    MySql,
    Oracle,
    SqlServer,
}

impl DialectKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
        }
    }
}

// Multi-character operators, matched longest first. Single punctuation
// characters are handled by the lexer directly.
static STANDARD_OPERATORS: &[&str] = &["<>", "<=", ">=", "!=", "||", "=>"];

static POSTGRES_OPERATORS: &[&str] = &[
    "#>>", "->>", "<->", "<#>", "<<|", "|>>", "&<|", "|&>", "@-@", "!~*", "!~~", "~~*", "-|-",
    "<<=", ">>=", "#>", "#-", "->", "@>", "<@", "?|", "?&", "?#", "?-", "&&", "&<", "&>", "<<",
    ">>", "~*", "!~", "~~", "::", "||", "<>", "<=", ">=", "!=", "=>", "@@", "<^", ">^", "^@",
    "|/", "**",
];

static MYSQL_OPERATORS: &[&str] = &[
    "<=>", "->>", "<<", ">>", "<>", "<=", ">=", "!=", "||", "&&", ":=", "->",
];

static ORACLE_OPERATORS: &[&str] = &["<>", "<=", ">=", "!=", "^=", "~=", "||", ":=", "=>", ".."];

static SQLSERVER_OPERATORS: &[&str] = &["<>", "<=", ">=", "!=", "!<", "!>", "+=", "*=", "::"];

/// Lexical rules for one SQL variant.
///
/// Everything the character classifier and lexer need to know about a
/// dialect lives in this one struct: quote characters, comment markers,
/// escape conventions and the operator table.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub kind: DialectKind,
    /// Characters that open (and close) a string literal.
    pub string_quotes: SmallVec<[u8; 2]>,
    /// (open, close) pairs for quoted identifiers.
    pub identifier_quotes: SmallVec<[(u8, u8); 3]>,
    /// Line comment markers, e.g. `--` or `#`.
    pub line_comments: SmallVec<[CompactString; 2]>,
    pub block_comment_start: &'static str,
    pub block_comment_end: &'static str,
    /// `$tag$ ... $tag$` bodies.
    pub supports_dollar_quoting: bool,
    /// Backslash escapes inside every string literal.
    pub supports_backslash_escape: bool,
    /// `E'...'` strings with backslash escapes.
    pub supports_escape_string_prefix: bool,
    pub nested_block_comments: bool,
    /// BEGIN/END style blocks that must not be split on an embedded delimiter.
    pub procedural_blocks: bool,
    pub operators: &'static [&'static str],
}

impl Dialect {
    pub fn from_kind(kind: DialectKind) -> Self {
        let standard = Self {
            kind,
            string_quotes: smallvec![b'\''],
            identifier_quotes: smallvec![(b'"', b'"')],
            line_comments: smallvec![CompactString::from("--")],
            block_comment_start: "/*",
            block_comment_end: "*/",
            supports_dollar_quoting: false,
            supports_backslash_escape: false,
            supports_escape_string_prefix: false,
            nested_block_comments: false,
            procedural_blocks: true,
            operators: STANDARD_OPERATORS,
        };

        match kind {
            DialectKind::Standard => standard,
            DialectKind::Postgres => Self {
                supports_dollar_quoting: true,
                supports_escape_string_prefix: true,
                nested_block_comments: true,
                operators: POSTGRES_OPERATORS,
                ..standard
            },
            DialectKind::MySql => Self {
                string_quotes: smallvec![b'\'', b'"'],
                identifier_quotes: smallvec![(b'`', b'`')],
                line_comments: smallvec![
                    CompactString::from("--"),
                    CompactString::from("#")
                ],
                supports_backslash_escape: true,
                operators: MYSQL_OPERATORS,
                ..standard
            },
            DialectKind::Oracle => Self {
                operators: ORACLE_OPERATORS,
                ..standard
            },
            DialectKind::SqlServer => Self {
                identifier_quotes: smallvec![(b'"', b'"'), (b'[', b']')],
                operators: SQLSERVER_OPERATORS,
                ..standard
            },
        }
    }

    /// Create a dialect from a string name.
    pub fn from_name(name: &str) -> Result<Self, SplitError> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "standard" | "ansi" | "generic" => DialectKind::Standard,
            "postgres" | "postgresql" | "pg" => DialectKind::Postgres,
            "mysql" | "mariadb" => DialectKind::MySql,
            "oracle" => DialectKind::Oracle,
            "sqlserver" | "mssql" | "tsql" => DialectKind::SqlServer,
            _ => return Err(SplitError::Config(format!("Unknown dialect: {}", name))),
        };
        Ok(Self::from_kind(kind))
    }

    /// Add an extra line comment marker (e.g. `#` for a script written
    /// for a client that accepts it).
    pub fn with_line_comment(mut self, marker: &str) -> Result<Self, SplitError> {
        let marker = marker.trim();
        if marker.is_empty() {
            return Err(SplitError::Config(
                "Alternate line comment marker must not be empty".to_string(),
            ));
        }
        if !self.line_comments.iter().any(|m| m == marker) {
            self.line_comments.push(CompactString::from(marker));
        }
        Ok(self)
    }

    pub fn is_string_quote(&self, b: u8) -> bool {
        self.string_quotes.contains(&b)
    }

    /// Closing character for a quoted identifier opened by `b`.
    pub fn identifier_close(&self, b: u8) -> Option<u8> {
        self.identifier_quotes
            .iter()
            .find(|(open, _)| *open == b)
            .map(|(_, close)| *close)
    }

    /// Line comment marker starting at `bytes[0]`, if any.
    pub fn line_comment_at(&self, bytes: &[u8]) -> Option<usize> {
        self.line_comments
            .iter()
            .filter(|m| bytes.starts_with(m.as_bytes()))
            .map(|m| m.len())
            .max()
    }

    /// Length of the longest operator in the table starting at `bytes[0]`.
    pub fn operator_at(&self, bytes: &[u8]) -> Option<usize> {
        self.operators
            .iter()
            .filter(|op| bytes.starts_with(op.as_bytes()))
            .map(|op| op.len())
            .max()
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::from_kind(DialectKind::Standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard() {
        let dialect = Dialect::default();
        assert_eq!(dialect.kind, DialectKind::Standard);
        assert!(!dialect.supports_dollar_quoting);
        assert!(!dialect.supports_backslash_escape);
        assert!(dialect.is_string_quote(b'\''));
        assert!(!dialect.is_string_quote(b'"'));
        assert_eq!(dialect.identifier_close(b'"'), Some(b'"'));
    }

    #[test]
    fn test_postgres() {
        let dialect = Dialect::from_kind(DialectKind::Postgres);
        assert!(dialect.supports_dollar_quoting);
        assert!(dialect.supports_escape_string_prefix);
        assert!(dialect.nested_block_comments);
        assert_eq!(dialect.operator_at(b"#>>'{one}'"), Some(3));
        assert_eq!(dialect.operator_at(b"#>'{one}'"), Some(2));
        assert_eq!(dialect.operator_at(b"::text"), Some(2));
        assert_eq!(dialect.operator_at(b"+ 1"), None);
    }

    #[test]
    fn test_mysql() {
        let dialect = Dialect::from_kind(DialectKind::MySql);
        assert!(dialect.supports_backslash_escape);
        assert!(dialect.is_string_quote(b'"'));
        assert_eq!(dialect.identifier_close(b'`'), Some(b'`'));
        assert_eq!(dialect.line_comment_at(b"# note"), Some(1));
        assert_eq!(dialect.operator_at(b"<=> b"), Some(3));
    }

    #[test]
    fn test_sqlserver_brackets() {
        let dialect = Dialect::from_kind(DialectKind::SqlServer);
        assert_eq!(dialect.identifier_close(b'['), Some(b']'));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Dialect::from_name("postgresql").unwrap().kind, DialectKind::Postgres);
        assert_eq!(Dialect::from_name("MySQL").unwrap().kind, DialectKind::MySql);
        assert_eq!(Dialect::from_name("tsql").unwrap().kind, DialectKind::SqlServer);
        assert!(Dialect::from_name("unknown").is_err());
    }

    #[test]
    fn test_with_line_comment() {
        let dialect = Dialect::default().with_line_comment("#").unwrap();
        assert_eq!(dialect.line_comment_at(b"#x"), Some(1));
        assert_eq!(dialect.line_comment_at(b"-- x"), Some(2));
        assert!(Dialect::default().with_line_comment("  ").is_err());
    }
}
