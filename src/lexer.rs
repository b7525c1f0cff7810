use std::collections::VecDeque;

use memchr::{memchr, memchr2, memmem};
use tracing::trace;

use crate::classifier::{classify, is_word_char, CharClass, QuoteStyle};
use crate::dialect::Dialect;
use crate::token::{CommentKind, Pos, Token, TokenKind};

/// Reserved words reported as `TokenKind::Keyword`. Everything else that
/// looks like a word is an `Identifier`.
static KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "all", "alter", "and", "any", "as", "asc", "begin", "between", "body", "by", "call",
    "case", "check", "close", "commit", "constraint", "create", "cross", "cursor",
    "declare", "default", "delete", "desc", "distinct", "do", "drop", "else", "elsif",
    "end", "exception", "exec", "execute", "exists", "fetch", "for", "foreign", "from",
    "full", "function", "go", "grant", "group", "having", "if", "in", "index", "inner",
    "insert", "intersect", "into", "is", "join", "key", "language", "left", "like",
    "limit", "loop", "merge", "minus", "not", "null", "of", "on", "open", "or", "order",
    "outer", "package", "primary", "procedure", "references", "repeat", "replace",
    "return", "returns", "revoke", "right", "rollback", "savepoint", "select", "set",
    "table", "then", "to", "transaction", "trigger", "truncate", "union", "unique",
    "until", "update", "using", "values", "view", "when", "where", "while", "with",
};

pub fn is_keyword(word: &str) -> bool {
    word.len() <= 16 && KEYWORDS.contains(word.to_ascii_lowercase().as_str())
}

/// Byte length of leading ASCII whitespace (newlines included).
#[inline]
fn scan_whitespace(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len())
}

/// Scan an identifier or keyword. `skip` leading bytes are taken as-is
/// (`@`, `#`, `$` sigils).
#[inline]
fn scan_word(bytes: &[u8], skip: usize) -> usize {
    let mut i = skip;
    while i < bytes.len() && is_word_char(bytes[i]) {
        // `END$$`: a dollar quote or custom delimiter glued to the word
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'$') {
            break;
        }
        i += 1;
    }
    i
}

/// Scan a number starting at bytes[0]. Handles hex (0x...), decimals with
/// an optional fractional part, and scientific notation.
fn scan_number(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let mut i = 0;

    if len > 2
        && bytes[0] == b'0'
        && (bytes[1] == b'x' || bytes[1] == b'X')
        && bytes[2].is_ascii_hexdigit()
    {
        i = 2;
        while i < len && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        return i;
    }

    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }

    if i < len && bytes[i] == b'.' && !(i + 1 < len && bytes[i + 1] == b'.') {
        i += 1;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < len && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < len && bytes[j].is_ascii_digit() {
            i = j;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    i
}

/// Scan a string literal. A doubled quote is an embedded quote; a
/// backslash escapes the next byte when the style allows it.
/// Returns the byte length including prefix and delimiters, or the whole
/// remaining input when the literal is unterminated.
fn scan_string(bytes: &[u8], style: QuoteStyle) -> usize {
    let quote = style.quote;
    let mut i = style.prefix_len + 1;
    while i < bytes.len() {
        let found = if style.backslash_escape {
            memchr2(quote, b'\\', &bytes[i..])
        } else {
            memchr(quote, &bytes[i..])
        };
        let Some(offset) = found else {
            return bytes.len();
        };
        let pos = i + offset;
        if bytes[pos] == b'\\' {
            i = pos + 2;
            continue;
        }
        if pos + 1 < bytes.len() && bytes[pos + 1] == quote {
            i = pos + 2;
            continue;
        }
        return pos + 1;
    }
    bytes.len()
}

/// Scan a quoted identifier up to `close`; a doubled closing character is
/// part of the name.
fn scan_quoted_identifier(bytes: &[u8], close: u8) -> usize {
    let mut i = 1;
    while i < bytes.len() {
        let Some(offset) = memchr(close, &bytes[i..]) else {
            return bytes.len();
        };
        let pos = i + offset;
        if pos + 1 < bytes.len() && bytes[pos + 1] == close {
            i = pos + 2;
            continue;
        }
        return pos + 1;
    }
    bytes.len()
}

/// Scan a line comment (marker included, line break excluded).
fn scan_line_comment(bytes: &[u8]) -> usize {
    match memchr(b'\n', bytes) {
        Some(offset) if offset > 0 && bytes[offset - 1] == b'\r' => offset - 1,
        Some(offset) => offset,
        None => bytes.len(),
    }
}

/// Scan a block comment. `bytes` starts at `/*`. Returns byte length including delimiters.
fn scan_block_comment(bytes: &[u8], nested: bool) -> usize {
    let mut depth = 1usize;
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
            continue;
        }
        if nested && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
            continue;
        }
        i += 1;
    }
    bytes.len()
}

/// Scan a dollar-quoted string ($tag$...$tag$). `bytes` starts at `$`.
fn scan_dollar_string(bytes: &[u8], tag_len: usize) -> usize {
    let tag = &bytes[..tag_len];
    match memmem::find(&bytes[tag_len..], tag) {
        Some(offset) => tag_len + offset + tag_len,
        None => bytes.len(),
    }
}

/// A single-pass scanner over one source buffer.
///
/// The lexer is lazy: each call to [`Lexer::next_token`] scans exactly one
/// token. Tokens are lossless, so concatenating the text of every token
/// reproduces the source. Malformed input never fails; an unterminated
/// literal or comment simply runs to the end of the buffer.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    dialect: &'a Dialect,
    pos: Pos,
    pending: VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, dialect: &'a Dialect) -> Self {
        Self {
            source,
            dialect,
            pos: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn dialect(&self) -> &'a Dialect {
        self.dialect
    }

    /// Offset of the next token that will be returned.
    pub fn position(&self) -> Pos {
        self.pending.front().map_or(self.pos, |t| t.start)
    }

    /// Return the next token, optionally skipping whitespace and comments.
    /// Once the input is exhausted this keeps returning `EndOfInput`.
    pub fn next_token(&mut self, skip_whitespace: bool, skip_comments: bool) -> Token {
        loop {
            let token = match self.pending.pop_front() {
                Some(token) => token,
                None => self.scan(),
            };
            if token.is_end_of_input() {
                return token;
            }
            if (skip_whitespace && token.is_whitespace()) || (skip_comments && token.is_comment()) {
                continue;
            }
            return token;
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self, skip_whitespace: bool, skip_comments: bool) -> Token {
        let saved_pos = self.pos;
        let saved_pending = self.pending.clone();
        let token = self.next_token(skip_whitespace, skip_comments);
        self.pos = saved_pos;
        self.pending = saved_pending;
        token
    }

    /// Re-queue a token so the next call returns it again.
    pub fn push_back(&mut self, token: Token) {
        if !token.is_end_of_input() {
            self.pending.push_front(token);
        }
    }

    fn scan(&mut self) -> Token {
        let start = self.pos;
        let bytes = &self.source.as_bytes()[start..];
        let Some(class) = classify(self.dialect, bytes) else {
            return Token::end_of_input(self.source.len());
        };

        let (kind, len) = match class {
            CharClass::Whitespace => (TokenKind::Whitespace, scan_whitespace(bytes)),
            CharClass::LineComment { .. } => (
                TokenKind::Comment(CommentKind::Line),
                scan_line_comment(bytes),
            ),
            CharClass::BlockComment => {
                let len = scan_block_comment(bytes, self.dialect.nested_block_comments);
                if !bytes[..len].ends_with(self.dialect.block_comment_end.as_bytes()) || len < 4 {
                    trace!(start, "unterminated block comment runs to end of input");
                }
                (TokenKind::Comment(CommentKind::Block), len)
            }
            CharClass::StringLiteral(style) => {
                let len = scan_string(bytes, style);
                if len == bytes.len() && bytes[len - 1] != style.quote {
                    trace!(start, "unterminated string literal runs to end of input");
                }
                (TokenKind::LiteralString, len)
            }
            CharClass::DollarQuote { tag_len } => {
                (TokenKind::LiteralString, scan_dollar_string(bytes, tag_len))
            }
            CharClass::QuotedIdentifier { close } => {
                (TokenKind::Identifier, scan_quoted_identifier(bytes, close))
            }
            CharClass::Number => (TokenKind::LiteralNumber, scan_number(bytes).max(1)),
            CharClass::Word => {
                let skip = bytes
                    .iter()
                    .take_while(|b| **b == b'@' || **b == b'#')
                    .count();
                let len = scan_word(bytes, skip).max(1);
                let text = &self.source[start..start + len];
                let kind = if is_keyword(text) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                (kind, len)
            }
            CharClass::Operator { len } => (TokenKind::Operator, len),
            CharClass::Punctuation => (TokenKind::Operator, 1),
            CharClass::Unknown => {
                let len = self.source[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                (TokenKind::Unknown, len)
            }
        };

        self.pos = start + len;
        Token::new(kind, &self.source[start..self.pos], start)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token(false, false);
        if token.is_end_of_input() {
            None
        } else {
            Some(token)
        }
    }
}

/// Tokenize a whole buffer. The result never contains `EndOfInput`.
pub fn tokenize(text: &str, dialect: &Dialect) -> Vec<Token> {
    Lexer::new(text, dialect).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    fn kinds_and_texts(text: &str, dialect: &Dialect) -> Vec<(TokenKind, String)> {
        tokenize(text, dialect)
            .into_iter()
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_scan_whitespace() {
        assert_eq!(scan_whitespace(b"  hello"), 2);
        assert_eq!(scan_whitespace(b"\n\t x"), 3);
        assert_eq!(scan_whitespace(b"   "), 3);
    }

    #[test]
    fn test_scan_word() {
        assert_eq!(scan_word(b"select", 0), 6);
        assert_eq!(scan_word(b"my_table", 0), 8);
        assert_eq!(scan_word(b"foo123 bar", 0), 6);
        assert_eq!(scan_word(b"v$session x", 0), 9);
        assert_eq!(scan_word(b"END$$\n", 0), 3);
        assert_eq!(scan_word(b"@var = 1", 1), 4);
    }

    #[test]
    fn test_scan_number() {
        assert_eq!(scan_number(b"42"), 2);
        assert_eq!(scan_number(b"3.14"), 4);
        assert_eq!(scan_number(b"1e10"), 4);
        assert_eq!(scan_number(b"2.5E-3)"), 6);
        assert_eq!(scan_number(b"0xFF"), 4);
        assert_eq!(scan_number(b".5"), 2);
        assert_eq!(scan_number(b"1..10"), 1);
    }

    #[test]
    fn test_scan_string() {
        let plain = QuoteStyle {
            quote: b'\'',
            backslash_escape: false,
            prefix_len: 0,
        };
        assert_eq!(scan_string(b"'hello' x", plain), 7);
        assert_eq!(scan_string(b"'it''s here' x", plain), 12);
        assert_eq!(scan_string(b"'a\\' b", plain), 4);
        assert_eq!(scan_string(b"'open", plain), 5);

        let escaped = QuoteStyle {
            backslash_escape: true,
            ..plain
        };
        assert_eq!(scan_string(b"'it\\'s' x", escaped), 7);

        let prefixed = QuoteStyle {
            quote: b'\'',
            backslash_escape: true,
            prefix_len: 1,
        };
        assert_eq!(scan_string(b"E'a\\'b' x", prefixed), 7);
    }

    #[test]
    fn test_scan_comments() {
        assert_eq!(scan_line_comment(b"-- note\nselect"), 7);
        assert_eq!(scan_line_comment(b"-- note\r\nselect"), 7);
        assert_eq!(scan_line_comment(b"-- last"), 7);
        assert_eq!(scan_block_comment(b"/* a */ b", false), 7);
        assert_eq!(scan_block_comment(b"/* a /* b */ c */", false), 12);
        assert_eq!(scan_block_comment(b"/* a /* b */ c */", true), 17);
        assert_eq!(scan_block_comment(b"/* open", false), 7);
    }

    #[test]
    fn test_dollar_string() {
        assert_eq!(scan_dollar_string(b"$$hello$$", 2), 9);
        assert_eq!(scan_dollar_string(b"$tag$hello$tag$", 5), 15);
        assert_eq!(scan_dollar_string(b"$tag$ a $other$ b $tag$;", 5), 23);
        assert_eq!(scan_dollar_string(b"$$open", 2), 6);
    }

    #[test]
    fn test_lex_simple_statement() {
        let dialect = Dialect::default();
        let tokens = kinds_and_texts("select a, 1 from t;", &dialect);
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "select".to_string()),
                (TokenKind::Whitespace, " ".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Operator, ",".to_string()),
                (TokenKind::Whitespace, " ".to_string()),
                (TokenKind::LiteralNumber, "1".to_string()),
                (TokenKind::Whitespace, " ".to_string()),
                (TokenKind::Keyword, "from".to_string()),
                (TokenKind::Whitespace, " ".to_string()),
                (TokenKind::Identifier, "t".to_string()),
                (TokenKind::Operator, ";".to_string()),
            ]
        );
    }

    #[test]
    fn test_lex_quote_escape_round_trip() {
        let dialect = Dialect::default();
        let tokens = tokenize("'it''s here'", &dialect);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::LiteralString);
        assert_eq!(tokens[0].text, "'it''s here'");
    }

    #[test]
    fn test_lex_postgres_operator() {
        let dialect = Dialect::from_kind(DialectKind::Postgres);
        let mut lexer = Lexer::new("select foo#>>'{one}' from table", &dialect);
        let texts: Vec<String> = std::iter::from_fn(|| {
            let t = lexer.next_token(true, true);
            (!t.is_end_of_input()).then(|| t.text.to_string())
        })
        .collect();
        assert_eq!(texts, vec!["select", "foo", "#>>", "'{one}'", "from", "table"]);
    }

    #[test]
    fn test_lex_escape_string_prefix() {
        let dialect = Dialect::from_kind(DialectKind::Postgres);
        let tokens = tokenize(r"select E'a\'b', 'c\' from t", &dialect);
        let literals: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::LiteralString)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(literals, vec![r"E'a\'b'", r"'c\'"]);
    }

    #[test]
    fn test_lex_dollar_quoted_body() {
        let dialect = Dialect::from_kind(DialectKind::Postgres);
        let tokens = tokenize("select $body$ a; 'b; $body$;", &dialect);
        assert_eq!(tokens[2].kind, TokenKind::LiteralString);
        assert_eq!(tokens[2].text, "$body$ a; 'b; $body$");
        assert_eq!(tokens[3].text, ";");
    }

    #[test]
    fn test_lex_comments() {
        let dialect = Dialect::default();
        let tokens = tokenize("-- lead\nselect /* x; */ 1", &dialect);
        assert_eq!(tokens[0].kind, TokenKind::Comment(CommentKind::Line));
        assert_eq!(tokens[0].text, "-- lead");
        assert_eq!(tokens[1].text, "\n");
        assert_eq!(tokens[4].kind, TokenKind::Comment(CommentKind::Block));
        assert_eq!(tokens[4].text, "/* x; */");
    }

    #[test]
    fn test_lex_mysql_hash_comment_and_backticks() {
        let dialect = Dialect::from_kind(DialectKind::MySql);
        let tokens = kinds_and_texts("select `a;b` # c;\n", &dialect);
        assert_eq!(tokens[2], (TokenKind::Identifier, "`a;b`".to_string()));
        assert_eq!(tokens[4], (TokenKind::Comment(CommentKind::Line), "# c;".to_string()));
    }

    #[test]
    fn test_lex_unterminated_constructs() {
        let dialect = Dialect::default();
        let tokens = tokenize("select 'abc; def", &dialect);
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::LiteralString);
        assert_eq!(last.text, "'abc; def");

        let tokens = tokenize("select 1 /* never closed;", &dialect);
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Comment(CommentKind::Block));
        assert_eq!(last.end, 25);
    }

    #[test]
    fn test_end_of_input_is_sticky() {
        let dialect = Dialect::default();
        let mut lexer = Lexer::new("x", &dialect);
        assert_eq!(lexer.next_token(false, false).text, "x");
        assert!(lexer.next_token(false, false).is_end_of_input());
        assert!(lexer.next_token(true, true).is_end_of_input());
        assert!(lexer.next_token(false, false).is_end_of_input());
    }

    #[test]
    fn test_peek_and_push_back() {
        let dialect = Dialect::default();
        let mut lexer = Lexer::new("begin  -- c\n end", &dialect);
        let first = lexer.next_token(false, false);
        assert_eq!(first.text, "begin");

        let peeked = lexer.peek_token(true, true);
        assert_eq!(peeked.text, "end");
        assert_eq!(lexer.position(), 5);

        let ws = lexer.next_token(false, false);
        assert_eq!(ws.kind, TokenKind::Whitespace);
        lexer.push_back(ws.clone());
        assert_eq!(lexer.position(), 5);
        assert_eq!(lexer.next_token(false, false), ws);
        assert_eq!(lexer.next_token(true, true).text, "end");
    }

    #[test]
    fn test_lossless() {
        let dialect = Dialect::from_kind(DialectKind::Postgres);
        let source = "create function f() returns int as $$\n  select 1; -- x\n$$ language sql;\n/* über */ select 'ü''x', \"Q\"\"n\" from t where a #>> '{b}' = E'\\n' ;\u{1}";
        let rebuilt: String = tokenize(source, &dialect)
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_keywords() {
        assert!(is_keyword("SELECT"));
        assert!(is_keyword("begin"));
        assert!(!is_keyword("foo"));
        assert!(!is_keyword("a_very_long_identifier_name"));
    }
}
