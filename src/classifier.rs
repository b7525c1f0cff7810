use crate::dialect::{Dialect, DialectKind};

/// How a string literal starting at the cursor is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    pub quote: u8,
    /// Whether `\` escapes the next character inside the literal.
    pub backslash_escape: bool,
    /// Bytes before the opening quote (`E`, `N`, `X`, `B`).
    pub prefix_len: usize,
}

/// What the bytes at the cursor start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Whitespace,
    LineComment { marker_len: usize },
    BlockComment,
    StringLiteral(QuoteStyle),
    /// `$tag$`, `tag_len` includes both dollar signs.
    DollarQuote { tag_len: usize },
    QuotedIdentifier { close: u8 },
    Number,
    Word,
    /// Multi-character operator from the dialect table.
    Operator { len: usize },
    /// Any other single ASCII punctuation character.
    Punctuation,
    Unknown,
}

#[inline]
pub fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

#[inline]
pub fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Length of an opening dollar-quote tag (`$$` or `$tag$`) at `bytes[0]`.
pub fn dollar_tag_len(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'$') {
        return None;
    }
    let mut tag_end = 1;
    if tag_end < bytes.len() && bytes[tag_end].is_ascii_digit() {
        // $1 is a positional parameter, not a tag
        return None;
    }
    while tag_end < bytes.len()
        && (bytes[tag_end].is_ascii_alphanumeric() || bytes[tag_end] == b'_')
    {
        tag_end += 1;
    }
    if tag_end < bytes.len() && bytes[tag_end] == b'$' {
        Some(tag_end + 1)
    } else {
        None
    }
}

/// Classify the bytes at the cursor for the given dialect.
///
/// Returns `None` only for empty input. The check order matters: comments
/// win over operators (`--`, `/*`), string prefixes win over words (`E'`).
pub fn classify(dialect: &Dialect, bytes: &[u8]) -> Option<CharClass> {
    let b0 = *bytes.first()?;
    let b1 = bytes.get(1).copied();

    if b0.is_ascii_whitespace() {
        return Some(CharClass::Whitespace);
    }

    if bytes.starts_with(dialect.block_comment_start.as_bytes()) {
        return Some(CharClass::BlockComment);
    }

    if let Some(marker_len) = dialect.line_comment_at(bytes) {
        return Some(CharClass::LineComment { marker_len });
    }

    if let Some(style) = prefixed_string(dialect, b0, b1) {
        return Some(CharClass::StringLiteral(style));
    }

    if dialect.is_string_quote(b0) {
        return Some(CharClass::StringLiteral(QuoteStyle {
            quote: b0,
            backslash_escape: dialect.supports_backslash_escape,
            prefix_len: 0,
        }));
    }

    if let Some(close) = dialect.identifier_close(b0) {
        return Some(CharClass::QuotedIdentifier { close });
    }

    if b0 == b'$' {
        if dialect.supports_dollar_quoting {
            if let Some(tag_len) = dollar_tag_len(bytes) {
                return Some(CharClass::DollarQuote { tag_len });
            }
        }
        // $1 placeholders and v$ style names
        if b1.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Some(CharClass::Word);
        }
    }

    if b0.is_ascii_digit() || (b0 == b'.' && b1.is_some_and(|b| b.is_ascii_digit())) {
        return Some(CharClass::Number);
    }

    if is_word_start(b0) {
        return Some(CharClass::Word);
    }

    // T-SQL variables and temp tables: @name, @@rowcount, #temp
    if dialect.kind == DialectKind::SqlServer
        && (b0 == b'@' || b0 == b'#')
        && b1.is_some_and(|b| is_word_char(b) || b == b'@' || b == b'#')
    {
        return Some(CharClass::Word);
    }

    if let Some(len) = dialect.operator_at(bytes) {
        return Some(CharClass::Operator { len });
    }

    if b0.is_ascii_punctuation() {
        return Some(CharClass::Punctuation);
    }

    Some(CharClass::Unknown)
}

/// `E'...'` (escape strings), `N'...'`, `X'...'`, `B'...'`.
fn prefixed_string(dialect: &Dialect, b0: u8, b1: Option<u8>) -> Option<QuoteStyle> {
    if b1 != Some(b'\'') || !dialect.is_string_quote(b'\'') {
        return None;
    }
    match b0 {
        b'e' | b'E' if dialect.supports_escape_string_prefix => Some(QuoteStyle {
            quote: b'\'',
            backslash_escape: true,
            prefix_len: 1,
        }),
        b'n' | b'N' | b'x' | b'X' | b'b' | b'B' => Some(QuoteStyle {
            quote: b'\'',
            backslash_escape: dialect.supports_backslash_escape,
            prefix_len: 1,
        }),
        _ => None,
    }
}
