use compact_str::CompactString;

/// Position in source string (byte offset).
pub type Pos = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `-- ...` (or a dialect specific marker such as `#`) up to the end of the line.
    Line,
    /// `/* ... */`
    Block,
}

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Operator,
    LiteralString,
    LiteralNumber,
    Comment(CommentKind),
    Whitespace,
    /// Assigned by the splitter to the text that terminated a statement.
    Delimiter,
    Unknown,
    EndOfInput,
}

impl TokenKind {
    pub fn is_whitespace(self) -> bool {
        matches!(self, Self::Whitespace)
    }

    pub fn is_comment(self) -> bool {
        matches!(self, Self::Comment(_))
    }

    /// Tokens that count as statement content.
    pub fn is_code(self) -> bool {
        !matches!(self, Self::Whitespace | Self::Comment(_) | Self::EndOfInput)
    }

    /// Literals are opaque: nothing inside them can terminate a statement.
    pub fn is_literal(self) -> bool {
        matches!(self, Self::LiteralString | Self::LiteralNumber)
    }
}

/// An immutable token produced by the lexer.
///
/// `text` is exactly `source[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: CompactString,
    pub start: Pos,
    pub end: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, start: Pos) -> Self {
        Self {
            kind,
            text: CompactString::from(text),
            start,
            end: start + text.len(),
        }
    }

    pub fn end_of_input(pos: Pos) -> Self {
        Self {
            kind: TokenKind::EndOfInput,
            text: CompactString::default(),
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind.is_whitespace()
    }

    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }

    pub fn is_code(&self) -> bool {
        self.kind.is_code()
    }

    pub fn is_end_of_input(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }

    /// Case-insensitive keyword/word comparison.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier)
            && self.text.eq_ignore_ascii_case(word)
    }
}
