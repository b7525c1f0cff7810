use std::ops::Range;

use compact_str::CompactString;
use memchr::memchr;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::delimiter::{Delimiter, DelimiterSet};
use crate::dialect::{Dialect, DialectKind};
use crate::error::SplitError;
use crate::lexer::{tokenize, Lexer};
use crate::string_utils::contains_lob_placeholder;
use crate::token::{Pos, Token, TokenKind};

/// Words after BEGIN that make it a transaction statement, not a block.
const TRANSACTION_WORDS: &[&str] = &[
    "transaction",
    "work",
    "tran",
    "deferred",
    "immediate",
    "exclusive",
    "isolation",
    "distributed",
    "read",
];

/// Postgres transaction modes after BEGIN. Only checked for dollar-quoting
/// dialects, since MariaDB opens a block with `BEGIN NOT ATOMIC`.
const TRANSACTION_MODE_WORDS: &[&str] = &["not", "deferrable"];

/// How far past the declared name to look for CURSOR.
const CURSOR_LOOKAHEAD: usize = 6;

/// Words after END that close a construct we never counted.
const UNCOUNTED_END_WORDS: &[&str] = &["if", "loop", "while", "repeat", "for"];

/// Options recognized by the splitter.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub delimiter: Delimiter,
    /// Checked before `delimiter`; the only terminator for block statements.
    pub alternate_delimiter: Option<Delimiter>,
    /// Extra line comment marker on top of the dialect's own.
    pub alternate_line_comment: Option<String>,
    /// Keep the whitespace and comments that precede a statement in its text.
    pub return_starting_whitespace: bool,
    /// Honor `DELIMITER <literal>` lines in the script.
    pub delimiter_directive: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::default(),
            alternate_delimiter: None,
            alternate_line_comment: None,
            return_starting_whitespace: false,
            delimiter_directive: true,
        }
    }
}

/// One executable statement of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSpan {
    pub start: Pos,
    pub end: Pos,
    /// 1-based line number of `start`.
    pub line: usize,
    /// Exactly `source[start..end]`.
    pub text: String,
    /// Source range of the terminator, `None` when the statement ran to the end of input.
    pub terminator: Option<Range<Pos>>,
    pub contains_lob_reference: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Begin,
    Case,
    Declare,
}

/// State of the statement currently being collected.
struct Pending {
    /// Right after the previous terminator.
    start: Pos,
    first_code: Option<Pos>,
    last_end: Pos,
    blocks: SmallVec<[Block; 8]>,
    /// Procedural statement: only the alternate delimiter may end it.
    block_statement: bool,
    leading_words: SmallVec<[CompactString; 5]>,
}

impl Pending {
    fn new(start: Pos) -> Self {
        Self {
            start,
            first_code: None,
            last_end: start,
            blocks: SmallVec::new(),
            block_statement: false,
            leading_words: SmallVec::new(),
        }
    }

    fn has_code(&self) -> bool {
        self.first_code.is_some()
    }

    fn note_code(&mut self, token: &Token, detect_headers: bool) {
        self.first_code.get_or_insert(token.start);
        self.last_end = token.end;
        if self.leading_words.len() < 5
            && matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
        {
            self.leading_words
                .push(CompactString::from(token.text.to_ascii_lowercase()));
            if detect_headers && is_block_header(&self.leading_words) {
                self.block_statement = true;
            }
        }
    }
}

/// `CREATE [OR REPLACE] PROCEDURE|FUNCTION|PACKAGE|TRIGGER|TYPE`.
fn is_block_header(words: &[CompactString]) -> bool {
    let mut words = words.iter().map(CompactString::as_str);
    if words.next() != Some("create") {
        return false;
    }
    words
        .find(|w| !matches!(*w, "or" | "replace" | "editionable" | "noneditionable"))
        .is_some_and(|w| matches!(w, "procedure" | "function" | "package" | "trigger" | "type"))
}

/// Splits scripts into statements for one dialect and option set.
#[derive(Debug, Clone)]
pub struct ScriptSplitter {
    dialect: Dialect,
    options: SplitOptions,
}

impl ScriptSplitter {
    /// Fails only for invalid configuration (an empty alternate line comment).
    pub fn new(dialect: &Dialect, options: SplitOptions) -> Result<Self, SplitError> {
        let dialect = match &options.alternate_line_comment {
            Some(marker) => dialect.clone().with_line_comment(marker)?,
            None => dialect.clone(),
        };
        Ok(Self { dialect, options })
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Split the whole script.
    pub fn split(&self, source: &str) -> Vec<StatementSpan> {
        let spans: Vec<StatementSpan> = self.split_iter(source).collect();
        debug!(
            dialect = self.dialect.kind.name(),
            bytes = source.len(),
            statements = spans.len(),
            "split script"
        );
        spans
    }

    /// Lazily produce statements in source order.
    pub fn split_iter<'a>(&'a self, source: &'a str) -> Statements<'a> {
        Statements {
            source,
            lexer: Lexer::new(source, &self.dialect),
            delimiters: DelimiterSet::new(
                self.options.delimiter.clone(),
                self.options.alternate_delimiter.clone(),
            ),
            options: &self.options,
            line: 1,
            line_pos: 0,
            finished: false,
        }
    }

    /// The full token stream with every statement terminator marked as
    /// `TokenKind::Delimiter`, for highlighting.
    pub fn tokens(&self, source: &str) -> Vec<Token> {
        let mut terminators = self
            .split_iter(source)
            .filter_map(|span| span.terminator)
            .peekable();
        tokenize(source, &self.dialect)
            .into_iter()
            .map(|mut token| {
                while terminators.peek().is_some_and(|r| r.end <= token.start) {
                    terminators.next();
                }
                if token.is_code()
                    && terminators
                        .peek()
                        .is_some_and(|r| r.start <= token.start && token.start < r.end)
                {
                    token.kind = TokenKind::Delimiter;
                }
                token
            })
            .collect()
    }
}

/// Iterator over the statements of one script.
pub struct Statements<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    delimiters: DelimiterSet,
    options: &'a SplitOptions,
    line: usize,
    line_pos: Pos,
    finished: bool,
}

impl Statements<'_> {
    /// The delimiters in effect right now (a directive may have changed them).
    pub fn delimiters(&self) -> &DelimiterSet {
        &self.delimiters
    }

    fn skip_to(&mut self, end: Pos) {
        while self.lexer.position() < end {
            if self.lexer.next_token(false, false).is_end_of_input() {
                break;
            }
        }
    }

    fn line_at(&mut self, pos: Pos) -> usize {
        let bytes = &self.source.as_bytes()[self.line_pos..pos];
        self.line += memchr::memchr_iter(b'\n', bytes).count();
        self.line_pos = pos;
        self.line
    }

    fn make_span(&mut self, pending: &Pending, terminator: Option<Range<Pos>>) -> StatementSpan {
        let start = if self.options.return_starting_whitespace {
            pending.start
        } else {
            pending.first_code.unwrap_or(pending.start)
        };
        let end = pending.last_end.max(start);
        let source = self.source;
        let text = &source[start..end];
        StatementSpan {
            start,
            end,
            line: self.line_at(start),
            text: text.to_string(),
            terminator,
            contains_lob_reference: contains_lob_placeholder(text),
        }
    }

    /// `DELIMITER <literal>` on its own line switches the primary delimiter.
    fn apply_directive(&mut self, token: &Token) -> bool {
        let source = self.source;
        let bytes = source.as_bytes();
        let line_end = memchr(b'\n', &bytes[token.end..]).map_or(bytes.len(), |p| token.end + p);
        let rest = &source[token.end..line_end];
        if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
            return false;
        }
        let Some(definition) = rest.split_whitespace().next() else {
            return false;
        };
        let Ok(delimiter) = Delimiter::new(definition, false) else {
            return false;
        };
        debug!(delimiter = delimiter.literal(), offset = token.start, "delimiter directive");
        self.delimiters.primary = delimiter;
        self.skip_to(line_end);
        true
    }

    /// Returns the terminator range starting at `token`, if any.
    fn match_delimiter(&self, token: &Token, pending: &Pending) -> Option<Range<Pos>> {
        if !pending.blocks.is_empty() {
            // A terminator alone on its line ends even an unbalanced block.
            let alternate = self
                .delimiters
                .alternate
                .as_ref()
                .filter(|d| d.requires_newline())?;
            return alternate
                .matches(self.source, token)
                .end()
                .map(|end| token.start..end);
        }
        self.delimiters
            .find_match(self.source, token, pending.block_statement)
            .map(|(_, end)| token.start..end)
    }

    fn begins_transaction(&self, next: &Token) -> bool {
        next.is_end_of_input()
            || TRANSACTION_WORDS.iter().any(|w| next.is_word(w))
            || (self.lexer.dialect().supports_dollar_quoting
                && TRANSACTION_MODE_WORDS.iter().any(|w| next.is_word(w)))
            || self.delimiters.find_match(self.source, next, false).is_some()
    }

    /// `DECLARE name [modifiers] CURSOR ...` is a plain statement.
    fn declares_cursor(&self) -> bool {
        let mut ahead = self.lexer.clone();
        let name = ahead.next_token(true, true);
        if name.is_end_of_input() {
            return false;
        }
        for _ in 0..CURSOR_LOOKAHEAD {
            let token = ahead.next_token(true, true);
            if token.is_word("cursor") {
                return true;
            }
            if !matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier) {
                return false;
            }
        }
        false
    }

    /// Best-effort BEGIN/CASE/DECLARE ... END pairing.
    fn track_block(&mut self, token: &Token, pending: &mut Pending) {
        if token.is_word("begin") {
            let next = self.lexer.peek_token(true, true);
            if self.begins_transaction(&next) {
                return;
            }
            pending.block_statement = true;
            if pending.blocks.last() == Some(&Block::Declare) {
                pending.blocks.pop();
            }
            pending.blocks.push(Block::Begin);
        } else if token.is_word("case") {
            pending.blocks.push(Block::Case);
        } else if token.is_word("declare") {
            // T-SQL DECLARE is an ordinary statement; Postgres bodies are dollar quoted
            let dialect = self.lexer.dialect();
            if pending.first_code == Some(token.start)
                && dialect.kind != DialectKind::SqlServer
                && !dialect.supports_dollar_quoting
                && !self.declares_cursor()
            {
                pending.block_statement = true;
                pending.blocks.push(Block::Declare);
            }
        } else if token.is_word("end") {
            let next = self.lexer.peek_token(true, true);
            if UNCOUNTED_END_WORDS.iter().any(|w| next.is_word(w)) {
                return;
            }
            if next.is_word("case") {
                self.skip_to(next.end);
                pending.last_end = next.end;
            }
            if pending.blocks.pop().is_none() {
                trace!(offset = token.start, "END without matching block");
            }
        }
    }
}

impl Iterator for Statements<'_> {
    type Item = StatementSpan;

    fn next(&mut self) -> Option<StatementSpan> {
        if self.finished {
            return None;
        }
        let procedural_blocks = self.lexer.dialect().procedural_blocks;
        let detect_headers = !self.lexer.dialect().supports_dollar_quoting;
        let mut pending = Pending::new(self.lexer.position());

        loop {
            let token = self.lexer.next_token(false, false);
            if token.is_end_of_input() {
                self.finished = true;
                return pending.has_code().then(|| self.make_span(&pending, None));
            }
            if token.is_whitespace() {
                continue;
            }
            if token.is_comment() {
                pending.last_end = token.end;
                continue;
            }

            if !pending.has_code()
                && self.options.delimiter_directive
                && token.is_word("delimiter")
                && self.apply_directive(&token)
            {
                pending = Pending::new(self.lexer.position());
                continue;
            }

            if let Some(terminator) = self.match_delimiter(&token, &pending) {
                self.skip_to(terminator.end);
                if pending.has_code() {
                    return Some(self.make_span(&pending, Some(terminator)));
                }
                // empty statement (`;;`) or a comment-only one
                pending = Pending::new(self.lexer.position());
                continue;
            }

            pending.note_code(&token, detect_headers);
            if procedural_blocks {
                self.track_block(&token, &mut pending);
            }
        }
    }
}

/// Split `text` into statements using `delimiter` as the primary terminator.
pub fn split(
    text: &str,
    dialect: &Dialect,
    delimiter: Delimiter,
    options: SplitOptions,
) -> Result<Vec<StatementSpan>, SplitError> {
    let options = SplitOptions {
        delimiter,
        ..options
    };
    Ok(ScriptSplitter::new(dialect, options)?.split(text))
}

/// Index of the statement a cursor offset belongs to: the statement that
/// contains it, or the closest one before it.
pub fn statement_index_at(spans: &[StatementSpan], cursor: Pos) -> Option<usize> {
    if spans.is_empty() {
        return None;
    }
    Some(spans.iter().rposition(|s| s.start <= cursor).unwrap_or(0))
}
