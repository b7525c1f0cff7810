use std::io::{self, Write};
use std::path::PathBuf;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::splitter::StatementSpan;
use crate::token::Token;

/// Status of splitting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// At least one statement was found.
    Split,
    /// Only whitespace and comments.
    Empty,
    /// An error occurred while processing the file.
    Error,
}

/// Result of splitting a single file (or stdin).
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub statements: Vec<StatementSpan>,
    /// Filled only when the token stream was requested.
    pub tokens: Vec<Token>,
    pub error: Option<String>,
}

impl FileResult {
    pub fn error(path: PathBuf, error: String) -> Self {
        Self {
            path,
            status: FileStatus::Error,
            statements: Vec::new(),
            tokens: Vec::new(),
            error: Some(error),
        }
    }
}

/// Aggregated report over all processed inputs.
#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn statements(&self) -> usize {
        self.results.iter().map(|r| r.statements.len()).sum()
    }

    pub fn empty(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == FileStatus::Empty)
            .count()
    }

    pub fn errors(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == FileStatus::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    pub fn has_empty(&self) -> bool {
        self.empty() > 0
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("{} file(s) processed", self.total()));
        parts.push(format!("{} statement(s)", self.statements()));
        if self.empty() > 0 {
            parts.push(format!("{} without statements", self.empty()));
        }
        if self.errors() > 0 {
            parts.push(format!("{} error(s)", self.errors()));
        }
        parts.join(", ")
    }

    /// Write every statement, each preceded by a `-- path:line` header.
    pub fn write_statements<W: WriteColor>(&self, out: &mut W) -> io::Result<()> {
        let mut header = ColorSpec::new();
        header.set_fg(Some(Color::Cyan)).set_bold(true);
        for result in &self.results {
            for (index, statement) in result.statements.iter().enumerate() {
                out.set_color(&header)?;
                write!(
                    out,
                    "-- {}:{} [{}]",
                    result.path.display(),
                    statement.line,
                    index + 1
                )?;
                if statement.contains_lob_reference {
                    write!(out, " (lob)")?;
                }
                out.reset()?;
                writeln!(out)?;
                writeln!(out, "{}", statement.text)?;
            }
        }
        Ok(())
    }

    /// Write the token stream of every input, one token per line.
    pub fn write_tokens<W: WriteColor>(&self, out: &mut W) -> io::Result<()> {
        let mut kind = ColorSpec::new();
        kind.set_fg(Some(Color::Yellow));
        for result in &self.results {
            writeln!(out, "-- {}", result.path.display())?;
            for token in &result.tokens {
                out.set_color(&kind)?;
                write!(
                    out,
                    "{:>6}..{:<6} {:<16}",
                    token.start,
                    token.end,
                    format!("{:?}", token.kind)
                )?;
                out.reset()?;
                writeln!(out, " {:?}", token.text.as_str())?;
            }
        }
        Ok(())
    }

    /// Print error details.
    pub fn print_errors(&self) {
        for result in &self.results {
            if let Some(ref error) = result.error {
                eprintln!("error: {}: {}", result.path.display(), error);
            }
        }
    }
}
