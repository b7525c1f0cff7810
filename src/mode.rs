use serde::Deserialize;

use crate::delimiter::Delimiter;
use crate::dialect::Dialect;
use crate::error::SplitError;
use crate::splitter::SplitOptions;

/// Mode holds all configuration for one sqlsplit run.
#[derive(Debug, Clone, Deserialize)]
pub struct Mode {
    #[serde(default = "default_dialect")]
    pub dialect_name: String,

    /// Primary delimiter definition (`;`, `GO;nl`, `oracle`, ...).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default)]
    pub alternate_delimiter: Option<String>,

    #[serde(default)]
    pub alternate_line_comment: Option<String>,

    #[serde(default)]
    pub return_starting_whitespace: bool,

    #[serde(default = "default_true")]
    pub delimiter_directive: bool,

    /// Glob patterns to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub quiet: bool,

    #[serde(default)]
    pub no_color: bool,

    #[serde(default)]
    pub force_color: bool,

    /// Print the token stream instead of statements.
    #[serde(default)]
    pub tokens: bool,

    /// Treat a file without any statement as a failure.
    #[serde(default)]
    pub fail_on_empty: bool,
}

fn default_dialect() -> String {
    "standard".to_string()
}
fn default_delimiter() -> String {
    ";".to_string()
}
fn default_true() -> bool {
    true
}

impl Mode {
    /// Create the dialect for the configured dialect_name.
    pub fn dialect(&self) -> Result<Dialect, SplitError> {
        Dialect::from_name(&self.dialect_name)
    }

    /// Build splitter options from the delimiter definitions.
    pub fn split_options(&self) -> Result<SplitOptions, SplitError> {
        let alternate_delimiter = self
            .alternate_delimiter
            .as_deref()
            .map(Delimiter::parse)
            .transpose()?;
        Ok(SplitOptions {
            delimiter: Delimiter::parse(&self.delimiter)?,
            alternate_delimiter,
            alternate_line_comment: self.alternate_line_comment.clone(),
            return_starting_whitespace: self.return_starting_whitespace,
            delimiter_directive: self.delimiter_directive,
        })
    }

    /// Whether color output is enabled.
    pub fn color(&self) -> bool {
        if self.force_color {
            return true;
        }
        if self.no_color {
            return false;
        }
        std::env::var_os("NO_COLOR").is_none()
    }

    /// SQL file extensions to process.
    pub fn sql_extensions(&self) -> &[&str] {
        &["sql", "ddl", "dml", "pks", "pkb", "prc", "fnc", "trg"]
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            dialect_name: default_dialect(),
            delimiter: default_delimiter(),
            alternate_delimiter: None,
            alternate_line_comment: None,
            return_starting_whitespace: false,
            delimiter_directive: true,
            exclude: Vec::new(),
            verbose: false,
            quiet: false,
            no_color: false,
            force_color: false,
            tokens: false,
            fail_on_empty: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    #[test]
    fn test_default_mode() {
        let mode = Mode::default();
        assert_eq!(mode.dialect_name, "standard");
        assert_eq!(mode.delimiter, ";");
        assert!(mode.delimiter_directive);
        assert!(!mode.return_starting_whitespace);
        assert!(!mode.tokens);
    }

    #[test]
    fn test_dialect_creation() {
        let mut mode = Mode::default();
        assert_eq!(mode.dialect().unwrap().kind, DialectKind::Standard);

        mode.dialect_name = "postgres".to_string();
        assert_eq!(mode.dialect().unwrap().kind, DialectKind::Postgres);

        mode.dialect_name = "duckdb".to_string();
        assert!(mode.dialect().is_err());
    }

    #[test]
    fn test_split_options() {
        let mode = Mode {
            delimiter: "GO;nl".to_string(),
            alternate_delimiter: Some("oracle".to_string()),
            return_starting_whitespace: true,
            ..Mode::default()
        };
        let options = mode.split_options().unwrap();
        assert_eq!(options.delimiter.literal(), "GO");
        assert!(options.delimiter.requires_newline());
        assert_eq!(
            options.alternate_delimiter.as_ref().map(Delimiter::literal),
            Some("/")
        );
        assert!(options.return_starting_whitespace);

        let bad = Mode {
            delimiter: "  ".to_string(),
            ..Mode::default()
        };
        assert!(bad.split_options().is_err());
    }

    #[test]
    fn test_color_logic() {
        let mut mode = Mode {
            no_color: true,
            ..Mode::default()
        };
        assert!(!mode.color());

        mode.force_color = true;
        assert!(mode.color()); // force_color overrides no_color
    }

    #[test]
    fn test_deserialize_defaults() {
        let mode: Mode = toml::from_str("dialect_name = \"mysql\"").unwrap();
        assert_eq!(mode.dialect_name, "mysql");
        assert_eq!(mode.delimiter, ";");
        assert!(mode.delimiter_directive);
    }
}
