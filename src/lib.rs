pub mod api;
pub mod arguments;
pub mod classifier;
pub mod config;
pub mod delimiter;
pub mod dialect;
pub mod error;
pub mod lexer;
pub mod mode;
pub mod report;
pub mod splitter;
mod string_utils;
pub mod token;

// Re-export the main public API
pub use api::{get_matching_paths, run, split_script, split_source, tokenize_script};
pub use arguments::{split_arguments, ArgumentList, ArgumentOptions, ArgumentTokenizer};
pub use config::load_config;
pub use delimiter::{Delimiter, MatchResult};
pub use dialect::{Dialect, DialectKind};
pub use error::{Result, SplitError};
pub use lexer::{tokenize, Lexer};
pub use mode::Mode;
pub use splitter::{split, statement_index_at, ScriptSplitter, SplitOptions, StatementSpan};
pub use token::{CommentKind, Token, TokenKind};
