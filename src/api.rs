use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SplitError;
use crate::mode::Mode;
use crate::report::{FileResult, FileStatus, Report};
use crate::splitter::{ScriptSplitter, StatementSpan};
use crate::token::Token;

/// Build the splitter described by a mode.
pub fn splitter_for(mode: &Mode) -> Result<ScriptSplitter, SplitError> {
    ScriptSplitter::new(&mode.dialect()?, mode.split_options()?)
}

/// Split a SQL script according to the given mode.
pub fn split_script(source: &str, mode: &Mode) -> Result<Vec<StatementSpan>, SplitError> {
    Ok(splitter_for(mode)?.split(source))
}

/// Tokenize a SQL script, marking statement terminators as delimiters.
pub fn tokenize_script(source: &str, mode: &Mode) -> Result<Vec<Token>, SplitError> {
    Ok(splitter_for(mode)?.tokens(source))
}

/// Split one in-memory source. `path` only labels the result.
pub fn split_source(path: &Path, source: &str, mode: &Mode) -> FileResult {
    let splitter = match splitter_for(mode) {
        Ok(splitter) => splitter,
        Err(e) => return FileResult::error(path.to_path_buf(), e.to_string()),
    };
    let statements = splitter.split(source);
    let tokens = if mode.tokens {
        splitter.tokens(source)
    } else {
        Vec::new()
    };
    debug!(path = %path.display(), statements = statements.len(), "split file");

    FileResult {
        path: path.to_path_buf(),
        status: if statements.is_empty() {
            FileStatus::Empty
        } else {
            FileStatus::Split
        },
        statements,
        tokens,
        error: None,
    }
}

/// Run the splitter on a collection of files and directories.
pub fn run(files: &[PathBuf], mode: &Mode) -> Report {
    let mut report = Report::new();
    for path in get_matching_paths(files, mode) {
        report.add(split_file(&path, mode));
    }
    report
}

fn split_file(path: &Path, mode: &Mode) -> FileResult {
    match std::fs::read_to_string(path) {
        Ok(source) => split_source(path, &source, mode),
        Err(e) => FileResult::error(path.to_path_buf(), format!("Read error: {}", e)),
    }
}

/// Get all SQL file paths that match the given inputs. Explicit files are
/// always kept; directories are searched recursively.
pub fn get_matching_paths(paths: &[PathBuf], mode: &Mode) -> Vec<PathBuf> {
    let extensions = mode.sql_extensions();
    let exclude: Vec<glob::Pattern> = mode
        .exclude
        .iter()
        .filter_map(|pattern| glob::Pattern::new(pattern).ok())
        .collect();
    let mut result = HashSet::new();

    for path in paths {
        if path.is_dir() {
            collect_sql_files(path, extensions, &exclude, &mut result);
        } else {
            result.insert(path.clone());
        }
    }

    let mut sorted: Vec<PathBuf> = result.into_iter().collect();
    sorted.sort();
    sorted
}

fn is_sql_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn is_excluded(path: &Path, name: &str, exclude: &[glob::Pattern]) -> bool {
    exclude
        .iter()
        .any(|pattern| pattern.matches(name) || pattern.matches_path(path))
}

/// Recursively collect SQL files from a directory.
fn collect_sql_files(
    dir: &Path,
    extensions: &[&str],
    exclude: &[glob::Pattern],
    result: &mut HashSet<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if name.starts_with('.') || is_excluded(&path, &name, exclude) {
            continue;
        }

        if path.is_dir() {
            collect_sql_files(&path, extensions, exclude, result);
        } else if is_sql_file(&path, extensions) {
            result.insert(path);
        }
    }
}
