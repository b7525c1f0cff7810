use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SplitError;
use crate::mode::Mode;

const CONFIG_FILE: &str = "sqlsplit.toml";
const PYPROJECT_FILE: &str = "pyproject.toml";

const KNOWN_KEYS: &[&str] = &[
    "dialect",
    "delimiter",
    "alternate_delimiter",
    "alternate_line_comment",
    "return_starting_whitespace",
    "delimiter_directive",
    "exclude",
];

/// Load sqlsplit configuration.
///
/// An explicit `config_path` must exist. Otherwise the parent directories of
/// `files` are searched for `sqlsplit.toml` or a `pyproject.toml` with a
/// `[tool.sqlsplit]` table, and finally the user config directory.
pub fn load_config(files: &[PathBuf], config_path: Option<&Path>) -> Result<Mode, SplitError> {
    let mut mode = Mode::default();

    let config_file = match config_path {
        Some(path) => {
            if path.exists() {
                Some(path.to_path_buf())
            } else {
                return Err(SplitError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        None => find_config_file(files).or_else(user_config_file),
    };

    if let Some(path) = config_file {
        debug!(path = %path.display(), "loading config");
        let table = load_config_from_path(&path)?;
        apply_config(&mut mode, &table)?;
    }

    Ok(mode)
}

fn find_config_file(files: &[PathBuf]) -> Option<PathBuf> {
    for parent in get_common_parents(files) {
        let config = parent.join(CONFIG_FILE);
        if config.exists() {
            return Some(config);
        }
        let pyproject = parent.join(PYPROJECT_FILE);
        if pyproject.exists() && has_tool_table(&pyproject) {
            return Some(pyproject);
        }
    }
    None
}

/// `<config dir>/sqlsplit/sqlsplit.toml`, e.g. `~/.config/sqlsplit/sqlsplit.toml`.
fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("sqlsplit").join(CONFIG_FILE);
    path.exists().then_some(path)
}

/// Parent directories of the given paths, most specific first.
fn get_common_parents(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut parents = Vec::new();

    for file in files {
        let parent = if file.is_dir() {
            file.clone()
        } else {
            match file.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };

        let mut current = Some(parent.as_path());
        while let Some(dir) = current {
            let dir_buf = dir.to_path_buf();
            if !parents.contains(&dir_buf) {
                parents.push(dir_buf);
            }
            current = dir.parent();
        }
    }

    parents
}

fn has_tool_table(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .is_some_and(|parsed| {
            parsed
                .get("tool")
                .and_then(|t| t.get("sqlsplit"))
                .is_some()
        })
}

/// Load the sqlsplit table of a config file. `sqlsplit.toml` holds the keys
/// at the top level, any other file under `[tool.sqlsplit]`.
fn load_config_from_path(path: &Path) -> Result<toml::Table, SplitError> {
    let content = std::fs::read_to_string(path)?;
    let mut parsed: toml::Table = content.parse()?;

    let is_own_file = path.file_name().is_some_and(|n| n == CONFIG_FILE);
    if is_own_file {
        return Ok(parsed);
    }

    match parsed
        .remove("tool")
        .and_then(|mut tool| tool.as_table_mut().and_then(|t| t.remove("sqlsplit")))
    {
        Some(toml::Value::Table(table)) => Ok(table),
        Some(_) => Err(SplitError::Config(format!(
            "[tool.sqlsplit] in {} must be a table",
            path.display()
        ))),
        None => Ok(toml::Table::new()),
    }
}

fn expect_string(key: &str, value: &toml::Value) -> Result<String, SplitError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SplitError::Config(format!("Config option {} must be a string", key)))
}

fn expect_bool(key: &str, value: &toml::Value) -> Result<bool, SplitError> {
    value
        .as_bool()
        .ok_or_else(|| SplitError::Config(format!("Config option {} must be a boolean", key)))
}

/// Apply configuration values to a Mode. Unknown keys are an error.
fn apply_config(mode: &mut Mode, config: &toml::Table) -> Result<(), SplitError> {
    for key in config.keys() {
        if !KNOWN_KEYS.contains(&key.to_lowercase().as_str()) {
            return Err(SplitError::Config(format!("Unknown config option: {}", key)));
        }
    }

    for (key, value) in config {
        match key.to_lowercase().as_str() {
            "dialect" => mode.dialect_name = expect_string(key, value)?,
            "delimiter" => mode.delimiter = expect_string(key, value)?,
            "alternate_delimiter" => mode.alternate_delimiter = Some(expect_string(key, value)?),
            "alternate_line_comment" => {
                mode.alternate_line_comment = Some(expect_string(key, value)?)
            }
            "return_starting_whitespace" => {
                mode.return_starting_whitespace = expect_bool(key, value)?
            }
            "delimiter_directive" => mode.delimiter_directive = expect_bool(key, value)?,
            "exclude" => {
                let patterns = value.as_array().ok_or_else(|| {
                    SplitError::Config("Config option exclude must be an array".to_string())
                })?;
                mode.exclude = patterns
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> toml::Table {
        text.parse().unwrap()
    }

    #[test]
    fn test_apply_config() {
        let mut mode = Mode::default();
        let config = table(
            r#"
            dialect = "oracle"
            alternate_delimiter = "/;nl"
            delimiter_directive = false
            exclude = ["build/**"]
            "#,
        );

        apply_config(&mut mode, &config).unwrap();
        assert_eq!(mode.dialect_name, "oracle");
        assert_eq!(mode.alternate_delimiter.as_deref(), Some("/;nl"));
        assert!(!mode.delimiter_directive);
        assert_eq!(mode.exclude, vec!["build/**"]);
    }

    #[test]
    fn test_unknown_config_key_error() {
        let mut mode = Mode::default();
        let config = table("line_length = 88");
        assert!(apply_config(&mut mode, &config).is_err());
    }

    #[test]
    fn test_wrong_type_error() {
        let mut mode = Mode::default();
        let config = table("delimiter = 1");
        assert!(apply_config(&mut mode, &config).is_err());
    }

    #[test]
    fn test_load_sqlsplit_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "dialect = \"mysql\"\n").unwrap();
        let file = dir.path().join("a.sql");
        std::fs::write(&file, "select 1;").unwrap();

        let mode = load_config(&[file], None).unwrap();
        assert_eq!(mode.dialect_name, "mysql");
    }

    #[test]
    fn test_load_pyproject_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PYPROJECT_FILE),
            "[project]\nname = \"x\"\n\n[tool.sqlsplit]\ndelimiter = \"GO;nl\"\n",
        )
        .unwrap();

        let mode = load_config(&[dir.path().to_path_buf()], None).unwrap();
        assert_eq!(mode.delimiter, "GO;nl");
    }

    #[test]
    fn test_missing_explicit_config() {
        let result = load_config(&[], Some(Path::new("/nonexistent/sqlsplit.toml")));
        assert!(matches!(result, Err(SplitError::Config(_))));
    }
}
