use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use termcolor::{ColorChoice, StandardStream};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use sqlsplit::mode::Mode;
use sqlsplit::report::Report;

/// sqlsplit - split SQL scripts into executable statements.
#[derive(Parser, Debug)]
#[command(name = "sqlsplit", version, about)]
struct Cli {
    /// Files or directories to split. Use "-" to read from stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// SQL dialect: standard, postgres, mysql, oracle, sqlserver.
    #[arg(short = 'd', long)]
    dialect: Option<String>,

    /// Statement delimiter, e.g. ";", "GO;nl", "oracle".
    #[arg(long)]
    delimiter: Option<String>,

    /// Alternate delimiter for procedural blocks, e.g. "/;nl".
    #[arg(long)]
    alternate_delimiter: Option<String>,

    /// Additional line comment marker, e.g. "#".
    #[arg(long)]
    alternate_line_comment: Option<String>,

    /// Keep whitespace and comments that precede each statement.
    #[arg(long)]
    keep_leading_whitespace: bool,

    /// Ignore DELIMITER lines in the script.
    #[arg(long)]
    no_delimiter_directive: bool,

    /// Glob patterns to exclude.
    #[arg(long)]
    exclude: Vec<String>,

    /// Print the token stream instead of statements.
    #[arg(long)]
    tokens: bool,

    /// Exit with status 1 when an input holds no statement.
    #[arg(long)]
    fail_on_empty: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only).
    #[arg(short, long)]
    quiet: bool,

    /// Force color output.
    #[arg(long)]
    force_color: bool,

    /// Disable color output.
    #[arg(long)]
    no_color: bool,

    /// Path to config file (sqlsplit.toml or pyproject.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// CLI flags override the loaded configuration.
    fn into_mode(self, base: Mode) -> Mode {
        Mode {
            dialect_name: self.dialect.unwrap_or(base.dialect_name),
            delimiter: self.delimiter.unwrap_or(base.delimiter),
            alternate_delimiter: self.alternate_delimiter.or(base.alternate_delimiter),
            alternate_line_comment: self.alternate_line_comment.or(base.alternate_line_comment),
            return_starting_whitespace: self.keep_leading_whitespace
                || base.return_starting_whitespace,
            delimiter_directive: !self.no_delimiter_directive && base.delimiter_directive,
            exclude: if self.exclude.is_empty() {
                base.exclude
            } else {
                self.exclude
            },
            verbose: self.verbose,
            quiet: self.quiet,
            no_color: self.no_color,
            force_color: self.force_color,
            tokens: self.tokens,
            fail_on_empty: self.fail_on_empty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let is_stdin = cli.files.len() == 1 && cli.files[0].as_os_str() == "-";

    let base_mode = sqlsplit::load_config(&cli.files, cli.config.as_deref())
        .context("Configuration error")?;
    let files = cli.files.clone();
    let mode = cli.into_mode(base_mode);
    mode.split_options().context("Invalid delimiter settings")?;
    mode.dialect().context("Invalid dialect")?;

    let report = if is_stdin {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Error reading stdin")?;
        let mut report = Report::new();
        report.add(sqlsplit::split_source(Path::new("<stdin>"), &source, &mode));
        report
    } else {
        sqlsplit::run(&files, &mode)
    };

    let choice = if mode.color() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    if mode.tokens {
        report.write_tokens(&mut stdout)?;
    } else {
        report.write_statements(&mut stdout)?;
    }

    if mode.verbose {
        for result in &report.results {
            eprintln!(
                "{}: {} statement(s)",
                result.path.display(),
                result.statements.len()
            );
        }
    }
    if !mode.quiet {
        eprintln!("{}", report.summary());
    }
    report.print_errors();

    Ok(if report.has_errors() {
        ExitCode::from(2)
    } else if mode.fail_on_empty && report.has_empty() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
