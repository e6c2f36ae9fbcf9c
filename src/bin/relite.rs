//! Command-line shell (§6, §10): an interactive `SQL > ` prompt or a
//! script-file runner, sitting outside the core query-processing pipeline
//! as a thin collaborator around `relite::Database`.

use clap::Parser;
use relite::{Config, Database, StatementOutcome};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "relite", about = "A small relational database engine")]
struct Cli {
    /// SQL script to execute; omit for an interactive prompt.
    script: Option<PathBuf>,

    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, default_value_t = 16)]
    buffer_capacity: usize,

    #[arg(long, default_value = "lru")]
    replacement_policy: ReplacementPolicyArg,

    #[arg(long, default_value = "info")]
    log_level: LogLevelArg,

    /// Disable predicate push-down (used to test property 4: result sets
    /// must match with push-down on or off).
    #[arg(long)]
    no_pushdown: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ReplacementPolicyArg {
    Lru,
    Fifo,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogLevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevelArg> for log::LevelFilter {
    fn from(v: LogLevelArg) -> Self {
        match v {
            LogLevelArg::Trace => log::LevelFilter::Trace,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Error => log::LevelFilter::Error,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if relite::logging::init(cli.log_level.into(), Path::new("log")).is_err() {
        eprintln!("warning: failed to initialize logging; continuing without a log file");
    }

    let policy = match cli.replacement_policy {
        ReplacementPolicyArg::Lru => relite::buffer_pool::ReplacementPolicy::Lru,
        ReplacementPolicyArg::Fifo => relite::buffer_pool::ReplacementPolicy::Fifo,
    };
    let config = Config {
        data_dir: cli.data_dir.clone(),
        buffer_capacity: cli.buffer_capacity,
        replacement_policy: policy,
        pushdown: !cli.no_pushdown,
    };

    let mut db = match Database::open(&config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("fatal: could not open database: {e}");
            return ExitCode::from(1);
        }
    };

    let outcome = match &cli.script {
        Some(path) => run_script_file(&mut db, path),
        None => run_interactive(&mut db),
    };

    match outcome {
        Ok(()) => {
            if let Err(e) = db.shutdown() {
                eprintln!("fatal: shutdown failed: {e}");
                return ExitCode::from(2);
            }
            ExitCode::from(0)
        }
        Err(ShellError::Fatal(msg)) => {
            eprintln!("fatal: {msg}");
            ExitCode::from(2)
        }
    }
}

enum ShellError {
    Fatal(String),
}

fn run_interactive(db: &mut Database) -> Result<(), ShellError> {
    let stdin = io::stdin();
    let mut pending = String::new();
    print!("SQL > ");
    let _ = io::stdout().flush();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if pending.is_empty() {
            let trimmed = line.trim().trim_end_matches(';').trim();
            if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
                break;
            }
            if let Some(rest) = line.trim().strip_prefix(':') {
                run_meta(db, rest.trim())?;
                print!("SQL > ");
                let _ = io::stdout().flush();
                continue;
            }
        }
        pending.push_str(&line);
        pending.push('\n');
        if pending.trim_end().ends_with(';') {
            run_batch(db, &pending)?;
            pending.clear();
        }
        print!("SQL > ");
        let _ = io::stdout().flush();
    }
    Ok(())
}

fn run_script_file(db: &mut Database, path: &Path) -> Result<(), ShellError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ShellError::Fatal(format!("cannot read script '{}': {e}", path.display())))?;
    run_script_text(db, &text)
}

fn run_script_text(db: &mut Database, text: &str) -> Result<(), ShellError> {
    let mut pending = String::new();
    for line in text.lines() {
        if pending.is_empty() {
            let trimmed = line.trim().trim_end_matches(';').trim();
            if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
                return Ok(());
            }
            if let Some(rest) = line.trim().strip_prefix(':') {
                run_meta(db, rest.trim())?;
                continue;
            }
        }
        pending.push_str(line);
        pending.push('\n');
        if pending.trim_end().ends_with(';') {
            run_batch(db, &pending)?;
            pending.clear();
        }
    }
    if !pending.trim().is_empty() {
        run_batch(db, &pending)?;
    }
    Ok(())
}

fn run_meta(db: &mut Database, directive: &str) -> Result<(), ShellError> {
    if let Some(path) = directive.strip_prefix("read ").map(str::trim) {
        run_script_file(db, Path::new(path))
    } else {
        eprintln!("unknown directive ':{directive}'");
        Ok(())
    }
}

/// Parse and run every statement accumulated so far, printing results and
/// propagating only fatal (non-statement-local) errors.
fn run_batch(db: &mut Database, text: &str) -> Result<(), ShellError> {
    for parsed in relite::parser::parse_statements(text) {
        let stmt = match parsed {
            Ok(stmt) => stmt,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match db.execute(&stmt) {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                let fatal = !e.is_statement_local();
                eprintln!("{e}");
                if fatal {
                    return Err(ShellError::Fatal(e.to_string()));
                }
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &StatementOutcome) {
    match outcome {
        StatementOutcome::TableCreated { table } => println!("table '{table}' created"),
        StatementOutcome::RowsAffected(n) => println!("{n} row(s) affected"),
        StatementOutcome::Rows(result) => {
            println!("{}", result.columns.join(" | "));
            for row in &result.rows {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{}", cells.join(" | "));
            }
            println!("({} row(s))", result.rows.len());
        }
    }
}
