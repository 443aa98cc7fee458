//! Command-line interface for the Naproche proof checker.
//!
//! Parses a marked-up source file, extracts its `forthel` blocks, and
//! runs the checking engine over the resulting statements. Verification
//! failures are reported per step and do not affect the exit code; only
//! I/O and argument problems do.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use naproche_check::{CheckError, Engine, EngineConfig, StdoutReporter};
use naproche_language::{extract_forthel_blocks, parse_block, Statement};

/// Command-line proof checker for controlled mathematical vernacular.
#[derive(Parser)]
#[command(name = "naproche")]
#[command(about = "Natural proof checking", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The source file to check.
    pub file: PathBuf,

    /// Run all available provers on each obligation and report timings.
    #[arg(long)]
    pub benchmark: bool,

    /// Disable all cache reads and writes for this run.
    #[arg(long)]
    pub no_cache: bool,
}

/// CLI failure: anything that prevents the run from completing.
#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Parse(String),
    Check(CheckError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{}", e),
            CliError::Parse(e) => write!(f, "{}", e),
            CliError::Check(e) => write!(f, "{}", e),
        }
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<CheckError> for CliError {
    fn from(e: CheckError) -> Self {
        CliError::Check(e)
    }
}

/// Parse arguments and run the checker to completion.
pub fn run_cli() -> Result<(), CliError> {
    env_logger::init();
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let content = std::fs::read_to_string(&cli.file)?;
    println!("Checking {}...", cli.file.display());

    let blocks = extract_forthel_blocks(&content);
    let mut statements: Vec<Statement> = Vec::new();
    let mut first_parse_error = None;
    for (i, block) in blocks.iter().enumerate() {
        match parse_block(block) {
            Ok(stmts) => statements.extend(stmts),
            Err(e) => {
                let message = format!("parsing failed in block {}: {}", i + 1, e);
                println!("[Error] {}", message);
                if first_parse_error.is_none() {
                    first_parse_error = Some(message);
                }
            }
        }
    }
    if let Some(message) = first_parse_error {
        return Err(CliError::Parse(message));
    }

    let base_path = resolve_base_path(&cli.file);
    let config = EngineConfig {
        base_path,
        benchmark: cli.benchmark,
        use_cache: !cli.no_cache,
        ..EngineConfig::default()
    };
    if cli.benchmark {
        println!("Benchmarking mode enabled.");
    }
    if cli.no_cache {
        println!("Cache disabled by --no-cache.");
    }

    println!("\nVerifying {} statements...", statements.len());
    let mut engine = Engine::new(config, Arc::new(StdoutReporter))?;
    engine.check(&statements).await;

    println!("\nDone.");
    Ok(())
}

/// Includes are resolved relative to the formalization library root: the
/// enclosing `math` directory when the source lives under one, otherwise
/// the source file's own directory.
fn resolve_base_path(file: &std::path::Path) -> PathBuf {
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let mut current = dir.clone();
    loop {
        if current.file_name().map(|n| n == "math").unwrap_or(false) {
            return current;
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent.to_path_buf(),
            _ => return dir,
        }
    }
}
