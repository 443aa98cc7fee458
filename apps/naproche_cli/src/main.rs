//! Naproche CLI - standalone binary.
//!
//! Thin wrapper around [`naproche_cli::run_cli`], handling error display
//! and exit codes. All command logic lives in the library crate for
//! testability.
//!
//! # Exit Codes
//!
//! - `0` - the run completed, regardless of verification outcome
//! - `1` - I/O or parse failure (message printed to stderr)

fn main() {
    if let Err(e) = naproche_cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
