//! Reporting sink for progress, verification results, and benchmark
//! summaries.
//!
//! The engine never prints directly: every user-visible event goes
//! through a [`Reporter`], so the CLI, tests, and any future server
//! wrapper can each plug in their own sink. [`StdoutReporter`] is the
//! plain-console implementation; [`RecordingReporter`] captures events
//! for assertions in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Where a step's verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    /// An external prover produced the verdict.
    Prover,
    /// The verdict was replayed from the persistent cache.
    Cached,
}

impl fmt::Display for StepSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSource::Prover => f.write_str("(Prover)"),
            StepSource::Cached => f.write_str("(Cached)"),
        }
    }
}

/// Per-prover timing entry of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProverTiming {
    pub success: bool,
    pub time: Duration,
}

/// Benchmark results keyed by prover name; ordered for deterministic
/// reporting.
pub type BenchmarkInfo = BTreeMap<String, ProverTiming>;

/// The fastest successful prover of a benchmark round, if any succeeded.
pub fn fastest_success(info: &BenchmarkInfo) -> Option<&str> {
    info.iter()
        .filter(|(_, timing)| timing.success)
        .min_by_key(|(_, timing)| timing.time)
        .map(|(name, _)| name.as_str())
}

/// Sink for checking events. Implementations must be shareable across
/// the engine and its worker tasks.
pub trait Reporter: Send + Sync {
    /// Informational progress message.
    fn log(&self, message: &str);

    /// A recoverable error (untranslatable sentence, missing include, ...).
    fn error(&self, message: &str);

    /// Verdict for one proof step, in submission order.
    fn step_verified(
        &self,
        step: usize,
        description: &str,
        success: bool,
        source: StepSource,
        benchmark: Option<&BenchmarkInfo>,
    );
}

/// Console reporter used by the CLI.
#[derive(Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn log(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        println!("Error: {}", message);
    }

    fn step_verified(
        &self,
        step: usize,
        description: &str,
        success: bool,
        source: StepSource,
        benchmark: Option<&BenchmarkInfo>,
    ) {
        let status = if success { "Verified" } else { "Failed" };
        println!("Step {}: {} -> {} {}", step, description, status, source);
        if let Some(info) = benchmark {
            println!("  Benchmark for step {}:", step);
            for (prover, timing) in info {
                let status = if timing.success { "OK" } else { "FAIL" };
                println!(
                    "    {}: {} ({:.4}s)",
                    prover,
                    status,
                    timing.time.as_secs_f64()
                );
            }
            if let Some(prover) = fastest_success(info) {
                if info.len() > 1 {
                    println!("  Suggestion: Use '{}' for this step.", prover);
                }
            }
        }
    }
}

/// A recorded `step_verified` event.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStep {
    pub step: usize,
    pub description: String,
    pub success: bool,
    pub source: StepSource,
    pub benchmark: Option<BenchmarkInfo>,
}

/// Reporter capturing everything for test assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub logs: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub steps: Mutex<Vec<RecordedStep>>,
}

impl RecordingReporter {
    pub fn new() -> RecordingReporter {
        RecordingReporter::default()
    }

    pub fn recorded_steps(&self) -> Vec<RecordedStep> {
        self.steps.lock().expect("steps lock").clone()
    }

    pub fn recorded_errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }
}

impl Reporter for RecordingReporter {
    fn log(&self, message: &str) {
        self.logs.lock().expect("logs lock").push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("errors lock")
            .push(message.to_string());
    }

    fn step_verified(
        &self,
        step: usize,
        description: &str,
        success: bool,
        source: StepSource,
        benchmark: Option<&BenchmarkInfo>,
    ) {
        self.steps.lock().expect("steps lock").push(RecordedStep {
            step,
            description: description.to_string(),
            success,
            source,
            benchmark: benchmark.cloned(),
        });
    }
}
