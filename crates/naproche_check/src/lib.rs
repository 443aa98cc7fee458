//! Proof checking back end for Naproche.
//!
//! Takes the statement AST produced by `naproche-language` and drives
//! verification:
//!
//! - **[`engine`]**: walks statements, maintains axiom/context/proof
//!   scope, decomposes goals, and dispatches obligations to a worker pool
//! - **[`prover`]**: uniform adapters over external ATP executables
//!   speaking TPTP (E, Vampire, Z3, and a dummy for tests)
//! - **[`cache`]**: persistent dependency-aware result cache
//! - **[`report`]**: pluggable sink for progress and verdicts

pub mod cache;
pub mod engine;
pub mod prover;
pub mod report;

pub use cache::{context_digest, formula_digest, CacheError, ProofCache, CACHE_FILE};
pub use engine::{CheckError, Engine, EngineConfig};
pub use prover::{DummyProver, EProver, Prover, ProverManager, ProverOutcome, VampireProver, Z3Prover};
pub use report::{
    fastest_success, BenchmarkInfo, ProverTiming, RecordingReporter, Reporter, StdoutReporter,
    StepSource,
};
