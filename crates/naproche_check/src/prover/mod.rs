//! Uniform interface over external automated theorem provers.
//!
//! Each adapter serializes the obligation to a TPTP problem in a
//! per-obligation temporary file, invokes its executable, consumes the
//! full standard output/error, and reports:
//!
//! - `success`: whether the output carries `SZS status Theorem`;
//! - `used_axioms`: the axiom names appearing in the prover's proof
//!   object (`file('...', name)` lines), or `None` when no proof object
//!   was emitted;
//! - the raw output, retained for debugging and benchmarking.
//!
//! A missing binary yields a failed outcome, never an error, and the
//! temporary file is removed on every path. Binary locations come from
//! the `NAPROCHE_EPROVER` / `NAPROCHE_VAMPIRE` / `NAPROCHE_Z3`
//! environment variables, falling back to bare executable names.

mod dummy;
mod eprover;
mod vampire;
mod z3;

pub use dummy::DummyProver;
pub use eprover::EProver;
pub use vampire::VampireProver;
pub use z3::Z3Prover;

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use naproche_logic::{problem_file, Formula};

/// Result of one prover invocation.
#[derive(Debug, Clone)]
pub struct ProverOutcome {
    pub success: bool,
    /// Axiom names the proof object declares as used; `None` when the
    /// prover emitted no proof object or the names could not be parsed.
    pub used_axioms: Option<Vec<String>>,
    /// Raw prover output (stdout plus stderr).
    pub output: String,
    pub time_taken: Duration,
}

impl ProverOutcome {
    pub(crate) fn failure(output: impl Into<String>) -> ProverOutcome {
        ProverOutcome {
            success: false,
            used_axioms: None,
            output: output.into(),
            time_taken: Duration::ZERO,
        }
    }
}

/// One external ATP.
#[async_trait]
pub trait Prover: Send + Sync {
    fn name(&self) -> &str;

    /// Attempt to prove `conjecture` from `axioms` within `timeout`.
    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        conjecture: (&str, &Formula),
        timeout: Duration,
    ) -> ProverOutcome;
}

/// Registry of provers with the currently active one.
pub struct ProverManager {
    provers: Vec<Arc<dyn Prover>>,
    active: String,
}

impl ProverManager {
    /// Registry with the stock adapters; `eprover` starts active.
    pub fn new() -> ProverManager {
        let provers: Vec<Arc<dyn Prover>> = vec![
            Arc::new(EProver::new()),
            Arc::new(VampireProver::new()),
            Arc::new(Z3Prover::new()),
            Arc::new(DummyProver),
        ];
        ProverManager {
            provers,
            active: "eprover".to_string(),
        }
    }

    /// Drop every registered adapter (tests install their own set).
    pub fn clear(&mut self) {
        self.provers.clear();
    }

    /// Register or replace an adapter under its name.
    pub fn register(&mut self, prover: Arc<dyn Prover>) {
        let name = prover.name().to_string();
        self.provers.retain(|p| p.name() != name);
        self.provers.push(prover);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Prover>> {
        self.provers.iter().find(|p| p.name() == name).cloned()
    }

    /// Switch the active prover; false if no such adapter exists.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            self.active = name.to_string();
            true
        } else {
            false
        }
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> Arc<dyn Prover> {
        self.get(&self.active)
            .unwrap_or_else(|| Arc::new(DummyProver))
    }

    /// All registered adapters, for benchmark mode.
    pub fn all(&self) -> Vec<Arc<dyn Prover>> {
        self.provers.clone()
    }
}

impl Default for ProverManager {
    fn default() -> Self {
        ProverManager::new()
    }
}

/// Write the problem to a fresh `.p` file, run the binary on it, and
/// collect stdout/stderr. The temp file is removed when the guard drops,
/// success or not. A small grace period on top of the prover's own CPU
/// limit catches binaries that ignore it.
pub(crate) async fn run_tptp_binary(
    binary: &str,
    args: &[String],
    axioms: &[(String, Formula)],
    conjecture: (&str, &Formula),
    timeout: Duration,
) -> ProverOutcome {
    let problem = problem_file(axioms, Some(conjecture));
    let mut file = match tempfile::Builder::new().suffix(".p").tempfile() {
        Ok(f) => f,
        Err(e) => return ProverOutcome::failure(format!("could not create problem file: {}", e)),
    };
    if let Err(e) = file.write_all(problem.as_bytes()) {
        return ProverOutcome::failure(format!("could not write problem file: {}", e));
    }

    let started = Instant::now();
    let mut command = tokio::process::Command::new(binary);
    command
        .args(args)
        .arg(file.path())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let run = command.output();
    let output = match tokio::time::timeout(timeout + Duration::from_secs(2), run).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            return ProverOutcome::failure(format!("could not run '{}': {}", binary, e));
        }
        Err(_) => {
            let mut out = ProverOutcome::failure("prover timed out");
            out.time_taken = started.elapsed();
            return out;
        }
    };
    let elapsed = started.elapsed();

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        text.push('\n');
        text.push_str(&stderr);
    }

    ProverOutcome {
        success: false,
        used_axioms: None,
        output: text,
        time_taken: elapsed,
    }
}

/// Parse axiom names out of `file('<path>', <name>)` occurrences in a
/// proof object.
pub(crate) fn extract_used_axioms(output: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut used = Vec::new();
    for line in output.lines() {
        let mut rest = line;
        while let Some(i) = rest.find("file('") {
            rest = &rest[i + "file('".len()..];
            let Some(quote) = rest.find('\'') else { break };
            let mut tail = rest[quote + 1..].trim_start();
            rest = &rest[quote + 1..];
            if !tail.starts_with(',') {
                continue;
            }
            tail = tail[1..].trim_start();
            let name: String = tail
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
                .collect();
            if !name.is_empty() && name != "unknown" && tail[name.len()..].starts_with(')') {
                if seen.insert(name.clone()) {
                    used.push(name);
                }
            }
        }
    }
    used
}

/// True if the output declares the SZS status `Theorem`.
pub(crate) fn reports_theorem(output: &str) -> bool {
    output.contains("SZS status Theorem")
}

#[cfg(test)]
mod tests {
    use super::*;
    use naproche_logic::Term;

    #[test]
    fn used_axiom_extraction() {
        let output = "\
fof(c_0_5, axiom, set(m), file('/tmp/x.p', ax_0)).
fof(c_0_6, axiom, class(m), file('/tmp/x.p', ax_1)).
fof(c_0_7, plain, $false, file('/tmp/x.p', unknown)).
";
        assert_eq!(extract_used_axioms(output), vec!["ax_0", "ax_1"]);
    }

    #[test]
    fn szs_detection() {
        assert!(reports_theorem("# SZS status Theorem\n"));
        assert!(!reports_theorem("# SZS status CounterSatisfiable\n"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_failed_outcome() {
        let goal = Formula::equal(Term::constant("1"), Term::constant("1"));
        let outcome = run_tptp_binary(
            "naproche-no-such-prover-binary",
            &[],
            &[],
            ("goal", &goal),
            Duration::from_secs(1),
        )
        .await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("could not run"));
    }

    #[tokio::test]
    async fn dummy_prover_claims_all_axioms() {
        let ax = Formula::pred("set", vec![Term::constant("m")]);
        let goal = Formula::equal(Term::constant("1"), Term::constant("1"));
        let outcome = DummyProver
            .prove(
                &[("ax_0".to_string(), ax)],
                ("goal", &goal),
                Duration::from_secs(1),
            )
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.used_axioms, Some(vec!["ax_0".to_string()]));
    }

    #[test]
    fn manager_switches_active_prover() {
        let mut manager = ProverManager::new();
        assert_eq!(manager.active_name(), "eprover");
        assert!(manager.set_active("dummy"));
        assert_eq!(manager.active_name(), "dummy");
        assert!(!manager.set_active("nonexistent"));
        assert_eq!(manager.active_name(), "dummy");
    }
}
