//! Adapter for the Vampire theorem prover.

use std::time::Duration;

use async_trait::async_trait;
use naproche_logic::Formula;

use super::{extract_used_axioms, reports_theorem, run_tptp_binary, Prover, ProverOutcome};

pub struct VampireProver {
    binary: String,
}

impl VampireProver {
    pub fn new() -> VampireProver {
        VampireProver {
            binary: std::env::var("NAPROCHE_VAMPIRE").unwrap_or_else(|_| "vampire".to_string()),
        }
    }
}

impl Default for VampireProver {
    fn default() -> Self {
        VampireProver::new()
    }
}

#[async_trait]
impl Prover for VampireProver {
    fn name(&self) -> &str {
        "vampire"
    }

    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        conjecture: (&str, &Formula),
        timeout: Duration,
    ) -> ProverOutcome {
        let args = vec![
            "--mode".to_string(),
            "casc".to_string(),
            "--output_axiom_names".to_string(),
            "on".to_string(),
            "-t".to_string(),
            timeout.as_secs().max(1).to_string(),
        ];
        let mut outcome = run_tptp_binary(&self.binary, &args, axioms, conjecture, timeout).await;
        if reports_theorem(&outcome.output) {
            outcome.success = true;
            if outcome.output.contains("SZS output start Proof") {
                outcome.used_axioms = Some(extract_used_axioms(&outcome.output));
            }
        }
        outcome
    }
}
