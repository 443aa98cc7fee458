//! Adapter for the E theorem prover.

use std::time::Duration;

use async_trait::async_trait;
use naproche_logic::Formula;

use super::{extract_used_axioms, reports_theorem, run_tptp_binary, Prover, ProverOutcome};

pub struct EProver {
    binary: String,
}

impl EProver {
    pub fn new() -> EProver {
        EProver {
            binary: std::env::var("NAPROCHE_EPROVER").unwrap_or_else(|_| "eprover".to_string()),
        }
    }
}

impl Default for EProver {
    fn default() -> Self {
        EProver::new()
    }
}

#[async_trait]
impl Prover for EProver {
    fn name(&self) -> &str {
        "eprover"
    }

    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        conjecture: (&str, &Formula),
        timeout: Duration,
    ) -> ProverOutcome {
        let args = vec![
            "--auto".to_string(),
            "--silent".to_string(),
            format!("--cpu-limit={}", timeout.as_secs().max(1)),
            "--proof-object".to_string(),
        ];
        let mut outcome = run_tptp_binary(&self.binary, &args, axioms, conjecture, timeout).await;
        if reports_theorem(&outcome.output) {
            outcome.success = true;
            let has_proof_object = outcome.output.contains("SZS output start Proof")
                || outcome.output.contains("# Proof found!");
            if has_proof_object {
                outcome.used_axioms = Some(extract_used_axioms(&outcome.output));
            }
        }
        outcome
    }
}
