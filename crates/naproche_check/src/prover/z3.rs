//! Adapter for Z3's TPTP front end.

use std::time::Duration;

use async_trait::async_trait;
use naproche_logic::Formula;

use super::{run_tptp_binary, Prover, ProverOutcome};

pub struct Z3Prover {
    binary: String,
}

impl Z3Prover {
    pub fn new() -> Z3Prover {
        Z3Prover {
            binary: std::env::var("NAPROCHE_Z3").unwrap_or_else(|_| "z3".to_string()),
        }
    }
}

impl Default for Z3Prover {
    fn default() -> Self {
        Z3Prover::new()
    }
}

#[async_trait]
impl Prover for Z3Prover {
    fn name(&self) -> &str {
        "z3"
    }

    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        conjecture: (&str, &Formula),
        timeout: Duration,
    ) -> ProverOutcome {
        let args = vec![
            "-tptp".to_string(),
            format!("-T:{}", timeout.as_secs().max(1)),
        ];
        let mut outcome = run_tptp_binary(&self.binary, &args, axioms, conjecture, timeout).await;
        // Z3 lower-cases its SZS line in some versions.
        if outcome.output.to_lowercase().contains("szs status theorem") {
            outcome.success = true;
        }
        outcome
    }
}
