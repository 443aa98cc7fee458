//! Always-succeeding adapter for tests and pipeline smoke checks. Claims
//! every axiom as used, which exercises the cache's dependency tracking.

use std::time::Duration;

use async_trait::async_trait;
use naproche_logic::Formula;

use super::{Prover, ProverOutcome};

pub struct DummyProver;

#[async_trait]
impl Prover for DummyProver {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        _conjecture: (&str, &Formula),
        _timeout: Duration,
    ) -> ProverOutcome {
        ProverOutcome {
            success: true,
            used_axioms: Some(axioms.iter().map(|(name, _)| name.clone()).collect()),
            output: "Dummy Success".to_string(),
            time_taken: Duration::ZERO,
        }
    }
}
