//! End-to-end engine scenarios over the dummy and test provers.
//!
//! External ATPs are not assumed to be installed; every scenario that
//! needs a verdict uses an always-succeeding adapter, and one uses a
//! capturing adapter to inspect the axiom snapshots workers receive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use naproche_check::{
    Engine, EngineConfig, Prover, ProverOutcome, RecordingReporter, StepSource,
};
use naproche_language::{parse_block, Statement};
use naproche_logic::Formula;

fn statements(text: &str) -> Vec<Statement> {
    parse_block(text).expect("block parse")
}

fn engine_with(
    dir: &tempfile::TempDir,
    benchmark: bool,
    use_cache: bool,
    reporter: Arc<RecordingReporter>,
) -> Engine {
    let config = EngineConfig {
        base_path: dir.path().to_path_buf(),
        benchmark,
        use_cache,
        cache_path: dir.path().join("cache.db"),
    };
    Engine::new(config, reporter).expect("engine")
}

/// Adapter that records every obligation it is handed.
struct CapturingProver {
    calls: Arc<Mutex<Vec<CapturedCall>>>,
}

#[derive(Debug, Clone)]
struct CapturedCall {
    goal: String,
    axioms: Vec<String>,
}

#[async_trait]
impl Prover for CapturingProver {
    fn name(&self) -> &str {
        "capturing"
    }

    async fn prove(
        &self,
        axioms: &[(String, Formula)],
        conjecture: (&str, &Formula),
        _timeout: Duration,
    ) -> ProverOutcome {
        self.calls.lock().expect("calls lock").push(CapturedCall {
            goal: conjecture.1.to_string(),
            axioms: axioms.iter().map(|(_, f)| f.to_string()).collect(),
        });
        ProverOutcome {
            success: true,
            used_axioms: Some(axioms.iter().map(|(n, _)| n.clone()).collect()),
            output: String::new(),
            time_taken: Duration::ZERO,
        }
    }
}

/// Adapter with a fixed verdict and reported latency.
struct TimedProver {
    name: String,
    success: bool,
    time: Duration,
}

#[async_trait]
impl Prover for TimedProver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prove(
        &self,
        _axioms: &[(String, Formula)],
        _conjecture: (&str, &Formula),
        _timeout: Duration,
    ) -> ProverOutcome {
        ProverOutcome {
            success: self.success,
            used_axioms: None,
            output: String::new(),
            time_taken: self.time,
        }
    }
}

const TRIVIAL: &str = "\
\\begin{theorem}
$1 = 1$.
\\end{theorem}
\\begin{proof}
$1 = 1$.
\\end{proof}";

#[tokio::test]
async fn trivial_conjecture_verifies_and_is_cached_on_rerun() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stmts = statements(TRIVIAL);

    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, true, reporter.clone());
    engine.provers_mut().set_active("dummy");
    engine.check(&stmts).await;

    let steps = reporter.recorded_steps();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].success);
    assert_eq!(steps[0].source, StepSource::Prover);

    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, true, reporter.clone());
    engine.provers_mut().set_active("dummy");
    engine.check(&stmts).await;

    let steps = reporter.recorded_steps();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].success);
    assert_eq!(steps[0].source, StepSource::Cached, "second run must hit the cache");
}

#[tokio::test]
async fn no_cache_runs_the_prover_every_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stmts = statements(TRIVIAL);

    for _ in 0..2 {
        let reporter = Arc::new(RecordingReporter::new());
        let mut engine = engine_with(&dir, false, false, reporter.clone());
        engine.provers_mut().set_active("dummy");
        engine.check(&stmts).await;
        let steps = reporter.recorded_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].source, StepSource::Prover);
    }
}

const CANTOR: &str = "\
\\begin{definition}
$F$ surjects onto $Y$ iff for all $z \\in Y$ there is $x \\in dom(F)$ such that $apply(F, x) = z$.
\\end{definition}
\\begin{theorem}[Cantor]
Let $M$ be a set.
No function of $M$ surjects onto the powerset of $M$.
\\end{theorem}
\\begin{proof}
Assume the contrary.
Take a surjective function $f$ from $M$ to the powerset of $M$.
Define $N = \\class{z \\in M | z \\notin f(z)}$.
Consider $z \\in M$ such that $f(z) = N$.
Then $z \\in N$ iff $z \\notin f(z)$.
Contradiction.
qed.
\\end{proof}";

#[tokio::test]
async fn cantor_proof_submits_contradiction_obligation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.provers_mut().register(Arc::new(CapturingProver {
        calls: calls.clone(),
    }));
    engine.provers_mut().set_active("capturing");
    engine.check(&statements(CANTOR)).await;

    assert!(
        reporter.recorded_errors().is_empty(),
        "no translation errors expected: {:?}",
        reporter.recorded_errors()
    );
    let steps = reporter.recorded_steps();
    assert_eq!(steps.len(), 2, "iff step and contradiction: {:?}", steps);
    assert!(steps.iter().all(|s| s.success));
    assert_eq!(steps[1].description, "Contradiction");

    let calls = calls.lock().expect("calls lock");
    let contradiction = calls
        .iter()
        .find(|c| c.goal == "false")
        .expect("contradiction obligation");
    assert!(
        contradiction
            .axioms
            .iter()
            .any(|a| a.contains("surjective_function_from_to")),
        "witness assumption must reach the prover: {:?}",
        contradiction.axioms
    );
    assert!(
        contradiction.axioms.iter().any(|a| a.starts_with("~(")),
        "negated goal from 'Assume the contrary' must be present"
    );
}

const CASES: &str = "\
\\begin{theorem}
$1 = 1$.
\\end{theorem}
\\begin{proof}
Case $p = 1$.
$2 = 2$.
End.
Case $q = 1$.
$3 = 3$.
End.
qed.
\\end{proof}";

#[tokio::test]
async fn case_scopes_do_not_leak_between_cases() {
    let dir = tempfile::tempdir().expect("tempdir");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.provers_mut().register(Arc::new(CapturingProver {
        calls: calls.clone(),
    }));
    engine.provers_mut().set_active("capturing");
    engine.check(&statements(CASES)).await;

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 2);

    let first = calls.iter().find(|c| c.goal == "'2' = '2'").expect("case 1");
    assert!(first.axioms.iter().any(|a| a == "p = '1'"));
    assert!(
        !first.axioms.iter().any(|a| a == "q = '1'"),
        "case 2 assumption must not be visible in case 1"
    );

    let second = calls.iter().find(|c| c.goal == "'3' = '3'").expect("case 2");
    assert!(second.axioms.iter().any(|a| a == "q = '1'"));
    assert!(
        !second.axioms.iter().any(|a| a == "p = '1'"),
        "case 1 assumption must not leak into case 2"
    );
    assert!(
        !second.axioms.iter().any(|a| a == "'2' = '2'"),
        "case 1 steps must not leak into case 2"
    );
}

#[tokio::test]
async fn benchmark_mode_reports_timings_for_all_provers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, true, false, reporter.clone());
    engine.provers_mut().clear();
    engine.provers_mut().register(Arc::new(TimedProver {
        name: "fast".to_string(),
        success: true,
        time: Duration::from_millis(10),
    }));
    engine.provers_mut().register(Arc::new(TimedProver {
        name: "slow".to_string(),
        success: true,
        time: Duration::from_millis(500),
    }));
    engine.check(&statements(TRIVIAL)).await;

    let steps = reporter.recorded_steps();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].success, "any prover succeeding counts as success");
    let info = steps[0].benchmark.as_ref().expect("benchmark info");
    assert!(info.contains_key("fast"));
    assert!(info.contains_key("slow"));
    assert_eq!(
        naproche_check::report::fastest_success(info),
        Some("fast"),
        "the faster successful prover must be suggested"
    );
}

#[tokio::test]
async fn untranslatable_step_is_reported_and_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let text = "\
\\begin{theorem}
$1 = 1$.
\\end{theorem}
\\begin{proof}
Colorless green ideas sleep furiously.
$1 = 1$.
\\end{proof}";
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.provers_mut().set_active("dummy");
    engine.check(&statements(text)).await;

    let errors = reporter.recorded_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Could not translate"));

    let steps = reporter.recorded_steps();
    assert_eq!(steps.len(), 1, "the remaining step still runs");
    assert!(steps[0].success);
}

#[tokio::test]
async fn directives_adjust_engine_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let text = "\
[prover dummy]
[timelimit 42]
[unknowndirective whatever]
\\begin{theorem}
$1 = 1$.
\\end{theorem}";
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.check(&statements(text)).await;

    assert_eq!(engine.timeout(), Duration::from_secs(42));
    let logs = reporter.logs.lock().expect("logs").clone();
    assert!(logs.iter().any(|l| l.contains("Switching prover to: dummy")));
    assert!(logs.iter().any(|l| l.contains("unknown directive")));
}

#[tokio::test]
async fn included_files_contribute_axioms_and_theorem_imports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lib = "\
\\begin{forthel}
\\begin{axiom}
Every set is a class.
\\end{axiom}
\\begin{theorem}
$1 = 1$.
\\end{theorem}
\\begin{proof}
$1 = 1$.
\\end{proof}
\\end{forthel}";
    std::fs::create_dir_all(dir.path().join("math")).expect("mkdir");
    std::fs::write(dir.path().join("math").join("lib.ftl.tex"), lib).expect("write lib");

    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.provers_mut().set_active("dummy");
    let before = engine.axioms().len();
    engine.check(&statements("[read lib.ftl.tex]\n[read lib.ftl.tex]")).await;

    assert_eq!(
        engine.axioms().len(),
        before + 2,
        "one axiom and one imported theorem, loaded once"
    );
    assert!(
        reporter.recorded_steps().is_empty(),
        "proofs in included files are skipped"
    );
    for (name, formula) in engine.axioms() {
        assert!(
            formula.free_vars().is_empty(),
            "axiom {} must be closed, got {}",
            name,
            formula
        );
    }
}

#[tokio::test]
async fn missing_include_is_reported_and_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    engine.check(&statements("[read nothere.ftl.tex]")).await;
    let logs = reporter.logs.lock().expect("logs").clone();
    assert!(logs.iter().any(|l| l.contains("Included file not found")));
}

#[tokio::test]
async fn macro_expansion_matches_direct_math_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let via_macro = "\
Let the board stand for $B$.
The board has no covering.";
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter.clone());
    let base = engine.axioms().len();
    engine.check(&statements(via_macro)).await;
    let macro_axiom = engine.axioms()[base..].to_vec();

    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter);
    let base = engine.axioms().len();
    engine.check(&statements("$B$ has no covering.")).await;
    let direct_axiom = engine.axioms()[base..].to_vec();

    assert_eq!(macro_axiom.len(), 1);
    assert_eq!(macro_axiom[0].1, direct_axiom[0].1);
}

#[tokio::test]
async fn goal_decomposition_moves_antecedents_into_proof_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let text = "\
\\begin{theorem}
If $p = 1$ then $q = 1$.
\\end{theorem}
\\begin{proof}
$q = 1$.
\\end{proof}";
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reporter = Arc::new(RecordingReporter::new());
    let mut engine = engine_with(&dir, false, false, reporter);
    engine.provers_mut().register(Arc::new(CapturingProver {
        calls: calls.clone(),
    }));
    engine.provers_mut().set_active("capturing");
    engine.check(&statements(text)).await;

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 1);
    assert!(
        calls[0].axioms.iter().any(|a| a == "p = '1'"),
        "the implication antecedent must be available as an assumption: {:?}",
        calls[0].axioms
    );
}
